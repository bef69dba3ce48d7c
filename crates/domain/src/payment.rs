use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::payment::PaymentRepository;
use crate::util::{end_of_day_ms, now_ms, parse_date_ms, uuid_v7_without_dashes};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentSource {
    Kmong,
    Toss,
}

impl PaymentSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "KMONG" => Some(PaymentSource::Kmong),
            "TOSS" => Some(PaymentSource::Toss),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSource::Kmong => "KMONG",
            PaymentSource::Toss => "TOSS",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

/// Ledger row. `amount` is minor currency units, never negative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub member_id: String,
    pub package_name: String,
    pub amount: i64,
    pub source: PaymentSource,
    pub status: PaymentStatus,
    pub order_id: Option<String>,
    pub payment_key: Option<String>,
    #[serde(rename = "paidAt")]
    pub paid_at_ms: Option<i64>,
    #[serde(rename = "refundedAt")]
    pub refunded_at_ms: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at_ms: i64,
}

/// Filter for the revenue listing; only COMPLETED payments are considered.
#[derive(Clone, Debug, Default)]
pub struct RevenueQuery {
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
    pub source: Option<PaymentSource>,
}

impl RevenueQuery {
    /// Builds the filter from `YYYY-MM-DD` bounds, inclusive on both ends.
    pub fn from_dates(
        start_date: Option<&str>,
        end_date: Option<&str>,
        source: Option<PaymentSource>,
    ) -> DomainResult<Self> {
        let from_ms = start_date.map(parse_date_ms).transpose()?;
        let to_ms = end_date
            .map(parse_date_ms)
            .transpose()?
            .map(end_of_day_ms);
        Ok(Self {
            from_ms,
            to_ms,
            source,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    pub total: i64,
    pub toss_total: i64,
    pub kmong_total: i64,
    pub count: usize,
}

/// One parsed CSV row from the marketplace settlement export.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmongImportRow {
    pub member_id: String,
    pub package_name: String,
    pub amount: i64,
    pub paid_at: String,
}

#[derive(Clone)]
pub struct PaymentService {
    repository: Arc<dyn PaymentRepository>,
}

impl PaymentService {
    pub fn new(repository: Arc<dyn PaymentRepository>) -> Self {
        Self { repository }
    }

    /// Completed payments newest-first plus the per-source totals.
    pub async fn list_revenue(
        &self,
        query: RevenueQuery,
    ) -> DomainResult<(Vec<Payment>, RevenueSummary)> {
        let payments = self.repository.list_completed(&query).await?;
        let summary = summarize(&payments);
        Ok((payments, summary))
    }

    pub async fn list_by_member(&self, member_id: &str) -> DomainResult<Vec<Payment>> {
        self.repository.list_by_member(member_id).await
    }

    /// Bulk-imports settlement rows as COMPLETED/KMONG payments. Rows whose
    /// order id already exists are skipped; the return value is the number
    /// actually inserted.
    pub async fn import_kmong(&self, rows: Vec<KmongImportRow>) -> DomainResult<usize> {
        let now = now_ms();
        let mut payments = Vec::with_capacity(rows.len());
        for row in rows {
            if row.member_id.trim().is_empty() {
                return Err(DomainError::Validation("memberId is required".into()));
            }
            if row.package_name.trim().is_empty() {
                return Err(DomainError::Validation("packageName is required".into()));
            }
            if row.amount < 0 {
                return Err(DomainError::Validation(
                    "amount must be non-negative".into(),
                ));
            }
            let paid_at_ms = parse_date_ms(row.paid_at.trim())?;
            payments.push(Payment {
                id: uuid_v7_without_dashes(),
                member_id: row.member_id.trim().to_string(),
                package_name: row.package_name.trim().to_string(),
                amount: row.amount,
                source: PaymentSource::Kmong,
                status: PaymentStatus::Completed,
                order_id: None,
                payment_key: None,
                paid_at_ms: Some(paid_at_ms),
                refunded_at_ms: None,
                created_at_ms: now,
            });
        }
        self.repository.insert_many(&payments).await
    }
}

fn summarize(payments: &[Payment]) -> RevenueSummary {
    let mut summary = RevenueSummary {
        total: 0,
        toss_total: 0,
        kmong_total: 0,
        count: payments.len(),
    };
    for payment in payments {
        summary.total += payment.amount;
        match payment.source {
            PaymentSource::Toss => summary.toss_total += payment.amount,
            PaymentSource::Kmong => summary.kmong_total += payment.amount,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(source: PaymentSource, amount: i64) -> Payment {
        Payment {
            id: uuid_v7_without_dashes(),
            member_id: "m-1".to_string(),
            package_name: "STANDARD".to_string(),
            amount,
            source,
            status: PaymentStatus::Completed,
            order_id: None,
            payment_key: None,
            paid_at_ms: Some(1_000),
            refunded_at_ms: None,
            created_at_ms: 1_000,
        }
    }

    #[test]
    fn summary_splits_totals_by_source() {
        let payments = vec![
            payment(PaymentSource::Toss, 50_000),
            payment(PaymentSource::Kmong, 30_000),
            payment(PaymentSource::Toss, 20_000),
        ];
        let summary = summarize(&payments);
        assert_eq!(summary.total, 100_000);
        assert_eq!(summary.toss_total, 70_000);
        assert_eq!(summary.kmong_total, 30_000);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn revenue_query_end_date_is_inclusive() {
        let query = RevenueQuery::from_dates(Some("2025-01-01"), Some("2025-01-31"), None)
            .expect("query");
        let from = query.from_ms.expect("from");
        let to = query.to_ms.expect("to");
        assert_eq!(to - from, 31 * 86_400_000 - 1);
    }
}
