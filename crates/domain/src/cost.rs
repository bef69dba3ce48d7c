use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::cost::CostRepository;
use crate::util::{end_of_day_ms, now_ms, parse_date_ms, uuid_v7_without_dashes};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostCategory {
    PaymentFee,
    KmongFee,
    Server,
    Domain,
    Marketing,
    Etc,
}

impl CostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::PaymentFee => "PAYMENT_FEE",
            CostCategory::KmongFee => "KMONG_FEE",
            CostCategory::Server => "SERVER",
            CostCategory::Domain => "DOMAIN",
            CostCategory::Marketing => "MARKETING",
            CostCategory::Etc => "ETC",
        }
    }
}

/// Operating cost entry; `date_ms` is UTC midnight of the booking day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    pub id: String,
    pub category: CostCategory,
    pub amount: i64,
    pub description: Option<String>,
    #[serde(rename = "date")]
    pub date_ms: i64,
    pub is_recurring: bool,
    #[serde(rename = "createdAt")]
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct CostCreate {
    pub category: CostCategory,
    pub amount: i64,
    pub description: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub is_recurring: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CostRangeQuery {
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
}

impl CostRangeQuery {
    pub fn from_dates(start_date: Option<&str>, end_date: Option<&str>) -> DomainResult<Self> {
        Ok(Self {
            from_ms: start_date.map(parse_date_ms).transpose()?,
            to_ms: end_date
                .map(parse_date_ms)
                .transpose()?
                .map(end_of_day_ms),
        })
    }
}

#[derive(Clone)]
pub struct CostService {
    repository: Arc<dyn CostRepository>,
}

impl CostService {
    pub fn new(repository: Arc<dyn CostRepository>) -> Self {
        Self { repository }
    }

    /// Costs in the range, newest-first, plus the sum of returned amounts.
    pub async fn list(&self, query: CostRangeQuery) -> DomainResult<(Vec<Cost>, i64)> {
        let costs = self.repository.list(&query).await?;
        let total = costs.iter().map(|cost| cost.amount).sum();
        Ok((costs, total))
    }

    pub async fn create(&self, input: CostCreate) -> DomainResult<Cost> {
        if input.amount < 0 {
            return Err(DomainError::Validation(
                "amount must be non-negative".into(),
            ));
        }
        let date_ms = parse_date_ms(input.date.trim())?;
        let cost = Cost {
            id: uuid_v7_without_dashes(),
            category: input.category,
            amount: input.amount,
            description: input
                .description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            date_ms,
            is_recurring: input.is_recurring,
            created_at_ms: now_ms(),
        };
        self.repository.create(&cost).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::BoxFuture;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct MockCostRepo {
        rows: Arc<RwLock<Vec<Cost>>>,
    }

    impl CostRepository for MockCostRepo {
        fn list(&self, query: &CostRangeQuery) -> BoxFuture<'_, DomainResult<Vec<Cost>>> {
            let query = query.clone();
            let rows = self.rows.clone();
            Box::pin(async move {
                let mut costs: Vec<_> = rows
                    .read()
                    .await
                    .iter()
                    .filter(|cost| {
                        query.from_ms.is_none_or(|from| cost.date_ms >= from)
                            && query.to_ms.is_none_or(|to| cost.date_ms <= to)
                    })
                    .cloned()
                    .collect();
                costs.sort_by(|a, b| b.date_ms.cmp(&a.date_ms));
                Ok(costs)
            })
        }

        fn create(&self, cost: &Cost) -> BoxFuture<'_, DomainResult<Cost>> {
            let cost = cost.clone();
            let rows = self.rows.clone();
            Box::pin(async move {
                rows.write().await.push(cost.clone());
                Ok(cost)
            })
        }
    }

    #[tokio::test]
    async fn range_query_returns_entry_and_total() {
        let service = CostService::new(Arc::new(MockCostRepo::default()));
        service
            .create(CostCreate {
                category: CostCategory::Server,
                amount: 50_000,
                description: Some("hosting".to_string()),
                date: "2025-04-10".to_string(),
                is_recurring: true,
            })
            .await
            .expect("create");
        service
            .create(CostCreate {
                category: CostCategory::Marketing,
                amount: 20_000,
                description: None,
                date: "2025-05-02".to_string(),
                is_recurring: false,
            })
            .await
            .expect("create");

        let query = CostRangeQuery::from_dates(Some("2025-04-01"), Some("2025-04-30"))
            .expect("query");
        let (costs, total) = service.list(query).await.expect("list");
        assert_eq!(costs.len(), 1);
        assert_eq!(costs[0].category, CostCategory::Server);
        assert_eq!(total, 50_000);
    }

    #[tokio::test]
    async fn create_rejects_negative_amount() {
        let service = CostService::new(Arc::new(MockCostRepo::default()));
        let result = service
            .create(CostCreate {
                category: CostCategory::Etc,
                amount: -1,
                description: None,
                date: "2025-04-10".to_string(),
                is_recurring: false,
            })
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
