use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::chat::SenderType;
use crate::payment::PaymentSource;
use crate::ports::chat::ChatRepository;
use crate::ports::member::MemberRepository;
use crate::ports::payment::PaymentRepository;
use crate::ports::review::ReviewRepository;
use crate::util::{days_ago_start_ms, now_ms, start_of_month_ms};

pub const DASHBOARD_WINDOW_DAYS: i64 = 15;

/// Headline figures combined from several independent read-only queries.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_members: u64,
    pub monthly_revenue: i64,
    /// Average visible review rating, formatted to one decimal place.
    pub avg_rating: String,
    /// Distinct rooms with at least one unread customer message.
    pub unanswered_chats: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: String,
    pub total: i64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSales {
    pub package_name: String,
    pub count: u64,
    pub total: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub source: PaymentSource,
    pub count: u64,
    pub total: i64,
}

#[derive(Clone)]
pub struct DashboardService {
    members: Arc<dyn MemberRepository>,
    payments: Arc<dyn PaymentRepository>,
    reviews: Arc<dyn ReviewRepository>,
    chat: Arc<dyn ChatRepository>,
}

impl DashboardService {
    pub fn new(
        members: Arc<dyn MemberRepository>,
        payments: Arc<dyn PaymentRepository>,
        reviews: Arc<dyn ReviewRepository>,
        chat: Arc<dyn ChatRepository>,
    ) -> Self {
        Self {
            members,
            payments,
            reviews,
            chat,
        }
    }

    pub async fn stats(&self) -> DomainResult<DashboardStats> {
        let now = now_ms();
        let total_members = self.members.count_active().await?;
        let monthly_revenue = self
            .payments
            .sum_completed_since(start_of_month_ms(now))
            .await?;
        let avg_rating = self
            .reviews
            .average_visible_rating()
            .await?
            .map(|avg| format!("{avg:.1}"))
            .unwrap_or_else(|| "0.0".to_string());
        let unanswered_chats = self.chat.unread_counts(SenderType::User).await?.len() as u64;

        Ok(DashboardStats {
            total_members,
            monthly_revenue,
            avg_rating,
            unanswered_chats,
        })
    }

    /// Per-day signup counts over the trailing window, ascending by day.
    pub async fn daily_signups(&self) -> DomainResult<Vec<DailyCount>> {
        let since = days_ago_start_ms(now_ms(), DASHBOARD_WINDOW_DAYS);
        self.members.daily_signups(since).await
    }

    /// Per-day completed payment totals over the trailing window.
    pub async fn daily_revenue(&self) -> DomainResult<Vec<DailyRevenue>> {
        let since = days_ago_start_ms(now_ms(), DASHBOARD_WINDOW_DAYS);
        self.payments.daily_revenue(since).await
    }

    pub async fn package_sales(&self) -> DomainResult<Vec<PackageSales>> {
        self.payments.sales_by_package().await
    }

    pub async fn revenue_sources(&self) -> DomainResult<Vec<SourceBreakdown>> {
        self.payments.totals_by_source().await
    }
}
