use crate::DomainResult;
use crate::dashboard::{DailyRevenue, PackageSales, SourceBreakdown};
use crate::payment::{Payment, RevenueQuery};
use crate::ports::BoxFuture;

pub trait PaymentRepository: Send + Sync {
    /// COMPLETED payments matching the filter, newest-first by paid time.
    fn list_completed(&self, query: &RevenueQuery) -> BoxFuture<'_, DomainResult<Vec<Payment>>>;

    fn list_by_member(&self, member_id: &str) -> BoxFuture<'_, DomainResult<Vec<Payment>>>;

    /// Inserts the batch, silently skipping rows whose order id already
    /// exists. Returns the number inserted.
    fn insert_many(&self, payments: &[Payment]) -> BoxFuture<'_, DomainResult<usize>>;

    fn sum_completed_since(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<i64>>;

    fn daily_revenue(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<Vec<DailyRevenue>>>;

    fn sales_by_package(&self) -> BoxFuture<'_, DomainResult<Vec<PackageSales>>>;

    fn totals_by_source(&self) -> BoxFuture<'_, DomainResult<Vec<SourceBreakdown>>>;
}
