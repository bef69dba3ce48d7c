use crate::DomainResult;
use crate::cost::{Cost, CostRangeQuery};
use crate::ports::BoxFuture;

pub trait CostRepository: Send + Sync {
    /// Costs in the (inclusive) range, newest-first by booking day.
    fn list(&self, query: &CostRangeQuery) -> BoxFuture<'_, DomainResult<Vec<Cost>>>;

    fn create(&self, cost: &Cost) -> BoxFuture<'_, DomainResult<Cost>>;
}
