use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::review::Review;

pub trait ReviewRepository: Send + Sync {
    /// All reviews, newest-first.
    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Review>>>;

    fn get(&self, review_id: &str) -> BoxFuture<'_, DomainResult<Option<Review>>>;

    fn create(&self, review: &Review) -> BoxFuture<'_, DomainResult<Review>>;

    fn update(&self, review: &Review) -> BoxFuture<'_, DomainResult<Review>>;

    /// Mean rating across visible reviews; `None` when there are none.
    fn average_visible_rating(&self) -> BoxFuture<'_, DomainResult<Option<f64>>>;
}
