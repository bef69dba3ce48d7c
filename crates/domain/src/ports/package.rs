use crate::DomainResult;
use crate::package::Package;
use crate::ports::BoxFuture;

pub trait PackageRepository: Send + Sync {
    /// All packages, ascending by display order.
    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Package>>>;

    fn get(&self, package_id: &str) -> BoxFuture<'_, DomainResult<Option<Package>>>;

    fn create(&self, package: &Package) -> BoxFuture<'_, DomainResult<Package>>;

    fn update(&self, package: &Package) -> BoxFuture<'_, DomainResult<Package>>;
}
