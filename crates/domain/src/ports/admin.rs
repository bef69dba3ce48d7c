use crate::DomainResult;
use crate::admin::Admin;
use crate::ports::BoxFuture;

pub trait AdminRepository: Send + Sync {
    fn find_by_email(&self, email: &str) -> BoxFuture<'_, DomainResult<Option<Admin>>>;

    /// Whether any admin account exists at all; gates the bootstrap route.
    fn any_exists(&self) -> BoxFuture<'_, DomainResult<bool>>;

    fn create(&self, admin: &Admin) -> BoxFuture<'_, DomainResult<Admin>>;

    fn update_last_login(
        &self,
        admin_id: &str,
        last_login_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<()>>;
}
