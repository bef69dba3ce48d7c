use crate::DomainResult;
use crate::dashboard::DailyCount;
use crate::member::{Member, MemberListQuery, MemberPage};
use crate::ports::BoxFuture;

pub trait MemberRepository: Send + Sync {
    fn list(&self, query: &MemberListQuery) -> BoxFuture<'_, DomainResult<MemberPage>>;

    fn get(&self, member_id: &str) -> BoxFuture<'_, DomainResult<Option<Member>>>;

    fn create(&self, member: &Member) -> BoxFuture<'_, DomainResult<Member>>;

    /// Last-write-wins full-row update.
    fn update(&self, member: &Member) -> BoxFuture<'_, DomainResult<Member>>;

    fn count_active(&self) -> BoxFuture<'_, DomainResult<u64>>;

    /// Signup counts per calendar day since `since_ms`, ascending by day.
    fn daily_signups(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<Vec<DailyCount>>>;
}
