//! In-memory adapters backing the `memory` data backend. Used by the test
//! suites and for running the API without a database.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use backoffice_domain::DomainResult;
use backoffice_domain::admin::Admin;
use backoffice_domain::chat::{SenderType, StoredMessage};
use backoffice_domain::cost::{Cost, CostRangeQuery};
use backoffice_domain::dashboard::{DailyCount, DailyRevenue, PackageSales, SourceBreakdown};
use backoffice_domain::error::DomainError;
use backoffice_domain::member::{Member, MemberListQuery, MemberPage};
use backoffice_domain::package::Package;
use backoffice_domain::payment::{Payment, PaymentStatus, RevenueQuery};
use backoffice_domain::ports::BoxFuture;
use backoffice_domain::ports::admin::AdminRepository;
use backoffice_domain::ports::chat::ChatRepository;
use backoffice_domain::ports::cost::CostRepository;
use backoffice_domain::ports::member::MemberRepository;
use backoffice_domain::ports::package::PackageRepository;
use backoffice_domain::ports::payment::PaymentRepository;
use backoffice_domain::ports::review::ReviewRepository;
use backoffice_domain::review::Review;
use backoffice_domain::util::format_ms_date;

#[derive(Default)]
pub struct InMemoryAdminRepository {
    rows: Arc<RwLock<HashMap<String, Admin>>>,
}

impl InMemoryAdminRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: flips the active flag on an existing account.
    pub async fn set_active(&self, email: &str, is_active: bool) {
        let mut rows = self.rows.write().await;
        if let Some(admin) = rows.values_mut().find(|admin| admin.email == email) {
            admin.is_active = is_active;
        }
    }
}

impl AdminRepository for InMemoryAdminRepository {
    fn find_by_email(&self, email: &str) -> BoxFuture<'_, DomainResult<Option<Admin>>> {
        let email = email.to_string();
        let rows = self.rows.clone();
        Box::pin(async move {
            let rows = rows.read().await;
            Ok(rows.values().find(|admin| admin.email == email).cloned())
        })
    }

    fn any_exists(&self) -> BoxFuture<'_, DomainResult<bool>> {
        let rows = self.rows.clone();
        Box::pin(async move { Ok(!rows.read().await.is_empty()) })
    }

    fn create(&self, admin: &Admin) -> BoxFuture<'_, DomainResult<Admin>> {
        let admin = admin.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            if rows.values().any(|existing| existing.email == admin.email) {
                return Err(DomainError::Conflict);
            }
            rows.insert(admin.id.clone(), admin.clone());
            Ok(admin)
        })
    }

    fn update_last_login(
        &self,
        admin_id: &str,
        last_login_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let admin_id = admin_id.to_string();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            let admin = rows.get_mut(&admin_id).ok_or(DomainError::NotFound)?;
            admin.last_login_at_ms = Some(last_login_at_ms);
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct InMemoryMemberRepository {
    rows: Arc<RwLock<HashMap<String, Member>>>,
}

impl InMemoryMemberRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_search(member: &Member, term: &str) -> bool {
    let term = term.to_lowercase();
    member.name.to_lowercase().contains(&term) || member.email.to_lowercase().contains(&term)
}

impl MemberRepository for InMemoryMemberRepository {
    fn list(&self, query: &MemberListQuery) -> BoxFuture<'_, DomainResult<MemberPage>> {
        let query = query.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut members: Vec<_> = rows
                .read()
                .await
                .values()
                .filter(|member| {
                    query
                        .search
                        .as_deref()
                        .is_none_or(|term| matches_search(member, term))
                })
                .filter(|member| query.grade.is_none_or(|grade| member.grade == grade))
                .cloned()
                .collect();
            members.sort_by(|a, b| {
                b.created_at_ms
                    .cmp(&a.created_at_ms)
                    .then_with(|| b.id.cmp(&a.id))
            });
            let total = members.len() as u64;
            let start = (query.page.max(1) - 1) * query.limit;
            let members = members
                .into_iter()
                .skip(start)
                .take(query.limit)
                .collect();
            Ok(MemberPage { members, total })
        })
    }

    fn get(&self, member_id: &str) -> BoxFuture<'_, DomainResult<Option<Member>>> {
        let member_id = member_id.to_string();
        let rows = self.rows.clone();
        Box::pin(async move { Ok(rows.read().await.get(&member_id).cloned()) })
    }

    fn create(&self, member: &Member) -> BoxFuture<'_, DomainResult<Member>> {
        let member = member.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            if rows.values().any(|existing| existing.email == member.email) {
                return Err(DomainError::Conflict);
            }
            rows.insert(member.id.clone(), member.clone());
            Ok(member)
        })
    }

    fn update(&self, member: &Member) -> BoxFuture<'_, DomainResult<Member>> {
        let member = member.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            if !rows.contains_key(&member.id) {
                return Err(DomainError::NotFound);
            }
            rows.insert(member.id.clone(), member.clone());
            Ok(member)
        })
    }

    fn count_active(&self) -> BoxFuture<'_, DomainResult<u64>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let rows = rows.read().await;
            Ok(rows.values().filter(|member| member.is_active).count() as u64)
        })
    }

    fn daily_signups(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<Vec<DailyCount>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut by_day: HashMap<String, u64> = HashMap::new();
            for member in rows.read().await.values() {
                if member.created_at_ms >= since_ms {
                    *by_day.entry(format_ms_date(member.created_at_ms)).or_default() += 1;
                }
            }
            let mut days: Vec<DailyCount> = by_day
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect();
            days.sort_by(|a, b| a.date.cmp(&b.date));
            Ok(days)
        })
    }
}

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    rows: Arc<RwLock<Vec<Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paid_sort_key(payment: &Payment) -> i64 {
    payment.paid_at_ms.unwrap_or(payment.created_at_ms)
}

impl PaymentRepository for InMemoryPaymentRepository {
    fn list_completed(&self, query: &RevenueQuery) -> BoxFuture<'_, DomainResult<Vec<Payment>>> {
        let query = query.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut payments: Vec<_> = rows
                .read()
                .await
                .iter()
                .filter(|payment| payment.status == PaymentStatus::Completed)
                .filter(|payment| {
                    let paid = paid_sort_key(payment);
                    query.from_ms.is_none_or(|from| paid >= from)
                        && query.to_ms.is_none_or(|to| paid <= to)
                })
                .filter(|payment| query.source.is_none_or(|source| payment.source == source))
                .cloned()
                .collect();
            payments.sort_by(|a, b| {
                paid_sort_key(b)
                    .cmp(&paid_sort_key(a))
                    .then_with(|| b.id.cmp(&a.id))
            });
            Ok(payments)
        })
    }

    fn list_by_member(&self, member_id: &str) -> BoxFuture<'_, DomainResult<Vec<Payment>>> {
        let member_id = member_id.to_string();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut payments: Vec<_> = rows
                .read()
                .await
                .iter()
                .filter(|payment| payment.member_id == member_id)
                .cloned()
                .collect();
            payments.sort_by(|a, b| paid_sort_key(b).cmp(&paid_sort_key(a)));
            Ok(payments)
        })
    }

    fn insert_many(&self, payments: &[Payment]) -> BoxFuture<'_, DomainResult<usize>> {
        let payments = payments.to_vec();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            let mut inserted = 0;
            for payment in payments {
                let duplicate_order = payment.order_id.as_ref().is_some_and(|order_id| {
                    rows.iter()
                        .any(|existing| existing.order_id.as_deref() == Some(order_id))
                });
                if duplicate_order || rows.iter().any(|existing| existing.id == payment.id) {
                    continue;
                }
                rows.push(payment);
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    fn sum_completed_since(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<i64>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let total = rows
                .read()
                .await
                .iter()
                .filter(|payment| payment.status == PaymentStatus::Completed)
                .filter(|payment| paid_sort_key(payment) >= since_ms)
                .map(|payment| payment.amount)
                .sum();
            Ok(total)
        })
    }

    fn daily_revenue(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<Vec<DailyRevenue>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut by_day: HashMap<String, (i64, u64)> = HashMap::new();
            for payment in rows.read().await.iter() {
                if payment.status != PaymentStatus::Completed {
                    continue;
                }
                let paid = paid_sort_key(payment);
                if paid < since_ms {
                    continue;
                }
                let entry = by_day.entry(format_ms_date(paid)).or_default();
                entry.0 += payment.amount;
                entry.1 += 1;
            }
            let mut days: Vec<DailyRevenue> = by_day
                .into_iter()
                .map(|(date, (total, count))| DailyRevenue { date, total, count })
                .collect();
            days.sort_by(|a, b| a.date.cmp(&b.date));
            Ok(days)
        })
    }

    fn sales_by_package(&self) -> BoxFuture<'_, DomainResult<Vec<PackageSales>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut by_package: HashMap<String, (u64, i64)> = HashMap::new();
            for payment in rows.read().await.iter() {
                if payment.status != PaymentStatus::Completed {
                    continue;
                }
                let entry = by_package.entry(payment.package_name.clone()).or_default();
                entry.0 += 1;
                entry.1 += payment.amount;
            }
            let mut sales: Vec<PackageSales> = by_package
                .into_iter()
                .map(|(package_name, (count, total))| PackageSales {
                    package_name,
                    count,
                    total,
                })
                .collect();
            sales.sort_by(|a, b| a.package_name.cmp(&b.package_name));
            Ok(sales)
        })
    }

    fn totals_by_source(&self) -> BoxFuture<'_, DomainResult<Vec<SourceBreakdown>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut by_source: HashMap<&'static str, (u64, i64)> = HashMap::new();
            let mut sources = Vec::new();
            for payment in rows.read().await.iter() {
                if payment.status != PaymentStatus::Completed {
                    continue;
                }
                let key = payment.source.as_str();
                if !by_source.contains_key(key) {
                    sources.push(payment.source);
                }
                let entry = by_source.entry(key).or_default();
                entry.0 += 1;
                entry.1 += payment.amount;
            }
            sources.sort_by_key(|source| source.as_str());
            Ok(sources
                .into_iter()
                .map(|source| {
                    let (count, total) = by_source[source.as_str()];
                    SourceBreakdown {
                        source,
                        count,
                        total,
                    }
                })
                .collect())
        })
    }
}

#[derive(Default)]
pub struct InMemoryReviewRepository {
    rows: Arc<RwLock<HashMap<String, Review>>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReviewRepository for InMemoryReviewRepository {
    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Review>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut reviews: Vec<_> = rows.read().await.values().cloned().collect();
            reviews.sort_by(|a, b| {
                b.created_at_ms
                    .cmp(&a.created_at_ms)
                    .then_with(|| b.id.cmp(&a.id))
            });
            Ok(reviews)
        })
    }

    fn get(&self, review_id: &str) -> BoxFuture<'_, DomainResult<Option<Review>>> {
        let review_id = review_id.to_string();
        let rows = self.rows.clone();
        Box::pin(async move { Ok(rows.read().await.get(&review_id).cloned()) })
    }

    fn create(&self, review: &Review) -> BoxFuture<'_, DomainResult<Review>> {
        let review = review.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            if rows.contains_key(&review.id) {
                return Err(DomainError::Conflict);
            }
            rows.insert(review.id.clone(), review.clone());
            Ok(review)
        })
    }

    fn update(&self, review: &Review) -> BoxFuture<'_, DomainResult<Review>> {
        let review = review.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            if !rows.contains_key(&review.id) {
                return Err(DomainError::NotFound);
            }
            rows.insert(review.id.clone(), review.clone());
            Ok(review)
        })
    }

    fn average_visible_rating(&self) -> BoxFuture<'_, DomainResult<Option<f64>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let rows = rows.read().await;
            let mut count = 0_u32;
            let mut sum = 0_i64;
            for review in rows.values().filter(|review| review.is_visible) {
                count += 1;
                sum += i64::from(review.rating);
            }
            if count == 0 {
                return Ok(None);
            }
            Ok(Some(sum as f64 / f64::from(count)))
        })
    }
}

#[derive(Default)]
pub struct InMemoryCostRepository {
    rows: Arc<RwLock<Vec<Cost>>>,
}

impl InMemoryCostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CostRepository for InMemoryCostRepository {
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
            costs.sort_by(|a, b| {
                b.date_ms
                    .cmp(&a.date_ms)
                    .then_with(|| b.created_at_ms.cmp(&a.created_at_ms))
            });
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

#[derive(Default)]
pub struct InMemoryPackageRepository {
    rows: Arc<RwLock<HashMap<String, Package>>>,
}

impl InMemoryPackageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PackageRepository for InMemoryPackageRepository {
    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Package>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut packages: Vec<_> = rows.read().await.values().cloned().collect();
            packages.sort_by(|a, b| {
                a.display_order
                    .cmp(&b.display_order)
                    .then_with(|| a.name.cmp(&b.name))
            });
            Ok(packages)
        })
    }

    fn get(&self, package_id: &str) -> BoxFuture<'_, DomainResult<Option<Package>>> {
        let package_id = package_id.to_string();
        let rows = self.rows.clone();
        Box::pin(async move { Ok(rows.read().await.get(&package_id).cloned()) })
    }

    fn create(&self, package: &Package) -> BoxFuture<'_, DomainResult<Package>> {
        let package = package.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            if rows.values().any(|existing| existing.name == package.name) {
                return Err(DomainError::Conflict);
            }
            rows.insert(package.id.clone(), package.clone());
            Ok(package)
        })
    }

    fn update(&self, package: &Package) -> BoxFuture<'_, DomainResult<Package>> {
        let package = package.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            if !rows.contains_key(&package.id) {
                return Err(DomainError::NotFound);
            }
            rows.insert(package.id.clone(), package.clone());
            Ok(package)
        })
    }
}

#[derive(Default)]
pub struct InMemoryChatRepository {
    rows: Arc<RwLock<Vec<StoredMessage>>>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatRepository for InMemoryChatRepository {
    fn append(&self, message: &StoredMessage) -> BoxFuture<'_, DomainResult<StoredMessage>> {
        let message = message.clone();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            if rows.iter().any(|existing| existing.id == message.id) {
                return Err(DomainError::Conflict);
            }
            rows.push(message.clone());
            Ok(message)
        })
    }

    fn list_by_room(
        &self,
        room_id: &str,
        limit: usize,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredMessage>>> {
        let room_id = room_id.to_string();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut messages: Vec<_> = rows
                .read()
                .await
                .iter()
                .filter(|message| message.room_id == room_id)
                .cloned()
                .collect();
            messages.sort_by(|a, b| {
                a.created_at_ms
                    .cmp(&b.created_at_ms)
                    .then_with(|| a.id.cmp(&b.id))
            });
            if messages.len() > limit {
                let start = messages.len() - limit;
                messages = messages.split_off(start);
            }
            Ok(messages)
        })
    }

    fn mark_read(
        &self,
        room_id: &str,
        sender_type: SenderType,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let room_id = room_id.to_string();
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut rows = rows.write().await;
            for message in rows.iter_mut() {
                if message.room_id == room_id
                    && message.sender_type == sender_type
                    && !message.is_read
                {
                    message.is_read = true;
                    message.read_at_ms = Some(read_at_ms);
                    message.updated_at_ms = read_at_ms;
                }
            }
            Ok(())
        })
    }

    fn unread_counts(
        &self,
        sender_type: SenderType,
    ) -> BoxFuture<'_, DomainResult<HashMap<String, u64>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut counts: HashMap<String, u64> = HashMap::new();
            for message in rows.read().await.iter() {
                if message.sender_type == sender_type && !message.is_read {
                    *counts.entry(message.room_id.clone()).or_default() += 1;
                }
            }
            Ok(counts)
        })
    }

    fn list_recent(
        &self,
        max_scanned: usize,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredMessage>>> {
        let rows = self.rows.clone();
        Box::pin(async move {
            let mut messages: Vec<_> = rows.read().await.clone();
            messages.sort_by(|a, b| {
                b.created_at_ms
                    .cmp(&a.created_at_ms)
                    .then_with(|| b.id.cmp(&a.id))
            });
            messages.truncate(max_scanned);
            Ok(messages)
        })
    }
}
