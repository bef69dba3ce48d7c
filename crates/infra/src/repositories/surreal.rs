//! SurrealDB adapters backing the `surrealdb` data backend. One table per
//! entity; timestamps are stored as datetimes and projected back out as
//! RFC 3339 strings.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use backoffice_domain::DomainResult;
use backoffice_domain::admin::{Admin, AdminRole};
use backoffice_domain::chat::{SenderType, StoredMessage};
use backoffice_domain::cost::{Cost, CostCategory, CostRangeQuery};
use backoffice_domain::dashboard::{DailyCount, DailyRevenue, PackageSales, SourceBreakdown};
use backoffice_domain::error::DomainError;
use backoffice_domain::member::{Member, MemberGrade, MemberListQuery, MemberPage};
use backoffice_domain::package::Package;
use backoffice_domain::payment::{Payment, PaymentSource, PaymentStatus, RevenueQuery};
use backoffice_domain::ports::BoxFuture;
use backoffice_domain::ports::admin::AdminRepository;
use backoffice_domain::ports::chat::ChatRepository;
use backoffice_domain::ports::cost::CostRepository;
use backoffice_domain::ports::member::MemberRepository;
use backoffice_domain::ports::package::PackageRepository;
use backoffice_domain::ports::payment::PaymentRepository;
use backoffice_domain::ports::review::ReviewRepository;
use backoffice_domain::review::{Review, ReviewSource};

use crate::db::DbConfig;

fn to_rfc3339(epoch_ms: i64) -> DomainResult<String> {
    let instant = OffsetDateTime::from_unix_timestamp_nanos(epoch_ms as i128 * 1_000_000)
        .map_err(|err| DomainError::Validation(format!("invalid timestamp: {err}")))?;
    Ok(instant
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string()))
}

fn parse_datetime(value: &str) -> DomainResult<i64> {
    let datetime = OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|err| DomainError::Validation(format!("invalid datetime: {err}")))?;
    Ok((datetime.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn parse_optional_datetime(value: Option<&str>) -> DomainResult<Option<i64>> {
    value.map(parse_datetime).transpose()
}

fn map_surreal_error(err: surrealdb::Error) -> DomainError {
    let error_message = err.to_string().to_lowercase();
    if error_message.contains("already exists")
        || error_message.contains("duplicate")
        || error_message.contains("unique")
        || error_message.contains("conflict")
    {
        return DomainError::Conflict;
    }
    DomainError::Storage(format!("surreal query failed: {error_message}"))
}

fn invalid_result(err: surrealdb::Error) -> DomainError {
    DomainError::Storage(format!("invalid query result: {err}"))
}

fn decode_rows<R, T>(
    rows: Vec<Value>,
    label: &str,
    map: impl Fn(R) -> DomainResult<T>,
) -> DomainResult<Vec<T>>
where
    R: DeserializeOwned,
{
    rows.into_iter()
        .map(|row| {
            serde_json::from_value::<R>(row)
                .map_err(|err| DomainError::Validation(format!("invalid {label} row: {err}")))
                .and_then(&map)
        })
        .collect()
}

fn count_field(rows: &[Value], field: &str) -> u64 {
    rows.first()
        .and_then(|row| row.get(field))
        .and_then(|value| {
            value
                .as_u64()
                .or_else(|| value.as_i64().and_then(|count| u64::try_from(count).ok()))
        })
        .unwrap_or_default()
}

fn sum_field(rows: &[Value], field: &str) -> i64 {
    rows.first()
        .and_then(|row| row.get(field))
        .and_then(|value| {
            value
                .as_i64()
                .or_else(|| value.as_f64().map(|total| total as i64))
        })
        .unwrap_or_default()
}

async fn connect(db_config: &DbConfig) -> anyhow::Result<Arc<Surreal<Client>>> {
    crate::db::connect(db_config).await
}

#[derive(Clone)]
pub struct SurrealAdminRepository {
    client: Arc<Surreal<Client>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealAdminRow {
    admin_id: String,
    email: String,
    password_hash: String,
    name: String,
    role: AdminRole,
    is_active: bool,
    last_login_at: Option<String>,
    created_at: String,
}

const ADMIN_PROJECTION: &str = "SELECT\n\
    admin_id,\n\
    email,\n\
    password_hash,\n\
    name,\n\
    role,\n\
    is_active,\n\
    IF last_login_at IS NONE THEN NONE ELSE type::string(last_login_at) END AS last_login_at,\n\
    type::string(created_at) AS created_at\n\
 FROM admin";

impl SurrealAdminRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: connect(db_config).await?,
        })
    }

    fn map_row(row: SurrealAdminRow) -> DomainResult<Admin> {
        Ok(Admin {
            id: row.admin_id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role: row.role,
            is_active: row.is_active,
            last_login_at_ms: parse_optional_datetime(row.last_login_at.as_deref())?,
            created_at_ms: parse_datetime(&row.created_at)?,
        })
    }
}

impl AdminRepository for SurrealAdminRepository {
    fn find_by_email(&self, email: &str) -> BoxFuture<'_, DomainResult<Option<Admin>>> {
        let email = email.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!("{ADMIN_PROJECTION} WHERE email = $email LIMIT 1"))
                .bind(("email", email))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(decode_rows(rows, "admin", Self::map_row)?.into_iter().next())
        })
    }

    fn any_exists(&self) -> BoxFuture<'_, DomainResult<bool>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query("SELECT count() AS total FROM admin GROUP ALL")
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(count_field(&rows, "total") > 0)
        })
    }

    fn create(&self, admin: &Admin) -> BoxFuture<'_, DomainResult<Admin>> {
        let created_at = match to_rfc3339(admin.created_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let admin_value = admin.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut existing = client
                .query("SELECT admin_id FROM admin WHERE email = $email LIMIT 1")
                .bind(("email", admin_value.email.clone()))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = existing.take(0).map_err(invalid_result)?;
            if !rows.is_empty() {
                return Err(DomainError::Conflict);
            }

            let response = client
                .query(
                    "CREATE admin CONTENT {\n\
                        admin_id: $admin_id,\n\
                        email: $email,\n\
                        password_hash: $password_hash,\n\
                        name: $name,\n\
                        role: $role,\n\
                        is_active: $is_active,\n\
                        last_login_at: NONE,\n\
                        created_at: <datetime>$created_at\n\
                    };",
                )
                .bind(("admin_id", admin_value.id.clone()))
                .bind(("email", admin_value.email.clone()))
                .bind(("password_hash", admin_value.password_hash.clone()))
                .bind(("name", admin_value.name.clone()))
                .bind(("role", admin_value.role.as_str().to_string()))
                .bind(("is_active", admin_value.is_active))
                .bind(("created_at", created_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(admin_value)
        })
    }

    fn update_last_login(
        &self,
        admin_id: &str,
        last_login_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let last_login_at = match to_rfc3339(last_login_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let admin_id = admin_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .query(
                    "UPDATE admin SET last_login_at = <datetime>$last_login_at \
                     WHERE admin_id = $admin_id",
                )
                .bind(("admin_id", admin_id))
                .bind(("last_login_at", last_login_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(())
        })
    }
}

#[derive(Clone)]
pub struct SurrealMemberRepository {
    client: Arc<Surreal<Client>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealMemberRow {
    member_id: String,
    name: String,
    email: String,
    phone: Option<String>,
    grade: MemberGrade,
    messenger_id: Option<String>,
    memo: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

const MEMBER_PROJECTION: &str = "SELECT\n\
    member_id,\n\
    name,\n\
    email,\n\
    phone,\n\
    grade,\n\
    messenger_id,\n\
    memo,\n\
    is_active,\n\
    type::string(created_at) AS created_at,\n\
    type::string(updated_at) AS updated_at\n\
 FROM member";

impl SurrealMemberRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: connect(db_config).await?,
        })
    }

    fn map_row(row: SurrealMemberRow) -> DomainResult<Member> {
        Ok(Member {
            id: row.member_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            grade: row.grade,
            messenger_id: row.messenger_id,
            memo: row.memo,
            is_active: row.is_active,
            created_at_ms: parse_datetime(&row.created_at)?,
            updated_at_ms: parse_datetime(&row.updated_at)?,
        })
    }
}

impl MemberRepository for SurrealMemberRepository {
    fn list(&self, query: &MemberListQuery) -> BoxFuture<'_, DomainResult<MemberPage>> {
        let query = query.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut conditions = Vec::<String>::new();
            if query.search.is_some() {
                conditions.push(
                    "(string::contains(string::lowercase(name), $term) \
                     OR string::contains(string::lowercase(email), $term))"
                        .to_string(),
                );
            }
            if query.grade.is_some() {
                conditions.push("grade = $grade".to_string());
            }
            let where_clause = if conditions.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", conditions.join(" AND "))
            };

            let start = ((query.page - 1) * query.limit) as i64;
            let page_sql = format!(
                "{MEMBER_PROJECTION}{where_clause} \
                 ORDER BY created_at DESC, member_id DESC LIMIT $limit START $start"
            );
            let count_sql =
                format!("SELECT count() AS total FROM member{where_clause} GROUP ALL");

            let mut page_query = client
                .query(page_sql)
                .bind(("limit", query.limit as i64))
                .bind(("start", start));
            let mut count_query = client.query(count_sql);
            if let Some(term) = &query.search {
                let term = term.to_lowercase();
                page_query = page_query.bind(("term", term.clone()));
                count_query = count_query.bind(("term", term));
            }
            if let Some(grade) = query.grade {
                page_query = page_query.bind(("grade", grade.as_str().to_string()));
                count_query = count_query.bind(("grade", grade.as_str().to_string()));
            }

            let mut response = page_query.await.map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            let members = decode_rows(rows, "member", Self::map_row)?;

            let mut count_response = count_query.await.map_err(map_surreal_error)?;
            let count_rows: Vec<Value> = count_response.take(0).map_err(invalid_result)?;
            Ok(MemberPage {
                members,
                total: count_field(&count_rows, "total"),
            })
        })
    }

    fn get(&self, member_id: &str) -> BoxFuture<'_, DomainResult<Option<Member>>> {
        let member_id = member_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "{MEMBER_PROJECTION} WHERE member_id = $member_id LIMIT 1"
                ))
                .bind(("member_id", member_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(decode_rows(rows, "member", Self::map_row)?
                .into_iter()
                .next())
        })
    }

    fn create(&self, member: &Member) -> BoxFuture<'_, DomainResult<Member>> {
        let created_at = match to_rfc3339(member.created_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let updated_at = match to_rfc3339(member.updated_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let member_value = member.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut existing = client
                .query("SELECT member_id FROM member WHERE email = $email LIMIT 1")
                .bind(("email", member_value.email.clone()))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = existing.take(0).map_err(invalid_result)?;
            if !rows.is_empty() {
                return Err(DomainError::Conflict);
            }

            let response = client
                .query(
                    "CREATE member CONTENT {\n\
                        member_id: $member_id,\n\
                        name: $name,\n\
                        email: $email,\n\
                        phone: $phone,\n\
                        grade: $grade,\n\
                        messenger_id: $messenger_id,\n\
                        memo: $memo,\n\
                        is_active: $is_active,\n\
                        created_at: <datetime>$created_at,\n\
                        updated_at: <datetime>$updated_at\n\
                    };",
                )
                .bind(("member_id", member_value.id.clone()))
                .bind(("name", member_value.name.clone()))
                .bind(("email", member_value.email.clone()))
                .bind(("phone", member_value.phone.clone()))
                .bind(("grade", member_value.grade.as_str().to_string()))
                .bind(("messenger_id", member_value.messenger_id.clone()))
                .bind(("memo", member_value.memo.clone()))
                .bind(("is_active", member_value.is_active))
                .bind(("created_at", created_at))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(member_value)
        })
    }

    fn update(&self, member: &Member) -> BoxFuture<'_, DomainResult<Member>> {
        let updated_at = match to_rfc3339(member.updated_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let member_value = member.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "UPDATE member SET\n\
                        name = $name,\n\
                        email = $email,\n\
                        phone = $phone,\n\
                        grade = $grade,\n\
                        messenger_id = $messenger_id,\n\
                        memo = $memo,\n\
                        is_active = $is_active,\n\
                        updated_at = <datetime>$updated_at\n\
                     WHERE member_id = $member_id\n\
                     RETURN AFTER",
                )
                .bind(("member_id", member_value.id.clone()))
                .bind(("name", member_value.name.clone()))
                .bind(("email", member_value.email.clone()))
                .bind(("phone", member_value.phone.clone()))
                .bind(("grade", member_value.grade.as_str().to_string()))
                .bind(("messenger_id", member_value.messenger_id.clone()))
                .bind(("memo", member_value.memo.clone()))
                .bind(("is_active", member_value.is_active))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            if rows.is_empty() {
                return Err(DomainError::NotFound);
            }
            Ok(member_value)
        })
    }

    fn count_active(&self) -> BoxFuture<'_, DomainResult<u64>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query("SELECT count() AS total FROM member WHERE is_active = true GROUP ALL")
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(count_field(&rows, "total"))
        })
    }

    fn daily_signups(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<Vec<DailyCount>>> {
        let since = match to_rfc3339(since_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT\n\
                        time::format(created_at, '%Y-%m-%d') AS date,\n\
                        count() AS count\n\
                     FROM member\n\
                     WHERE created_at >= <datetime>$since\n\
                     GROUP BY date",
                )
                .bind(("since", since))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            let mut days = decode_rows(rows, "daily signup", Ok::<DailyCount, DomainError>)?;
            days.sort_by(|a, b| a.date.cmp(&b.date));
            Ok(days)
        })
    }
}

#[derive(Clone)]
pub struct SurrealPaymentRepository {
    client: Arc<Surreal<Client>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealPaymentRow {
    payment_id: String,
    member_id: String,
    package_name: String,
    amount: i64,
    source: PaymentSource,
    status: PaymentStatus,
    order_id: Option<String>,
    payment_key: Option<String>,
    paid_at: Option<String>,
    refunded_at: Option<String>,
    created_at: String,
}

const PAYMENT_PROJECTION: &str = "SELECT\n\
    payment_id,\n\
    member_id,\n\
    package_name,\n\
    amount,\n\
    source,\n\
    status,\n\
    order_id,\n\
    payment_key,\n\
    IF paid_at IS NONE THEN NONE ELSE type::string(paid_at) END AS paid_at,\n\
    IF refunded_at IS NONE THEN NONE ELSE type::string(refunded_at) END AS refunded_at,\n\
    type::string(created_at) AS created_at\n\
 FROM payment";

impl SurrealPaymentRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: connect(db_config).await?,
        })
    }

    fn map_row(row: SurrealPaymentRow) -> DomainResult<Payment> {
        Ok(Payment {
            id: row.payment_id,
            member_id: row.member_id,
            package_name: row.package_name,
            amount: row.amount,
            source: row.source,
            status: row.status,
            order_id: row.order_id,
            payment_key: row.payment_key,
            paid_at_ms: parse_optional_datetime(row.paid_at.as_deref())?,
            refunded_at_ms: parse_optional_datetime(row.refunded_at.as_deref())?,
            created_at_ms: parse_datetime(&row.created_at)?,
        })
    }

    async fn insert_one(
        client: &Surreal<Client>,
        payment: &Payment,
    ) -> DomainResult<bool> {
        if let Some(order_id) = &payment.order_id {
            let mut existing = client
                .query("SELECT payment_id FROM payment WHERE order_id = $order_id LIMIT 1")
                .bind(("order_id", order_id.clone()))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = existing.take(0).map_err(invalid_result)?;
            if !rows.is_empty() {
                return Ok(false);
            }
        }

        let created_at = to_rfc3339(payment.created_at_ms)?;
        let paid_at = payment.paid_at_ms.map(to_rfc3339).transpose()?;
        let refunded_at = payment.refunded_at_ms.map(to_rfc3339).transpose()?;
        let response = client
            .query(
                "CREATE payment CONTENT {\n\
                    payment_id: $payment_id,\n\
                    member_id: $member_id,\n\
                    package_name: $package_name,\n\
                    amount: $amount,\n\
                    source: $source,\n\
                    status: $status,\n\
                    order_id: $order_id,\n\
                    payment_key: $payment_key,\n\
                    paid_at: IF $paid_at IS NONE THEN NONE ELSE <datetime>$paid_at END,\n\
                    refunded_at: IF $refunded_at IS NONE THEN NONE ELSE <datetime>$refunded_at END,\n\
                    created_at: <datetime>$created_at\n\
                };",
            )
            .bind(("payment_id", payment.id.clone()))
            .bind(("member_id", payment.member_id.clone()))
            .bind(("package_name", payment.package_name.clone()))
            .bind(("amount", payment.amount))
            .bind(("source", payment.source.as_str().to_string()))
            .bind(("status", payment.status.as_str().to_string()))
            .bind(("order_id", payment.order_id.clone()))
            .bind(("payment_key", payment.payment_key.clone()))
            .bind(("paid_at", paid_at))
            .bind(("refunded_at", refunded_at))
            .bind(("created_at", created_at))
            .await
            .map_err(map_surreal_error)?;
        response.check().map_err(map_surreal_error)?;
        Ok(true)
    }
}

impl PaymentRepository for SurrealPaymentRepository {
    fn list_completed(&self, query: &RevenueQuery) -> BoxFuture<'_, DomainResult<Vec<Payment>>> {
        let query = query.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut conditions = vec!["status = 'COMPLETED'".to_string()];
            if query.from_ms.is_some() {
                conditions.push("paid_at >= <datetime>$from".to_string());
            }
            if query.to_ms.is_some() {
                conditions.push("paid_at <= <datetime>$to".to_string());
            }
            if query.source.is_some() {
                conditions.push("source = $source".to_string());
            }
            let sql = format!(
                "{PAYMENT_PROJECTION} WHERE {} ORDER BY paid_at DESC, payment_id DESC",
                conditions.join(" AND ")
            );

            let mut handle = client.query(sql);
            if let Some(from_ms) = query.from_ms {
                handle = handle.bind(("from", to_rfc3339(from_ms)?));
            }
            if let Some(to_ms) = query.to_ms {
                handle = handle.bind(("to", to_rfc3339(to_ms)?));
            }
            if let Some(source) = query.source {
                handle = handle.bind(("source", source.as_str().to_string()));
            }
            let mut response = handle.await.map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "payment", Self::map_row)
        })
    }

    fn list_by_member(&self, member_id: &str) -> BoxFuture<'_, DomainResult<Vec<Payment>>> {
        let member_id = member_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "{PAYMENT_PROJECTION} WHERE member_id = $member_id \
                     ORDER BY paid_at DESC, payment_id DESC"
                ))
                .bind(("member_id", member_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "payment", Self::map_row)
        })
    }

    fn insert_many(&self, payments: &[Payment]) -> BoxFuture<'_, DomainResult<usize>> {
        let payments = payments.to_vec();
        let client = self.client.clone();
        Box::pin(async move {
            let mut inserted = 0;
            for payment in &payments {
                if Self::insert_one(&client, payment).await? {
                    inserted += 1;
                }
            }
            Ok(inserted)
        })
    }

    fn sum_completed_since(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<i64>> {
        let since = match to_rfc3339(since_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT math::sum(amount) AS total FROM payment \
                     WHERE status = 'COMPLETED' AND paid_at >= <datetime>$since GROUP ALL",
                )
                .bind(("since", since))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(sum_field(&rows, "total"))
        })
    }

    fn daily_revenue(&self, since_ms: i64) -> BoxFuture<'_, DomainResult<Vec<DailyRevenue>>> {
        let since = match to_rfc3339(since_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT\n\
                        time::format(paid_at, '%Y-%m-%d') AS date,\n\
                        math::sum(amount) AS total,\n\
                        count() AS count\n\
                     FROM payment\n\
                     WHERE status = 'COMPLETED' AND paid_at >= <datetime>$since\n\
                     GROUP BY date",
                )
                .bind(("since", since))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            let mut days =
                decode_rows(rows, "daily revenue", Ok::<DailyRevenue, DomainError>)?;
            days.sort_by(|a, b| a.date.cmp(&b.date));
            Ok(days)
        })
    }

    fn sales_by_package(&self) -> BoxFuture<'_, DomainResult<Vec<PackageSales>>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT\n\
                        package_name AS packageName,\n\
                        count() AS count,\n\
                        math::sum(amount) AS total\n\
                     FROM payment\n\
                     WHERE status = 'COMPLETED'\n\
                     GROUP BY packageName",
                )
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            let mut sales =
                decode_rows(rows, "package sales", Ok::<PackageSales, DomainError>)?;
            sales.sort_by(|a, b| a.package_name.cmp(&b.package_name));
            Ok(sales)
        })
    }

    fn totals_by_source(&self) -> BoxFuture<'_, DomainResult<Vec<SourceBreakdown>>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT\n\
                        source,\n\
                        count() AS count,\n\
                        math::sum(amount) AS total\n\
                     FROM payment\n\
                     WHERE status = 'COMPLETED'\n\
                     GROUP BY source",
                )
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            let mut sources =
                decode_rows(rows, "source breakdown", Ok::<SourceBreakdown, DomainError>)?;
            sources.sort_by_key(|breakdown| breakdown.source.as_str());
            Ok(sources)
        })
    }
}

#[derive(Clone)]
pub struct SurrealReviewRepository {
    client: Arc<Surreal<Client>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealReviewRow {
    review_id: String,
    member_id: Option<String>,
    rating: i32,
    content: String,
    source: ReviewSource,
    admin_reply: Option<String>,
    replied_at: Option<String>,
    is_visible: bool,
    created_at: String,
}

const REVIEW_PROJECTION: &str = "SELECT\n\
    review_id,\n\
    member_id,\n\
    rating,\n\
    content,\n\
    source,\n\
    admin_reply,\n\
    IF replied_at IS NONE THEN NONE ELSE type::string(replied_at) END AS replied_at,\n\
    is_visible,\n\
    type::string(created_at) AS created_at\n\
 FROM review";

impl SurrealReviewRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: connect(db_config).await?,
        })
    }

    fn map_row(row: SurrealReviewRow) -> DomainResult<Review> {
        Ok(Review {
            id: row.review_id,
            member_id: row.member_id,
            rating: row.rating,
            content: row.content,
            source: row.source,
            admin_reply: row.admin_reply,
            replied_at_ms: parse_optional_datetime(row.replied_at.as_deref())?,
            is_visible: row.is_visible,
            created_at_ms: parse_datetime(&row.created_at)?,
        })
    }
}

impl ReviewRepository for SurrealReviewRepository {
    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Review>>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "{REVIEW_PROJECTION} ORDER BY created_at DESC, review_id DESC"
                ))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "review", Self::map_row)
        })
    }

    fn get(&self, review_id: &str) -> BoxFuture<'_, DomainResult<Option<Review>>> {
        let review_id = review_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "{REVIEW_PROJECTION} WHERE review_id = $review_id LIMIT 1"
                ))
                .bind(("review_id", review_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(decode_rows(rows, "review", Self::map_row)?
                .into_iter()
                .next())
        })
    }

    fn create(&self, review: &Review) -> BoxFuture<'_, DomainResult<Review>> {
        let created_at = match to_rfc3339(review.created_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let review_value = review.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .query(
                    "CREATE review CONTENT {\n\
                        review_id: $review_id,\n\
                        member_id: $member_id,\n\
                        rating: $rating,\n\
                        content: $content,\n\
                        source: $source,\n\
                        admin_reply: NONE,\n\
                        replied_at: NONE,\n\
                        is_visible: $is_visible,\n\
                        created_at: <datetime>$created_at\n\
                    };",
                )
                .bind(("review_id", review_value.id.clone()))
                .bind(("member_id", review_value.member_id.clone()))
                .bind(("rating", i64::from(review_value.rating)))
                .bind(("content", review_value.content.clone()))
                .bind(("source", review_value.source.as_str().to_string()))
                .bind(("is_visible", review_value.is_visible))
                .bind(("created_at", created_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(review_value)
        })
    }

    fn update(&self, review: &Review) -> BoxFuture<'_, DomainResult<Review>> {
        let replied_at = match review.replied_at_ms.map(to_rfc3339).transpose() {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let review_value = review.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "UPDATE review SET\n\
                        admin_reply = $admin_reply,\n\
                        replied_at = IF $replied_at IS NONE THEN NONE ELSE <datetime>$replied_at END,\n\
                        is_visible = $is_visible\n\
                     WHERE review_id = $review_id\n\
                     RETURN AFTER",
                )
                .bind(("review_id", review_value.id.clone()))
                .bind(("admin_reply", review_value.admin_reply.clone()))
                .bind(("replied_at", replied_at))
                .bind(("is_visible", review_value.is_visible))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            if rows.is_empty() {
                return Err(DomainError::NotFound);
            }
            Ok(review_value)
        })
    }

    fn average_visible_rating(&self) -> BoxFuture<'_, DomainResult<Option<f64>>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT math::mean(rating) AS avg FROM review \
                     WHERE is_visible = true GROUP ALL",
                )
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(rows
                .first()
                .and_then(|row| row.get("avg"))
                .and_then(|value| value.as_f64()))
        })
    }
}

#[derive(Clone)]
pub struct SurrealCostRepository {
    client: Arc<Surreal<Client>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealCostRow {
    cost_id: String,
    category: CostCategory,
    amount: i64,
    description: Option<String>,
    cost_date: String,
    is_recurring: bool,
    created_at: String,
}

const COST_PROJECTION: &str = "SELECT\n\
    cost_id,\n\
    category,\n\
    amount,\n\
    description,\n\
    type::string(cost_date) AS cost_date,\n\
    is_recurring,\n\
    type::string(created_at) AS created_at\n\
 FROM cost";

impl SurrealCostRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: connect(db_config).await?,
        })
    }

    fn map_row(row: SurrealCostRow) -> DomainResult<Cost> {
        Ok(Cost {
            id: row.cost_id,
            category: row.category,
            amount: row.amount,
            description: row.description,
            date_ms: parse_datetime(&row.cost_date)?,
            is_recurring: row.is_recurring,
            created_at_ms: parse_datetime(&row.created_at)?,
        })
    }
}

impl CostRepository for SurrealCostRepository {
    fn list(&self, query: &CostRangeQuery) -> BoxFuture<'_, DomainResult<Vec<Cost>>> {
        let query = query.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut conditions = Vec::<String>::new();
            if query.from_ms.is_some() {
                conditions.push("cost_date >= <datetime>$from".to_string());
            }
            if query.to_ms.is_some() {
                conditions.push("cost_date <= <datetime>$to".to_string());
            }
            let where_clause = if conditions.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", conditions.join(" AND "))
            };
            let sql = format!(
                "{COST_PROJECTION}{where_clause} ORDER BY cost_date DESC, cost_id DESC"
            );

            let mut handle = client.query(sql);
            if let Some(from_ms) = query.from_ms {
                handle = handle.bind(("from", to_rfc3339(from_ms)?));
            }
            if let Some(to_ms) = query.to_ms {
                handle = handle.bind(("to", to_rfc3339(to_ms)?));
            }
            let mut response = handle.await.map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "cost", Self::map_row)
        })
    }

    fn create(&self, cost: &Cost) -> BoxFuture<'_, DomainResult<Cost>> {
        let cost_date = match to_rfc3339(cost.date_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let created_at = match to_rfc3339(cost.created_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let cost_value = cost.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .query(
                    "CREATE cost CONTENT {\n\
                        cost_id: $cost_id,\n\
                        category: $category,\n\
                        amount: $amount,\n\
                        description: $description,\n\
                        cost_date: <datetime>$cost_date,\n\
                        is_recurring: $is_recurring,\n\
                        created_at: <datetime>$created_at\n\
                    };",
                )
                .bind(("cost_id", cost_value.id.clone()))
                .bind(("category", cost_value.category.as_str().to_string()))
                .bind(("amount", cost_value.amount))
                .bind(("description", cost_value.description.clone()))
                .bind(("cost_date", cost_date))
                .bind(("is_recurring", cost_value.is_recurring))
                .bind(("created_at", created_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(cost_value)
        })
    }
}

#[derive(Clone)]
pub struct SurrealPackageRepository {
    client: Arc<Surreal<Client>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealPackageRow {
    package_id: String,
    name: String,
    price: i64,
    features: Vec<String>,
    work_days: i32,
    revisions: i32,
    is_active: bool,
    display_order: i32,
    badge: Option<String>,
    created_at: String,
    updated_at: String,
}

const PACKAGE_PROJECTION: &str = "SELECT\n\
    package_id,\n\
    name,\n\
    price,\n\
    features,\n\
    work_days,\n\
    revisions,\n\
    is_active,\n\
    display_order,\n\
    badge,\n\
    type::string(created_at) AS created_at,\n\
    type::string(updated_at) AS updated_at\n\
 FROM package";

impl SurrealPackageRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: connect(db_config).await?,
        })
    }

    fn map_row(row: SurrealPackageRow) -> DomainResult<Package> {
        Ok(Package {
            id: row.package_id,
            name: row.name,
            price: row.price,
            features: row.features,
            work_days: row.work_days,
            revisions: row.revisions,
            is_active: row.is_active,
            display_order: row.display_order,
            badge: row.badge,
            created_at_ms: parse_datetime(&row.created_at)?,
            updated_at_ms: parse_datetime(&row.updated_at)?,
        })
    }
}

impl PackageRepository for SurrealPackageRepository {
    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Package>>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "{PACKAGE_PROJECTION} ORDER BY display_order ASC, name ASC"
                ))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "package", Self::map_row)
        })
    }

    fn get(&self, package_id: &str) -> BoxFuture<'_, DomainResult<Option<Package>>> {
        let package_id = package_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "{PACKAGE_PROJECTION} WHERE package_id = $package_id LIMIT 1"
                ))
                .bind(("package_id", package_id))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            Ok(decode_rows(rows, "package", Self::map_row)?
                .into_iter()
                .next())
        })
    }

    fn create(&self, package: &Package) -> BoxFuture<'_, DomainResult<Package>> {
        let created_at = match to_rfc3339(package.created_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let updated_at = match to_rfc3339(package.updated_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let package_value = package.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut existing = client
                .query("SELECT package_id FROM package WHERE name = $name LIMIT 1")
                .bind(("name", package_value.name.clone()))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = existing.take(0).map_err(invalid_result)?;
            if !rows.is_empty() {
                return Err(DomainError::Conflict);
            }

            let response = client
                .query(
                    "CREATE package CONTENT {\n\
                        package_id: $package_id,\n\
                        name: $name,\n\
                        price: $price,\n\
                        features: $features,\n\
                        work_days: $work_days,\n\
                        revisions: $revisions,\n\
                        is_active: $is_active,\n\
                        display_order: $display_order,\n\
                        badge: $badge,\n\
                        created_at: <datetime>$created_at,\n\
                        updated_at: <datetime>$updated_at\n\
                    };",
                )
                .bind(("package_id", package_value.id.clone()))
                .bind(("name", package_value.name.clone()))
                .bind(("price", package_value.price))
                .bind(("features", package_value.features.clone()))
                .bind(("work_days", i64::from(package_value.work_days)))
                .bind(("revisions", i64::from(package_value.revisions)))
                .bind(("is_active", package_value.is_active))
                .bind(("display_order", i64::from(package_value.display_order)))
                .bind(("badge", package_value.badge.clone()))
                .bind(("created_at", created_at))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(package_value)
        })
    }

    fn update(&self, package: &Package) -> BoxFuture<'_, DomainResult<Package>> {
        let updated_at = match to_rfc3339(package.updated_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let package_value = package.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "UPDATE package SET\n\
                        name = $name,\n\
                        price = $price,\n\
                        features = $features,\n\
                        work_days = $work_days,\n\
                        revisions = $revisions,\n\
                        badge = $badge,\n\
                        updated_at = <datetime>$updated_at\n\
                     WHERE package_id = $package_id\n\
                     RETURN AFTER",
                )
                .bind(("package_id", package_value.id.clone()))
                .bind(("name", package_value.name.clone()))
                .bind(("price", package_value.price))
                .bind(("features", package_value.features.clone()))
                .bind(("work_days", i64::from(package_value.work_days)))
                .bind(("revisions", i64::from(package_value.revisions)))
                .bind(("badge", package_value.badge.clone()))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            if rows.is_empty() {
                return Err(DomainError::NotFound);
            }
            Ok(package_value)
        })
    }
}

#[derive(Clone)]
pub struct SurrealChatRepository {
    client: Arc<Surreal<Client>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurrealChatMessageRow {
    message_id: String,
    room_id: String,
    sender_type: SenderType,
    sender_name: String,
    body: String,
    is_read: bool,
    read_at: Option<String>,
    created_at: String,
    updated_at: String,
}

const CHAT_MESSAGE_PROJECTION: &str = "SELECT\n\
    message_id,\n\
    room_id,\n\
    sender_type,\n\
    sender_name,\n\
    body,\n\
    is_read,\n\
    IF read_at IS NONE THEN NONE ELSE type::string(read_at) END AS read_at,\n\
    type::string(created_at) AS created_at,\n\
    type::string(updated_at) AS updated_at\n\
 FROM chat_message";

impl SurrealChatRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    pub async fn new(db_config: &DbConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: connect(db_config).await?,
        })
    }

    fn map_row(row: SurrealChatMessageRow) -> DomainResult<StoredMessage> {
        Ok(StoredMessage {
            id: row.message_id,
            room_id: row.room_id,
            sender_type: row.sender_type,
            sender_name: row.sender_name,
            message: row.body,
            is_read: row.is_read,
            read_at_ms: parse_optional_datetime(row.read_at.as_deref())?,
            created_at_ms: parse_datetime(&row.created_at)?,
            updated_at_ms: parse_datetime(&row.updated_at)?,
        })
    }
}

impl ChatRepository for SurrealChatRepository {
    fn append(&self, message: &StoredMessage) -> BoxFuture<'_, DomainResult<StoredMessage>> {
        let created_at = match to_rfc3339(message.created_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let updated_at = match to_rfc3339(message.updated_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let message_value = message.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .query(
                    "CREATE chat_message CONTENT {\n\
                        message_id: $message_id,\n\
                        room_id: $room_id,\n\
                        sender_type: $sender_type,\n\
                        sender_name: $sender_name,\n\
                        body: $body,\n\
                        is_read: $is_read,\n\
                        read_at: NONE,\n\
                        created_at: <datetime>$created_at,\n\
                        updated_at: <datetime>$updated_at\n\
                    };",
                )
                .bind(("message_id", message_value.id.clone()))
                .bind(("room_id", message_value.room_id.clone()))
                .bind(("sender_type", message_value.sender_type.as_str().to_string()))
                .bind(("sender_name", message_value.sender_name.clone()))
                .bind(("body", message_value.message.clone()))
                .bind(("is_read", message_value.is_read))
                .bind(("created_at", created_at))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(message_value)
        })
    }

    fn list_by_room(
        &self,
        room_id: &str,
        limit: usize,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredMessage>>> {
        let room_id = room_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "{CHAT_MESSAGE_PROJECTION} WHERE room_id = $room_id \
                     ORDER BY created_at DESC, message_id DESC LIMIT $limit"
                ))
                .bind(("room_id", room_id))
                .bind(("limit", limit as i64))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            let mut messages = decode_rows(rows, "chat message", Self::map_row)?;
            messages.reverse();
            Ok(messages)
        })
    }

    fn mark_read(
        &self,
        room_id: &str,
        sender_type: SenderType,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let read_at = match to_rfc3339(read_at_ms) {
            Ok(value) => value,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let room_id = room_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .query(
                    "UPDATE chat_message SET\n\
                        is_read = true,\n\
                        read_at = <datetime>$read_at,\n\
                        updated_at = <datetime>$read_at\n\
                     WHERE room_id = $room_id\n\
                       AND sender_type = $sender_type\n\
                       AND is_read = false",
                )
                .bind(("room_id", room_id))
                .bind(("sender_type", sender_type.as_str().to_string()))
                .bind(("read_at", read_at))
                .await
                .map_err(map_surreal_error)?;
            response.check().map_err(map_surreal_error)?;
            Ok(())
        })
    }

    fn unread_counts(
        &self,
        sender_type: SenderType,
    ) -> BoxFuture<'_, DomainResult<HashMap<String, u64>>> {
        let client = self.client.clone();
        let sender_type = sender_type.as_str().to_string();
        Box::pin(async move {
            #[derive(Deserialize)]
            struct UnreadRow {
                room_id: String,
                cnt: u64,
            }

            let mut response = client
                .query(
                    "SELECT room_id, count() AS cnt FROM chat_message \
                     WHERE sender_type = $sender_type AND is_read = false \
                     GROUP BY room_id",
                )
                .bind(("sender_type", sender_type))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            let rows = decode_rows(rows, "unread count", Ok::<UnreadRow, DomainError>)?;
            Ok(rows
                .into_iter()
                .map(|row| (row.room_id, row.cnt))
                .collect())
        })
    }

    fn list_recent(
        &self,
        max_scanned: usize,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredMessage>>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(format!(
                    "{CHAT_MESSAGE_PROJECTION} \
                     ORDER BY created_at DESC, message_id DESC LIMIT $limit"
                ))
                .bind(("limit", max_scanned as i64))
                .await
                .map_err(map_surreal_error)?;
            let rows: Vec<Value> = response.take(0).map_err(invalid_result)?;
            decode_rows(rows, "chat message", Self::map_row)
        })
    }
}
