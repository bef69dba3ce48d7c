//! Handlers for the conventional admin resources: dashboard aggregates,
//! members, revenue, pricing, reviews, and costs. Each handler verifies the
//! caller through the shared auth gate, runs one store operation (aggregate
//! endpoints combine a few independent reads), and returns JSON.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use backoffice_domain::cost::{Cost, CostCategory, CostCreate, CostRangeQuery};
use backoffice_domain::dashboard::{DailyCount, DailyRevenue, DashboardStats, PackageSales, SourceBreakdown};
use backoffice_domain::member::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Member, MemberGrade, MemberListQuery, MemberUpdate,
};
use backoffice_domain::package::{Package, PackageUpdate};
use backoffice_domain::payment::{KmongImportRow, Payment, PaymentSource, RevenueQuery, RevenueSummary};
use backoffice_domain::review::{Review, ReviewCreate, ReviewSource};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

use super::map_domain_error;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DashboardStatsResponse {
    today_visitors: u64,
    #[serde(flatten)]
    stats: DashboardStats,
}

pub(crate) async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStatsResponse>, ApiError> {
    let stats = state.dashboard.stats().await.map_err(map_domain_error)?;
    // Placeholder until an analytics feed exists, mirroring the figure the
    // dashboard has always shown.
    let today_visitors = rand::rng().random_range(50..150);
    Ok(Json(DashboardStatsResponse {
        today_visitors,
        stats,
    }))
}

pub(crate) async fn daily_signups(
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyCount>>, ApiError> {
    let days = state
        .dashboard
        .daily_signups()
        .await
        .map_err(map_domain_error)?;
    Ok(Json(days))
}

pub(crate) async fn daily_revenue(
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyRevenue>>, ApiError> {
    let days = state
        .dashboard
        .daily_revenue()
        .await
        .map_err(map_domain_error)?;
    Ok(Json(days))
}

pub(crate) async fn package_sales(
    State(state): State<AppState>,
) -> Result<Json<Vec<PackageSales>>, ApiError> {
    let sales = state
        .dashboard
        .package_sales()
        .await
        .map_err(map_domain_error)?;
    Ok(Json(sales))
}

pub(crate) async fn revenue_sources(
    State(state): State<AppState>,
) -> Result<Json<Vec<SourceBreakdown>>, ApiError> {
    let sources = state
        .dashboard
        .revenue_sources()
        .await
        .map_err(map_domain_error)?;
    Ok(Json(sources))
}

#[derive(Debug, Deserialize)]
pub(crate) struct MembersQuery {
    page: Option<usize>,
    limit: Option<usize>,
    search: Option<String>,
    grade: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct Pagination {
    total: u64,
    page: usize,
    pages: u64,
}

#[derive(Serialize)]
pub(crate) struct MembersResponse {
    members: Vec<Member>,
    pagination: Pagination,
}

pub(crate) async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<MembersQuery>,
) -> Result<Json<MembersResponse>, ApiError> {
    let grade = query
        .grade
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(|value| {
            MemberGrade::parse(value)
                .ok_or_else(|| ApiError::Validation(format!("unknown grade '{value}'")))
        })
        .transpose()?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let result = state
        .members
        .list(MemberListQuery {
            search: query.search,
            grade,
            page,
            limit,
        })
        .await
        .map_err(map_domain_error)?;

    let pages = result.total.div_ceil(limit as u64);
    Ok(Json(MembersResponse {
        members: result.members,
        pagination: Pagination {
            total: result.total,
            page,
            pages,
        },
    }))
}

#[derive(Serialize)]
pub(crate) struct MemberDetailResponse {
    #[serde(flatten)]
    member: Member,
    payments: Vec<Payment>,
}

pub(crate) async fn get_member(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<MemberDetailResponse>, ApiError> {
    let member = state
        .members
        .get(&member_id)
        .await
        .map_err(map_domain_error)?;
    let payments = state
        .payments
        .list_by_member(&member_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(MemberDetailResponse { member, payments }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateMemberRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(email)]
    email: String,
    phone: Option<String>,
    grade: MemberGrade,
    messenger_id: Option<String>,
    memo: Option<String>,
}

pub(crate) async fn update_member(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
    Json(payload): Json<UpdateMemberRequest>,
) -> Result<Json<Member>, ApiError> {
    validation::validate(&payload)?;
    let member = state
        .members
        .update(
            &member_id,
            MemberUpdate {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                grade: payload.grade,
                messenger_id: payload.messenger_id,
                memo: payload.memo,
            },
        )
        .await
        .map_err(map_domain_error)?;
    Ok(Json(member))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RevenueParams {
    start_date: Option<String>,
    end_date: Option<String>,
    source: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RevenueResponse {
    payments: Vec<Payment>,
    summary: RevenueSummary,
}

pub(crate) async fn list_revenue(
    State(state): State<AppState>,
    Query(params): Query<RevenueParams>,
) -> Result<Json<RevenueResponse>, ApiError> {
    let source = params
        .source
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(|value| {
            PaymentSource::parse(value)
                .ok_or_else(|| ApiError::Validation(format!("unknown source '{value}'")))
        })
        .transpose()?;
    let query = RevenueQuery::from_dates(
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        source,
    )
    .map_err(map_domain_error)?;

    let (payments, summary) = state
        .payments
        .list_revenue(query)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(RevenueResponse { payments, summary }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct KmongUploadRequest {
    data: Vec<KmongImportRow>,
}

#[derive(Serialize)]
pub(crate) struct KmongUploadResponse {
    success: bool,
    count: usize,
    message: String,
}

pub(crate) async fn upload_kmong_revenue(
    State(state): State<AppState>,
    Json(payload): Json<KmongUploadRequest>,
) -> Result<Json<KmongUploadResponse>, ApiError> {
    if payload.data.is_empty() {
        return Err(ApiError::Validation("data must not be empty".into()));
    }
    let count = state
        .payments
        .import_kmong(payload.data)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(KmongUploadResponse {
        success: true,
        count,
        message: format!("imported {count} settlement rows"),
    }))
}

pub(crate) async fn list_packages(
    State(state): State<AppState>,
) -> Result<Json<Vec<Package>>, ApiError> {
    let packages = state.packages.list().await.map_err(map_domain_error)?;
    Ok(Json(packages))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdatePackageRequest {
    #[validate(length(min = 1, max = 50))]
    name: String,
    price: i64,
    features: Vec<String>,
    work_days: i32,
    revisions: i32,
    badge: Option<String>,
}

pub(crate) async fn update_package(
    State(state): State<AppState>,
    Path(package_id): Path<String>,
    Json(payload): Json<UpdatePackageRequest>,
) -> Result<Json<Package>, ApiError> {
    validation::validate(&payload)?;
    let package = state
        .packages
        .update(
            &package_id,
            PackageUpdate {
                name: payload.name,
                price: payload.price,
                features: payload.features,
                work_days: payload.work_days,
                revisions: payload.revisions,
                badge: payload.badge,
            },
        )
        .await
        .map_err(map_domain_error)?;
    Ok(Json(package))
}

#[derive(Serialize)]
pub(crate) struct ReviewWithMember {
    #[serde(flatten)]
    review: Review,
    #[serde(rename = "memberName")]
    member_name: Option<String>,
}

pub(crate) async fn list_reviews(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReviewWithMember>>, ApiError> {
    let reviews = state.reviews.list().await.map_err(map_domain_error)?;

    let mut names: HashMap<String, String> = HashMap::new();
    for member_id in reviews.iter().filter_map(|review| review.member_id.clone()) {
        if names.contains_key(&member_id) {
            continue;
        }
        if let Some(member) = state
            .repos
            .member
            .get(&member_id)
            .await
            .map_err(map_domain_error)?
        {
            names.insert(member_id, member.name);
        }
    }

    let reviews = reviews
        .into_iter()
        .map(|review| {
            let member_name = review
                .member_id
                .as_ref()
                .and_then(|member_id| names.get(member_id).cloned());
            ReviewWithMember {
                review,
                member_name,
            }
        })
        .collect();
    Ok(Json(reviews))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateReviewRequest {
    member_id: Option<String>,
    rating: i32,
    #[validate(length(min = 1))]
    content: String,
    source: ReviewSource,
}

pub(crate) async fn create_review(
    State(state): State<AppState>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let review = state
        .reviews
        .submit(ReviewCreate {
            member_id: payload.member_id,
            rating: payload.rating,
            content: payload.content,
            source: payload.source,
        })
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(review)).into_response())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplyReviewRequest {
    #[validate(length(min = 1))]
    admin_reply: String,
}

pub(crate) async fn reply_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    Json(payload): Json<ReplyReviewRequest>,
) -> Result<Json<Review>, ApiError> {
    validation::validate(&payload)?;
    let review = state
        .reviews
        .reply(&review_id, &payload.admin_reply)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(review))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CostsParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct CostsResponse {
    costs: Vec<Cost>,
    total: i64,
}

pub(crate) async fn list_costs(
    State(state): State<AppState>,
    Query(params): Query<CostsParams>,
) -> Result<Json<CostsResponse>, ApiError> {
    let query = CostRangeQuery::from_dates(
        params.start_date.as_deref(),
        params.end_date.as_deref(),
    )
    .map_err(map_domain_error)?;
    let (costs, total) = state.costs.list(query).await.map_err(map_domain_error)?;
    Ok(Json(CostsResponse { costs, total }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCostRequest {
    category: CostCategory,
    amount: i64,
    description: Option<String>,
    #[validate(length(min = 1))]
    date: String,
    #[serde(default)]
    is_recurring: bool,
}

pub(crate) async fn create_cost(
    State(state): State<AppState>,
    Json(payload): Json<CreateCostRequest>,
) -> Result<Json<Cost>, ApiError> {
    validation::validate(&payload)?;
    let cost = state
        .costs
        .create(CostCreate {
            category: payload.category,
            amount: payload.amount,
            description: payload.description,
            date: payload.date,
            is_recurring: payload.is_recurring,
        })
        .await
        .map_err(map_domain_error)?;
    Ok(Json(cost))
}
