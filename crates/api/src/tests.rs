use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

use backoffice_domain::chat::{SenderType, StoredMessage};
use backoffice_domain::member::{Member, MemberGrade};
use backoffice_domain::package::Package;
use backoffice_domain::payment::{Payment, PaymentSource, PaymentStatus};
use backoffice_domain::ports::chat::ChatRepository;
use backoffice_domain::ports::member::MemberRepository;
use backoffice_domain::ports::package::PackageRepository;
use backoffice_domain::ports::payment::PaymentRepository;
use backoffice_domain::ports::review::ReviewRepository;
use backoffice_domain::review::{Review, ReviewSource};
use backoffice_domain::util::{format_ms_date, now_ms, uuid_v7_without_dashes};
use backoffice_infra::auth::Claims;
use backoffice_infra::config::AppConfig;

use crate::realtime::{ClientEvent, ServerEvent};
use crate::routes;
use crate::state::{AppState, MemoryBackend};

fn test_config() -> AppConfig {
    AppConfig {
        app_env: "test".to_string(),
        port: 0,
        log_level: "info".to_string(),
        data_backend: "memory".to_string(),
        surreal_endpoint: "ws://127.0.0.1:8000".to_string(),
        surreal_ns: "backoffice".to_string(),
        surreal_db: "test".to_string(),
        surreal_user: "root".to_string(),
        surreal_pass: "root".to_string(),
        jwt_secret: "test-secret".to_string(),
        token_ttl_days: 7,
    }
}

fn test_env() -> (AppState, MemoryBackend, axum::Router) {
    let backend = MemoryBackend::default();
    let state = AppState::with_memory_backend(test_config(), &backend);
    let app = routes::router(state.clone());
    (state, backend, app)
}

fn test_token() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_secs();
    let claims = Claims {
        sub: "admin-1".to_string(),
        email: "staff@example.com".to_string(),
        name: "Staff".to_string(),
        role: "ADMIN".to_string(),
        exp: (now + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret("test-secret".as_bytes()),
    )
    .expect("token")
}

fn get_request(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("request")
}

fn authed_get(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

fn authed_json(method: &str, path: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn json_request(method: &str, path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn member_fixture(name: &str, email: &str, grade: MemberGrade, created_at_ms: i64) -> Member {
    Member {
        id: uuid_v7_without_dashes(),
        name: name.to_string(),
        email: email.to_string(),
        phone: Some("010-1234-5678".to_string()),
        grade,
        messenger_id: None,
        memo: None,
        is_active: true,
        created_at_ms,
        updated_at_ms: created_at_ms,
    }
}

fn payment_fixture(
    member_id: &str,
    source: PaymentSource,
    status: PaymentStatus,
    amount: i64,
    paid_at_ms: i64,
) -> Payment {
    Payment {
        id: uuid_v7_without_dashes(),
        member_id: member_id.to_string(),
        package_name: "STANDARD".to_string(),
        amount,
        source,
        status,
        order_id: None,
        payment_key: None,
        paid_at_ms: Some(paid_at_ms),
        refunded_at_ms: None,
        created_at_ms: paid_at_ms,
    }
}

fn review_fixture(member_id: Option<&str>, rating: i32, created_at_ms: i64) -> Review {
    Review {
        id: uuid_v7_without_dashes(),
        member_id: member_id.map(str::to_string),
        rating,
        content: "great work".to_string(),
        source: ReviewSource::Website,
        admin_reply: None,
        replied_at_ms: None,
        is_visible: true,
        created_at_ms,
    }
}

fn package_fixture(name: &str, price: i64, display_order: i32) -> Package {
    Package {
        id: uuid_v7_without_dashes(),
        name: name.to_string(),
        price,
        features: vec!["logo design".to_string()],
        work_days: 5,
        revisions: 2,
        is_active: true,
        display_order,
        badge: None,
        created_at_ms: 1_000,
        updated_at_ms: 1_000,
    }
}

fn chat_fixture(
    room_id: &str,
    sender_type: SenderType,
    body: &str,
    created_at_ms: i64,
    is_read: bool,
) -> StoredMessage {
    StoredMessage {
        id: uuid_v7_without_dashes(),
        room_id: room_id.to_string(),
        sender_type,
        sender_name: match sender_type {
            SenderType::User => "Jamie".to_string(),
            SenderType::Admin => "Staff".to_string(),
        },
        message: body.to_string(),
        is_read,
        read_at_ms: is_read.then_some(created_at_ms),
        created_at_ms,
        updated_at_ms: created_at_ms,
    }
}

#[tokio::test]
async fn health_is_public() {
    let (_, _, app) = test_env();
    let response = app.oneshot(get_request("/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
}

#[tokio::test]
async fn protected_routes_reject_missing_and_bad_tokens() {
    let (_, _, app) = test_env();
    let response = app
        .clone()
        .oneshot(get_request("/api/members"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");

    let response = app
        .oneshot(authed_get("/api/chat/rooms", "not-a-jwt"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_succeeds_then_rejects_bad_password_and_inactive_account() {
    let (state, backend, app) = test_env();
    state
        .auth
        .bootstrap("owner@example.com", "hunter4242", "Owner")
        .await
        .expect("bootstrap");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({"email": "owner@example.com", "password": "hunter4242"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
    assert_eq!(body["admin"]["email"], "owner@example.com");
    assert_eq!(body["admin"]["role"], "SUPER_ADMIN");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({"email": "owner@example.com", "password": "wrong"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid email or password");

    backend.admins.set_active("owner@example.com", false).await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            &json!({"email": "owner@example.com", "password": "hunter4242"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "account is deactivated");
}

#[tokio::test]
async fn auth_init_creates_first_admin_only() {
    let (_, _, app) = test_env();
    let payload = json!({
        "email": "owner@example.com",
        "password": "hunter4242",
        "name": "Owner"
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/init", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(json_request("POST", "/api/auth/init", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cost_create_then_range_query_returns_it_with_total() {
    let (_, _, app) = test_env();
    let token = test_token();

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/costs",
            &token,
            &json!({
                "category": "SERVER",
                "amount": 50_000,
                "description": "hosting",
                "date": "2025-04-10",
                "isRecurring": true
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["category"], "SERVER");

    // A second cost outside the queried range stays out of the total.
    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/costs",
            &token,
            &json!({
                "category": "MARKETING",
                "amount": 20_000,
                "date": "2025-05-02"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed_get(
            "/api/costs?startDate=2025-04-01&endDate=2025-04-30",
            &token,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["costs"].as_array().expect("costs").len(), 1);
    assert_eq!(body["costs"][0]["amount"], 50_000);
    assert_eq!(body["total"], 50_000);
}

#[tokio::test]
async fn cost_rejects_unknown_category_and_negative_amount() {
    let (_, _, app) = test_env();
    let token = test_token();

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/costs",
            &token,
            &json!({"category": "FOOD", "amount": 100, "date": "2025-04-10"}),
        ))
        .await
        .expect("response");
    assert!(response.status().is_client_error());

    let response = app
        .oneshot(authed_json(
            "POST",
            "/api/costs",
            &token,
            &json!({"category": "ETC", "amount": -5, "date": "2025-04-10"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn member_list_supports_search_grade_and_pagination() {
    let (_, backend, app) = test_env();
    let token = test_token();
    backend
        .members
        .create(&member_fixture(
            "Jamie Park",
            "jamie@example.com",
            MemberGrade::Premium,
            1_000,
        ))
        .await
        .expect("seed");
    backend
        .members
        .create(&member_fixture(
            "Robin Lee",
            "robin@example.com",
            MemberGrade::Standard,
            2_000,
        ))
        .await
        .expect("seed");
    backend
        .members
        .create(&member_fixture(
            "Morgan Choi",
            "morgan@example.com",
            MemberGrade::Premium,
            3_000,
        ))
        .await
        .expect("seed");

    let response = app
        .clone()
        .oneshot(authed_get("/api/members?search=JAMIE", &token))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["members"][0]["email"], "jamie@example.com");

    let response = app
        .clone()
        .oneshot(authed_get("/api/members?grade=PREMIUM", &token))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 2);

    let response = app
        .clone()
        .oneshot(authed_get("/api/members?page=2&limit=2", &token))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["pages"], 2);
    assert_eq!(body["members"].as_array().expect("members").len(), 1);
    assert_eq!(body["members"][0]["name"], "Jamie Park");

    let response = app
        .oneshot(authed_get("/api/members?grade=GOLD", &token))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn member_detail_includes_payment_history() {
    let (_, backend, app) = test_env();
    let token = test_token();
    let member = member_fixture("Jamie Park", "jamie@example.com", MemberGrade::Deluxe, 1_000);
    backend.members.create(&member).await.expect("seed");
    backend
        .payments
        .insert_many(&[payment_fixture(
            &member.id,
            PaymentSource::Toss,
            PaymentStatus::Completed,
            90_000,
            5_000,
        )])
        .await
        .expect("seed");

    let response = app
        .clone()
        .oneshot(authed_get(&format!("/api/members/{}", member.id), &token))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "jamie@example.com");
    assert_eq!(body["payments"].as_array().expect("payments").len(), 1);
    assert_eq!(body["payments"][0]["amount"], 90_000);

    let response = app
        .oneshot(authed_get("/api/members/missing", &token))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn member_update_applies_changes() {
    let (_, backend, app) = test_env();
    let token = test_token();
    let member = member_fixture("Jamie Park", "jamie@example.com", MemberGrade::Standard, 1_000);
    backend.members.create(&member).await.expect("seed");

    let response = app
        .oneshot(authed_json(
            "PUT",
            &format!("/api/members/{}", member.id),
            &token,
            &json!({
                "name": "Jamie Park",
                "email": "jamie.park@example.com",
                "phone": "010-9999-0000",
                "grade": "DELUXE",
                "memo": "renewed twice"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "jamie.park@example.com");
    assert_eq!(body["grade"], "DELUXE");
    assert_eq!(body["memo"], "renewed twice");
}

#[tokio::test]
async fn revenue_lists_completed_payments_with_summary() {
    let (_, backend, app) = test_env();
    let token = test_token();
    let day = backoffice_domain::util::parse_date_ms("2025-03-10").expect("date");
    backend
        .payments
        .insert_many(&[
            payment_fixture("m-1", PaymentSource::Toss, PaymentStatus::Completed, 70_000, day),
            payment_fixture(
                "m-2",
                PaymentSource::Kmong,
                PaymentStatus::Completed,
                30_000,
                day + 3_600_000,
            ),
            payment_fixture("m-3", PaymentSource::Toss, PaymentStatus::Pending, 99_000, day),
        ])
        .await
        .expect("seed");

    let response = app
        .clone()
        .oneshot(authed_get(
            "/api/revenue?startDate=2025-03-01&endDate=2025-03-31",
            &token,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["payments"].as_array().expect("payments").len(), 2);
    assert_eq!(body["summary"]["total"], 100_000);
    assert_eq!(body["summary"]["tossTotal"], 70_000);
    assert_eq!(body["summary"]["kmongTotal"], 30_000);
    assert_eq!(body["summary"]["count"], 2);

    let response = app
        .oneshot(authed_get("/api/revenue?source=TOSS", &token))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body["payments"].as_array().expect("payments").len(), 1);
    assert_eq!(body["summary"]["kmongTotal"], 0);
}

#[tokio::test]
async fn kmong_upload_imports_settlement_rows() {
    let (_, _, app) = test_env();
    let token = test_token();

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/revenue/kmong-upload",
            &token,
            &json!({
                "data": [
                    {"memberId": "m-1", "packageName": "STANDARD", "amount": 30_000, "paidAt": "2025-03-05"},
                    {"memberId": "m-2", "packageName": "PREMIUM", "amount": 150_000, "paidAt": "2025-03-06"}
                ]
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);

    let response = app
        .oneshot(authed_get("/api/revenue", &token))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body["summary"]["kmongTotal"], 180_000);
}

#[tokio::test]
async fn pricing_lists_in_display_order_and_updates() {
    let (_, backend, app) = test_env();
    let token = test_token();
    backend
        .packages
        .create(&package_fixture("PREMIUM", 200_000, 3))
        .await
        .expect("seed");
    let standard = package_fixture("STANDARD", 50_000, 1);
    backend.packages.create(&standard).await.expect("seed");

    let response = app
        .clone()
        .oneshot(authed_get("/api/pricing", &token))
        .await
        .expect("response");
    let body = body_json(response).await;
    let packages = body.as_array().expect("packages");
    assert_eq!(packages[0]["name"], "STANDARD");
    assert_eq!(packages[1]["name"], "PREMIUM");

    let response = app
        .clone()
        .oneshot(authed_json(
            "PUT",
            &format!("/api/pricing/{}", standard.id),
            &token,
            &json!({
                "name": "STANDARD",
                "price": 60_000,
                "features": ["logo design", "business card"],
                "workDays": 4,
                "revisions": 3,
                "badge": "popular"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["price"], 60_000);
    assert_eq!(body["badge"], "popular");

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/api/pricing/missing",
            &token,
            &json!({
                "name": "STANDARD",
                "price": 60_000,
                "features": [],
                "workDays": 4,
                "revisions": 3
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn review_create_list_and_reply_round_trip() {
    let (_, backend, app) = test_env();
    let token = test_token();
    let member = member_fixture("Jamie Park", "jamie@example.com", MemberGrade::Standard, 1_000);
    backend.members.create(&member).await.expect("seed");

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/reviews",
            &token,
            &json!({
                "memberId": member.id,
                "rating": 5,
                "content": "fast and precise",
                "source": "KMONG"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let review_id = created["id"].as_str().expect("id").to_string();

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/reviews",
            &token,
            &json!({"rating": 9, "content": "way too enthusiastic", "source": "WEBSITE"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(authed_get("/api/reviews", &token))
        .await
        .expect("response");
    let body = body_json(response).await;
    let reviews = body.as_array().expect("reviews");
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["memberName"], "Jamie Park");

    let response = app
        .clone()
        .oneshot(authed_json(
            "PUT",
            &format!("/api/reviews/{review_id}/reply"),
            &token,
            &json!({"adminReply": "thank you!"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["adminReply"], "thank you!");
    assert!(body["repliedAt"].as_i64().is_some());

    let response = app
        .oneshot(authed_json(
            "PUT",
            "/api/reviews/missing/reply",
            &token,
            &json!({"adminReply": "hello?"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_stats_combines_all_sources() {
    let (_, backend, app) = test_env();
    let token = test_token();
    let now = now_ms();

    backend
        .members
        .create(&member_fixture("Jamie Park", "jamie@example.com", MemberGrade::Standard, now))
        .await
        .expect("seed");
    let mut inactive = member_fixture("Gone Kim", "gone@example.com", MemberGrade::Standard, now);
    inactive.is_active = false;
    backend.members.create(&inactive).await.expect("seed");

    backend
        .payments
        .insert_many(&[payment_fixture(
            "m-1",
            PaymentSource::Toss,
            PaymentStatus::Completed,
            120_000,
            now,
        )])
        .await
        .expect("seed");

    backend
        .reviews
        .create(&review_fixture(None, 4, now))
        .await
        .expect("seed");
    backend
        .reviews
        .create(&review_fixture(None, 5, now))
        .await
        .expect("seed");

    backend
        .chat
        .append(&chat_fixture("42", SenderType::User, "anyone there?", now, false))
        .await
        .expect("seed");

    let response = app
        .oneshot(authed_get("/api/dashboard/stats", &token))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalMembers"], 1);
    assert_eq!(body["monthlyRevenue"], 120_000);
    assert_eq!(body["avgRating"], "4.5");
    assert_eq!(body["unansweredChats"], 1);
    let visitors = body["todayVisitors"].as_u64().expect("visitors");
    assert!((50..150).contains(&visitors));
}

#[tokio::test]
async fn dashboard_daily_revenue_groups_by_day() {
    let (_, backend, app) = test_env();
    let token = test_token();
    let now = now_ms();
    backend
        .payments
        .insert_many(&[
            payment_fixture("m-1", PaymentSource::Toss, PaymentStatus::Completed, 10_000, now),
            payment_fixture("m-2", PaymentSource::Toss, PaymentStatus::Completed, 15_000, now),
        ])
        .await
        .expect("seed");

    let response = app
        .oneshot(authed_get("/api/dashboard/daily-revenue", &token))
        .await
        .expect("response");
    let body = body_json(response).await;
    let days = body.as_array().expect("days");
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["date"], format_ms_date(now));
    assert_eq!(days[0]["total"], 25_000);
    assert_eq!(days[0]["count"], 2);
}

#[tokio::test]
async fn chat_rooms_directory_reports_unread_and_last_message() {
    let (_, backend, app) = test_env();
    let token = test_token();

    backend
        .chat
        .append(&chat_fixture("42", SenderType::User, "hi", 1_000, true))
        .await
        .expect("seed");
    backend
        .chat
        .append(&chat_fixture("42", SenderType::Admin, "hello", 2_000, false))
        .await
        .expect("seed");
    backend
        .chat
        .append(&chat_fixture("42", SenderType::User, "still there?", 3_000, false))
        .await
        .expect("seed");
    backend
        .chat
        .append(&chat_fixture("7", SenderType::Admin, "resolved", 4_000, false))
        .await
        .expect("seed");

    let response = app
        .clone()
        .oneshot(authed_get("/api/chat/rooms", &token))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let rooms = body["rooms"].as_array().expect("rooms");
    assert_eq!(rooms.len(), 2);
    // Newest activity first; room 7's admin-authored tail uses the
    // placeholder label.
    assert_eq!(rooms[0]["id"], "7");
    assert_eq!(rooms[0]["userName"], "Room 7");
    assert_eq!(rooms[0]["unreadCount"], 0);
    assert_eq!(rooms[1]["id"], "42");
    assert_eq!(rooms[1]["userName"], "Jamie");
    assert_eq!(rooms[1]["lastMessage"], "still there?");
    assert_eq!(rooms[1]["unreadCount"], 1);

    let response = app
        .oneshot(get_request("/api/chat/rooms"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn realtime_send_reaches_room_subscribers_and_persists() {
    let (state, backend, _) = test_env();

    let (alpha, mut alpha_rx) = state.realtime.register().await;
    let (beta, mut beta_rx) = state.realtime.register().await;
    let (outsider, mut outsider_rx) = state.realtime.register().await;

    crate::routes::dispatch_client_event(
        &state,
        alpha,
        ClientEvent::JoinRoom {
            room_id: "42".to_string(),
        },
    )
    .await
    .expect("join");
    crate::routes::dispatch_client_event(
        &state,
        beta,
        ClientEvent::JoinRoom {
            room_id: "42".to_string(),
        },
    )
    .await
    .expect("join");
    crate::routes::dispatch_client_event(
        &state,
        outsider,
        ClientEvent::JoinRoom {
            room_id: "7".to_string(),
        },
    )
    .await
    .expect("join");

    // Joining pushes history to that connection only.
    assert!(matches!(
        alpha_rx.try_recv().expect("history"),
        ServerEvent::PreviousMessages { messages } if messages.is_empty()
    ));
    beta_rx.try_recv().expect("history");
    outsider_rx.try_recv().expect("history");

    crate::routes::dispatch_client_event(
        &state,
        alpha,
        ClientEvent::SendMessage {
            room_id: "42".to_string(),
            sender_type: SenderType::User,
            sender_name: "Jamie".to_string(),
            message: "hello?".to_string(),
        },
    )
    .await
    .expect("send");

    // Both room members get the broadcast, the sender included.
    for rx in [&mut alpha_rx, &mut beta_rx] {
        let event = rx.try_recv().expect("broadcast");
        assert!(matches!(
            event,
            ServerEvent::NewMessage { message } if message.message == "hello?"
        ));
    }
    assert!(outsider_rx.try_recv().is_err());

    // The message is persisted and counted as unread.
    let stored = backend.chat.list_by_room("42", 100).await.expect("list");
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].is_read);

    crate::routes::dispatch_client_event(
        &state,
        beta,
        ClientEvent::MarkRead {
            room_id: "42".to_string(),
        },
    )
    .await
    .expect("mark read");

    for rx in [&mut alpha_rx, &mut beta_rx] {
        let event = rx.try_recv().expect("read receipt");
        assert!(matches!(
            event,
            ServerEvent::MessagesRead { room_id } if room_id == "42"
        ));
    }
    let counts = backend
        .chat
        .unread_counts(SenderType::User)
        .await
        .expect("counts");
    assert!(counts.is_empty());

    // Disconnecting releases the subscription; later broadcasts skip it.
    state.realtime.disconnect(alpha).await;
    crate::routes::dispatch_client_event(
        &state,
        beta,
        ClientEvent::SendMessage {
            room_id: "42".to_string(),
            sender_type: SenderType::Admin,
            sender_name: "Staff".to_string(),
            message: "hello!".to_string(),
        },
    )
    .await
    .expect("send");
    assert!(alpha_rx.try_recv().is_err());
    assert!(beta_rx.try_recv().is_ok());
}

#[tokio::test]
async fn join_pushes_bounded_history_in_order() {
    let (state, backend, _) = test_env();
    for index in 0..3 {
        backend
            .chat
            .append(&chat_fixture(
                "42",
                SenderType::User,
                &format!("msg-{index}"),
                1_000 + index,
                true,
            ))
            .await
            .expect("seed");
    }

    let (conn, mut rx) = state.realtime.register().await;
    crate::routes::dispatch_client_event(
        &state,
        conn,
        ClientEvent::JoinRoom {
            room_id: "42".to_string(),
        },
    )
    .await
    .expect("join");

    let ServerEvent::PreviousMessages { messages } = rx.try_recv().expect("history") else {
        panic!("expected history push");
    };
    let bodies: Vec<_> = messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["msg-0", "msg-1", "msg-2"]);
}
