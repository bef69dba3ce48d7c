mod resources;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::{
    Json, Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use validator::Validate;

use backoffice_domain::admin::AdminSummary;
use backoffice_domain::chat::{AppendMessage, HISTORY_LIMIT, RoomSummary, SenderType};
use backoffice_domain::error::DomainError;
use backoffice_infra::auth::AuthError;

use crate::error::ApiError;
use crate::middleware as app_middleware;
use crate::observability;
use crate::realtime::{ClientEvent, ConnectionId, ServerEvent};
use crate::state::AppState;
use crate::validation;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/dashboard/stats", get(resources::dashboard_stats))
        .route(
            "/api/dashboard/daily-signups",
            get(resources::daily_signups),
        )
        .route(
            "/api/dashboard/daily-revenue",
            get(resources::daily_revenue),
        )
        .route(
            "/api/dashboard/package-sales",
            get(resources::package_sales),
        )
        .route(
            "/api/dashboard/revenue-source",
            get(resources::revenue_sources),
        )
        .route("/api/members", get(resources::list_members))
        .route(
            "/api/members/:member_id",
            get(resources::get_member).put(resources::update_member),
        )
        .route("/api/revenue", get(resources::list_revenue))
        .route(
            "/api/revenue/kmong-upload",
            post(resources::upload_kmong_revenue),
        )
        .route("/api/pricing", get(resources::list_packages))
        .route("/api/pricing/:package_id", put(resources::update_package))
        .route(
            "/api/reviews",
            get(resources::list_reviews).post(resources::create_review),
        )
        .route("/api/reviews/:review_id/reply", put(resources::reply_review))
        .route(
            "/api/costs",
            get(resources::list_costs).post(resources::create_cost),
        )
        .route("/api/chat/rooms", get(chat_rooms))
        .route_layer(middleware::from_fn(app_middleware::require_auth_middleware));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/auth/login", post(login))
        .route("/api/auth/init", post(init_admin))
        .route("/api/chat/ws", get(chat_ws))
        .merge(protected)
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(app_middleware::metrics_layer));

    if !state.config.app_env.eq_ignore_ascii_case("test") {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
    })
}

async fn metrics() -> Response {
    match observability::render_metrics() {
        Some(body) => body.into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed")
            .into_response(),
    }
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    admin: AdminSummary,
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    validation::validate(&payload)?;
    let outcome = state
        .auth
        .login(&payload.email, &payload.password)
        .await
        .map_err(map_auth_error)?;
    Ok(Json(LoginResponse {
        token: outcome.token,
        admin: outcome.admin,
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct InitAdminRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    #[validate(length(min = 1, max = 100))]
    name: String,
}

/// Bootstrap route: creates the first admin account, refused once any
/// account exists.
async fn init_admin(
    State(state): State<AppState>,
    Json(payload): Json<InitAdminRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let admin = state
        .auth
        .bootstrap(&payload.email, &payload.password, &payload.name)
        .await
        .map_err(map_auth_error)?;
    Ok((StatusCode::CREATED, Json(AdminSummary::from(&admin))).into_response())
}

#[derive(Serialize)]
struct ChatRoomsResponse {
    rooms: Vec<RoomSummary>,
}

async fn chat_rooms(State(state): State<AppState>) -> Result<Json<ChatRoomsResponse>, ApiError> {
    let rooms = state.chat.room_directory().await.map_err(map_domain_error)?;
    Ok(Json(ChatRoomsResponse { rooms }))
}

/// The realtime channel is open to customers as well as staff, so it sits
/// outside the bearer-token gate.
async fn chat_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state))
}

async fn handle_chat_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut incoming) = socket.split();
    let (connection_id, mut outbound) = state.realtime.register().await;

    let mut pump = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let Ok(payload) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = incoming.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(event) = serde_json::from_str::<ClientEvent>(&text) else {
                            tracing::debug!(%connection_id, "ignoring malformed chat frame");
                            continue;
                        };
                        if let Err(err) = dispatch_client_event(&state, connection_id, event).await {
                            tracing::warn!(%connection_id, error = %err, "chat event failed");
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = &mut pump => break,
        }
    }

    state.realtime.disconnect(connection_id).await;
    observability::register_chat_event("disconnect");
    pump.abort();
}

/// One client frame, validated and applied. A failed store append surfaces
/// here as an error: nothing is broadcast and the sender gets no echo; the
/// client is expected to re-send on timeout.
pub(crate) async fn dispatch_client_event(
    state: &AppState,
    connection_id: ConnectionId,
    event: ClientEvent,
) -> Result<(), DomainError> {
    match event {
        ClientEvent::JoinRoom { room_id } => {
            observability::register_chat_event("join_room");
            state.realtime.join(connection_id, &room_id).await;
            let messages = state.chat.list_messages(&room_id, HISTORY_LIMIT).await?;
            state
                .realtime
                .send_to(connection_id, ServerEvent::PreviousMessages { messages })
                .await;
        }
        ClientEvent::SendMessage {
            room_id,
            sender_type,
            sender_name,
            message,
        } => {
            observability::register_chat_event("send_message");
            let stored = state
                .chat
                .append_message(AppendMessage {
                    room_id: room_id.clone(),
                    sender_type,
                    sender_name,
                    message,
                })
                .await?;
            let delivered = state
                .realtime
                .broadcast(&room_id, ServerEvent::NewMessage { message: stored })
                .await;
            tracing::debug!(room_id = %room_id, delivered, "chat message broadcast");
        }
        ClientEvent::MarkRead { room_id } => {
            observability::register_chat_event("mark_read");
            state.chat.mark_read(&room_id, SenderType::User).await?;
            state
                .realtime
                .broadcast(
                    &room_id,
                    ServerEvent::MessagesRead {
                        room_id: room_id.clone(),
                    },
                )
                .await;
        }
    }
    Ok(())
}

pub(crate) fn map_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation(message) => ApiError::Validation(message),
        DomainError::NotFound => ApiError::NotFound,
        DomainError::Conflict => ApiError::Conflict,
        DomainError::Storage(message) => {
            tracing::error!(error = %message, "storage failure");
            ApiError::Internal
        }
    }
}

fn map_auth_error(err: AuthError) -> ApiError {
    match err {
        AuthError::InvalidCredential => ApiError::Auth("invalid email or password".into()),
        AuthError::Inactive => ApiError::Forbidden("account is deactivated".into()),
        AuthError::AlreadyInitialized => {
            ApiError::Validation("an admin account already exists".into())
        }
        AuthError::Credential => ApiError::Internal,
        AuthError::Storage(message) => {
            tracing::error!(error = %message, "auth storage failure");
            ApiError::Internal
        }
    }
}
