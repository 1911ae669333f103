use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use helpdesk_shared::constants::DEFAULT_AUDIT_LIMIT;
use helpdesk_shared::TicketStatus;
use helpdesk_store::{AuditEntry, Conversation, Lookup, Staff, Ticket, User};

use crate::config::ServerConfig;
use crate::desk::{ConversationView, Desk, Intake, MessageView, NewStaff, NewTicketRequest, Opened};
use crate::error::DeskError;
use crate::identity::Caller;

#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<Mutex<Desk>>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Lookups
        .route("/categories", get(list_categories).post(create_category))
        .route("/priorities", get(list_priorities))
        .route("/statuses", get(list_statuses))
        // Directory
        .route("/users", post(create_user))
        .route("/staff", get(list_staff).post(create_staff))
        .route("/staff/{id}/active", patch(set_staff_active))
        .route("/audit", get(audit_log))
        // Tickets
        .route("/tickets", get(list_tickets).post(submit_ticket))
        .route("/tickets/pool", get(ticket_pool))
        .route("/tickets/{id}", get(get_ticket).patch(update_priority))
        .route("/tickets/{id}/claim", patch(claim_ticket))
        .route("/tickets/{id}/resolve", patch(resolve_ticket))
        .route("/tickets/{id}/cancel", patch(cancel_ticket))
        .route("/tickets/{id}/staff", patch(reassign_ticket))
        .route("/tickets/{id}/note", patch(update_note))
        .route("/tickets/{id}/auto-assign", post(requeue_ticket))
        // Conversations
        .route(
            "/conversations/ticket/{ticket_id}",
            get(ticket_conversation).post(open_conversation),
        )
        .route("/conversations/{id}", get(read_conversation).patch(close_conversation))
        .route("/conversations/{id}/message", post(send_message))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct ListTicketsQuery {
    status: Option<TicketStatus>,
}

#[derive(Deserialize)]
struct PoolQuery {
    category_id: Option<i64>,
}

#[derive(Deserialize)]
struct AuditQuery {
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct PriorityRequest {
    priority_id: i64,
}

#[derive(Deserialize)]
struct ReassignRequest {
    id: i64,
}

#[derive(Deserialize)]
struct NoteRequest {
    #[serde(default)]
    note: Option<String>,
}

#[derive(Deserialize)]
struct MessageRequest {
    content: String,
}

#[derive(Deserialize)]
struct NewUserRequest {
    email: String,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ActiveRequest {
    active: bool,
}

#[derive(Deserialize)]
struct NewCategoryRequest {
    name: String,
    description: Option<String>,
}

type ApiResult<T> = Result<Json<T>, DeskError>;

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Lookups ───

async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Lookup>> {
    let desk = state.desk.lock().await;
    desk.categories().map(Json)
}

async fn list_priorities(State(state): State<AppState>) -> ApiResult<Vec<Lookup>> {
    let desk = state.desk.lock().await;
    desk.priorities().map(Json)
}

async fn list_statuses(State(state): State<AppState>) -> ApiResult<Vec<Lookup>> {
    let desk = state.desk.lock().await;
    desk.statuses().map(Json)
}

async fn create_category(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<NewCategoryRequest>,
) -> Result<(StatusCode, Json<Lookup>), DeskError> {
    let category = state
        .desk
        .lock()
        .await
        .create_category(&actor, &req.name, req.description.as_deref())?;
    Ok((StatusCode::CREATED, Json(category)))
}

// ─── Directory ───

async fn create_user(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<User>), DeskError> {
    let user = state
        .desk
        .lock()
        .await
        .create_user(&actor, &req.email, req.display_name.as_deref())?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_staff(State(state): State<AppState>, Caller(actor): Caller) -> ApiResult<Vec<Staff>> {
    let desk = state.desk.lock().await;
    desk.list_staff(&actor).map(Json)
}

async fn create_staff(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<NewStaff>,
) -> Result<(StatusCode, Json<Staff>), DeskError> {
    let staff = state.desk.lock().await.create_staff(&actor, req)?;
    info!(staff_id = staff.id, "Staff created via API");
    Ok((StatusCode::CREATED, Json(staff)))
}

async fn set_staff_active(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
    Json(req): Json<ActiveRequest>,
) -> ApiResult<Staff> {
    let desk = state.desk.lock().await;
    desk.set_staff_active(&actor, id, req.active).map(Json)
}

async fn audit_log(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, 1000);
    let desk = state.desk.lock().await;
    desk.audit_log(&actor, limit).map(Json)
}

// ─── Tickets ───

async fn submit_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(req): Json<NewTicketRequest>,
) -> Result<(StatusCode, Json<Intake>), DeskError> {
    let intake = state.desk.lock().await.submit_ticket(&actor, req)?;
    Ok((StatusCode::CREATED, Json(intake)))
}

async fn list_tickets(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Query(query): Query<ListTicketsQuery>,
) -> ApiResult<Vec<Ticket>> {
    let desk = state.desk.lock().await;
    desk.list_tickets(&actor, query.status).map(Json)
}

async fn ticket_pool(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Query(query): Query<PoolQuery>,
) -> ApiResult<Vec<Ticket>> {
    let desk = state.desk.lock().await;
    desk.pool(&actor, query.category_id).map(Json)
}

async fn get_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
) -> ApiResult<Ticket> {
    let desk = state.desk.lock().await;
    desk.get_ticket(&actor, id).map(Json)
}

async fn update_priority(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
    Json(req): Json<PriorityRequest>,
) -> ApiResult<Ticket> {
    let desk = state.desk.lock().await;
    desk.update_priority(&actor, id, req.priority_id).map(Json)
}

async fn claim_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
) -> ApiResult<Ticket> {
    let desk = state.desk.lock().await;
    desk.claim(&actor, id).map(Json)
}

async fn resolve_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
) -> ApiResult<Ticket> {
    let desk = state.desk.lock().await;
    desk.resolve(&actor, id).map(Json)
}

async fn cancel_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
) -> ApiResult<Ticket> {
    let desk = state.desk.lock().await;
    desk.cancel(&actor, id).map(Json)
}

async fn reassign_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
    Json(req): Json<ReassignRequest>,
) -> ApiResult<Ticket> {
    let desk = state.desk.lock().await;
    desk.reassign(&actor, id, req.id).map(Json)
}

async fn update_note(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<Ticket> {
    let desk = state.desk.lock().await;
    desk.update_note(&actor, id, req.note).map(Json)
}

async fn requeue_ticket(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
) -> ApiResult<Intake> {
    let desk = state.desk.lock().await;
    desk.requeue(&actor, id).map(Json)
}

// ─── Conversations ───

async fn open_conversation(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(ticket_id): Path<i64>,
) -> Result<(StatusCode, Json<Opened>), DeskError> {
    let opened = state.desk.lock().await.open_conversation(&actor, ticket_id)?;
    let status = if opened.reopened {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(opened)))
}

async fn ticket_conversation(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(ticket_id): Path<i64>,
) -> ApiResult<ConversationView> {
    let desk = state.desk.lock().await;
    desk.conversation_for_ticket(&actor, ticket_id).map(Json)
}

async fn read_conversation(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
) -> ApiResult<ConversationView> {
    let desk = state.desk.lock().await;
    desk.read_conversation(&actor, id).map(Json)
}

async fn close_conversation(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
) -> ApiResult<Conversation> {
    let desk = state.desk.lock().await;
    desk.close_conversation(&actor, id).map(Json)
}

async fn send_message(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<i64>,
    Json(req): Json<MessageRequest>,
) -> Result<(StatusCode, Json<MessageView>), DeskError> {
    let message = state
        .desk
        .lock()
        .await
        .send_message(&actor, id, &req.content)?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
