// src/main.rs
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod employee_rollup;
mod session;
mod shift_store;
mod timesheet;

use employee_rollup::{build_rollups, filter_rollups, EmployeeRollup, EmployeeShiftView};
use session::{AuthError, SessionService};
use shift_store::{PublicUser, Role, ShiftStore, StoreError};
use timesheet::{summarize, NewShift, ShiftPatch, ShiftRecord, TimesheetSummary};

// --- Configuration ---

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3001
}

fn default_session_ttl_hours() -> i64 {
    12
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::from_env::<Config>()
    }
}

// --- Error Handling ---

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::Store(StoreError::Invalid(e)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            AppError::Store(e @ StoreError::ShiftNotFound { .. })
            | AppError::Store(e @ StoreError::EmployeeNotFound { .. }) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            AppError::Store(e @ StoreError::EmailTaken { .. }) => {
                (StatusCode::CONFLICT, e.to_string())
            }
            AppError::Auth(AuthError::AdminRequired) => {
                (StatusCode::FORBIDDEN, self.to_string())
            }
            AppError::Auth(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
        };
        warn!("Request failed ({}): {}", status, message);
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// --- Shared Application State ---

#[derive(Clone)]
struct AppState {
    store: ShiftStore,
    sessions: SessionService,
}

// --- Main Application Logic ---

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Loading configuration from environment failed")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting timetrack API server");

    let store = ShiftStore::new();
    let sessions = SessionService::new(store.clone(), config.session_ttl_hours);
    let state = AppState { store, sessions };

    let app = Router::new()
        // Public endpoints
        .route("/health", get(handle_health))
        .route("/api/auth/register", post(handle_register))
        .route("/api/auth/login", post(handle_login))
        // Owner endpoints
        .route("/api/users/me", get(handle_current_user))
        .route(
            "/api/timesheets",
            get(handle_list_shifts).post(handle_create_shift),
        )
        .route("/api/timesheets/summary", get(handle_summary))
        .route(
            "/api/timesheets/{id}",
            get(handle_get_shift)
                .put(handle_update_shift)
                .delete(handle_delete_shift),
        )
        // Admin endpoints
        .route("/api/admin/timesheets", get(handle_admin_timesheets))
        .route("/api/admin/rollups", get(handle_admin_rollups))
        .route("/api/admin/employees", get(handle_admin_employees))
        .route(
            "/api/admin/employees/{id}",
            get(handle_admin_employee_detail),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Binding {} failed", addr))?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}

// --- Auth Plumbing ---

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    role: Role,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: PublicUser,
}

// --- Web Handlers ---

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (token, user) = state
        .sessions
        .register(&req.name, &req.email, &req.password, req.role)?;
    Ok(Json(AuthResponse { token, user }))
}

async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (token, user) = state.sessions.login(&req.email, &req.password, req.role)?;
    Ok(Json(AuthResponse { token, user }))
}

async fn handle_current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.sessions.resolve(bearer_token(&headers)?)?;
    Ok(Json(user))
}

// --- Owner Timesheet Handlers ---

async fn handle_list_shifts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ShiftRecord>>, AppError> {
    let user = state.sessions.resolve(bearer_token(&headers)?)?;
    Ok(Json(state.store.shifts_for_owner(&user.id)))
}

// The summary is recomputed from a fresh full fetch on every call; nothing
// is cached across mutations.
async fn handle_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TimesheetSummary>, AppError> {
    let user = state.sessions.resolve(bearer_token(&headers)?)?;
    let shifts = state.store.shifts_for_owner(&user.id);
    let summary = summarize(&shifts);
    info!(
        "Summary for {}: {}h over {} days, complete={}",
        user.id,
        summary.total_hours,
        summary.total_days,
        timesheet::is_complete(&summary)
    );
    Ok(Json(summary))
}

async fn handle_get_shift(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ShiftRecord>, AppError> {
    let user = state.sessions.resolve(bearer_token(&headers)?)?;
    Ok(Json(state.store.get_shift(&user.id, &id)?))
}

async fn handle_create_shift(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<NewShift>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.sessions.resolve(bearer_token(&headers)?)?;
    let record = state.store.create_shift(&user.id, &draft)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn handle_update_shift(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<ShiftPatch>,
) -> Result<Json<ShiftRecord>, AppError> {
    let user = state.sessions.resolve(bearer_token(&headers)?)?;
    Ok(Json(state.store.update_shift(&user.id, &id, &patch)?))
}

async fn handle_delete_shift(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user = state.sessions.resolve(bearer_token(&headers)?)?;
    state.store.delete_shift(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Admin Handlers ---

/// The full shift set enriched with owner identity, in creation order.
fn enriched_views(state: &AppState) -> Vec<EmployeeShiftView> {
    state
        .store
        .all_shifts()
        .iter()
        .filter_map(|shift| match state.store.user(&shift.owner_id) {
            Some(owner) => Some(EmployeeShiftView::from_record(shift, &owner.name, &owner.email)),
            None => {
                warn!("Shift {} has no owner record, skipping", shift.id);
                None
            }
        })
        .collect()
}

async fn handle_admin_timesheets(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<EmployeeShiftView>>, AppError> {
    state.sessions.resolve_admin(bearer_token(&headers)?)?;
    Ok(Json(enriched_views(&state)))
}

#[derive(Debug, Default, Deserialize)]
struct RollupQuery {
    search: Option<String>,
}

async fn handle_admin_rollups(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RollupQuery>,
) -> Result<Json<Vec<EmployeeRollup>>, AppError> {
    state.sessions.resolve_admin(bearer_token(&headers)?)?;
    let rollups = build_rollups(&enriched_views(&state));
    let visible = match query.search.as_deref() {
        Some(term) if !term.is_empty() => filter_rollups(&rollups, term),
        _ => rollups,
    };
    Ok(Json(visible))
}

async fn handle_admin_employees(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    state.sessions.resolve_admin(bearer_token(&headers)?)?;
    Ok(Json(state.store.list_employees()))
}

#[derive(Debug, Serialize)]
struct EmployeeDetail {
    employee: PublicUser,
    summary: TimesheetSummary,
    shifts: Vec<EmployeeShiftView>,
}

// The admin detail view is the user path applied to one owner (same
// summarize primitive) plus the rollup's most-recent-first ordering.
async fn handle_admin_employee_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<EmployeeDetail>, AppError> {
    state.sessions.resolve_admin(bearer_token(&headers)?)?;
    let employee = state
        .store
        .user(&id)
        .ok_or(StoreError::EmployeeNotFound { id })?;

    let shifts = state.store.shifts_for_owner(&employee.id);
    let summary = summarize(&shifts);
    let mut views: Vec<EmployeeShiftView> = shifts
        .iter()
        .map(|s| EmployeeShiftView::from_record(s, &employee.name, &employee.email))
        .collect();
    views.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(Json(EmployeeDetail {
        employee: employee.public(),
        summary,
        shifts: views,
    }))
}
