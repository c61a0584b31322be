//! HTTP surface of the dashboard.
//!
//! Serves the single-page frontend inline, exposes the control layout and
//! label dictionary, and keeps one [`Session`] per viewer. Every handler
//! returns an HTTP error response instead of panicking.

use crate::binding::{Control, Registry, Session};
use crate::chart::ChartDescription;
use crate::context::Context;
use crate::error::Error;
use crate::labels::LabelEntry;
use crate::render::{render_png, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_SESSIONS: usize = 256;

const INDEX_HTML: &str = include_str!("../static/index.html");

// ── Session store ────────────────────────────────────────────────────────────

/// Live sessions keyed by id. Holds at most `capacity` sessions and drops
/// the least recently used one when a new one would exceed it.
#[derive(Debug)]
pub struct SessionStore {
    capacity: usize,
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    sessions: HashMap<Uuid, Arc<Mutex<Session>>>,
    order: VecDeque<Uuid>,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        SessionStore {
            capacity: capacity.max(1),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    pub async fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().await;

        while inner.order.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else { break };
            inner.sessions.remove(&oldest);
            debug!(session = %oldest, "evicted least recently used session");
        }

        inner.sessions.insert(id, Arc::new(Mutex::new(session)));
        inner.order.push_back(id);
        id
    }

    /// Look up a session and mark it as most recently used.
    pub async fn get(&self, id: &Uuid) -> Option<Arc<Mutex<Session>>> {
        let mut inner = self.inner.lock().await;
        let session = inner.sessions.get(id).cloned()?;
        if let Some(pos) = inner.order.iter().position(|x| x == id) {
            inner.order.remove(pos);
        }
        inner.order.push_back(*id);
        Some(session)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }
}

// ── Shared application state ─────────────────────────────────────────────────

#[derive(Debug)]
pub struct AppState {
    ctx: Arc<Context>,
    registry: Arc<Registry>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(ctx: Arc<Context>, registry: Arc<Registry>, max_sessions: usize) -> Self {
        AppState {
            ctx,
            registry,
            sessions: SessionStore::new(max_sessions),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    async fn session(&self, id: &str) -> Result<Arc<Mutex<Session>>, ApiError> {
        let missing = || ApiError::new(StatusCode::NOT_FOUND, format!("unknown session '{}'", id));
        let uuid = Uuid::parse_str(id).map_err(|_| missing())?;
        self.sessions.get(&uuid).await.ok_or_else(missing)
    }
}

// ── Payloads ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct DatasetSummary<'a> {
    rows: usize,
    columns: usize,
    label_field: &'a str,
    numeric: Vec<&'a str>,
    categorical: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct LayoutResponse<'a> {
    title: &'static str,
    subtitle: &'static str,
    controls: &'a [Control],
    labels: &'a [LabelEntry],
    dataset: DatasetSummary<'a>,
}

/// Charts and slot errors, keyed by slot name.
#[derive(Debug, Default, Serialize)]
pub struct SlotCharts {
    pub charts: BTreeMap<String, ChartDescription>,
    pub errors: BTreeMap<String, String>,
}

impl SlotCharts {
    fn collect<'a>(session: &Session, slots: impl IntoIterator<Item = &'a str>) -> Self {
        let mut out = SlotCharts::default();
        for name in slots {
            let Ok(slot) = session.slot(name) else { continue };
            if let Some(chart) = slot.chart() {
                out.charts.insert(name.to_string(), chart.clone());
            }
            if let Some(err) = slot.last_error() {
                out.errors.insert(name.to_string(), err.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    id: Uuid,
    values: BTreeMap<String, String>,
    #[serde(flatten)]
    slots: SlotCharts,
}

#[derive(Debug, Deserialize)]
pub struct InputChange {
    pub input: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    recomputed: Vec<String>,
    #[serde(flatten)]
    slots: SlotCharts,
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError { status, message: message.into() }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::UnknownInput(_) | Error::InvalidOption { .. } | Error::NotNumeric { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::UnknownSlot(_) | Error::UnknownField { .. } => StatusCode::NOT_FOUND,
            Error::DataLoad { .. } | Error::Binding(_) | Error::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> &'static str {
    "ok"
}

/// `GET /api/layout`: controls, label dictionary and dataset summary.
async fn layout_handler(State(state): State<Arc<AppState>>) -> Response {
    let table = state.ctx.table();
    let names = |cols: Vec<&crate::dataset::Column>| -> Vec<String> {
        cols.iter().map(|c| c.name().to_string()).collect()
    };
    let numeric = names(table.numeric_fields());
    let categorical = names(table.categorical_fields());

    let layout = LayoutResponse {
        title: "Obesity Analytics Dashboard",
        subtitle: "Exploring lifestyle and physical condition factors across obesity levels",
        controls: state.registry.controls(),
        labels: state.ctx.labels().entries(),
        dataset: DatasetSummary {
            rows: table.row_count(),
            columns: table.columns().len(),
            label_field: table.label_field(),
            numeric: numeric.iter().map(String::as_str).collect(),
            categorical: categorical.iter().map(String::as_str).collect(),
        },
    };
    Json(layout).into_response()
}

/// `POST /api/sessions`: start a session at the control defaults.
async fn create_session_handler(State(state): State<Arc<AppState>>) -> Response {
    let session = Session::new(state.ctx.clone(), state.registry.clone());
    let values = session.values().clone().into_iter().collect();
    let slots = SlotCharts::collect(&session, state.registry.slots());

    let id = state.sessions.insert(session).await;
    info!(session = %id, "session created");

    (StatusCode::CREATED, Json(SessionResponse { id, values, slots })).into_response()
}

/// `POST /api/sessions/:id/inputs`: change one control and return the
/// slots it recomputed.
async fn update_input_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(change): Json<InputChange>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;

    let recomputed = session.update(&change.input, &change.value)?;
    let slots = SlotCharts::collect(&session, recomputed.iter().map(String::as_str));
    Ok(Json(UpdateResponse { recomputed, slots }))
}

async fn current_chart(state: &AppState, id: &str, slot: &str) -> Result<ChartDescription, ApiError> {
    let session = state.session(id).await?;
    let session = session.lock().await;
    let slot_state = session.slot(slot)?;
    slot_state.chart().cloned().ok_or_else(|| {
        let reason = slot_state.last_error().unwrap_or("no chart computed");
        ApiError::new(StatusCode::NOT_FOUND, format!("slot '{}' has no chart: {}", slot, reason))
    })
}

/// `GET /api/sessions/:id/charts/:slot`
async fn chart_handler(
    State(state): State<Arc<AppState>>,
    Path((id, slot)): Path<(String, String)>,
) -> Result<Json<ChartDescription>, ApiError> {
    Ok(Json(current_chart(&state, &id, &slot).await?))
}

/// `GET /api/sessions/:id/charts/:slot/png`
async fn chart_png_handler(
    State(state): State<Arc<AppState>>,
    Path((id, slot)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let chart = current_chart(&state, &id, &slot).await?;
    let png = tokio::task::spawn_blocking(move || render_png(&chart, DEFAULT_WIDTH, DEFAULT_HEIGHT))
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], png).into_response())
}

// ── Router construction ──────────────────────────────────────────────────────

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/layout", get(layout_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/:id/inputs", post(update_input_handler))
        .route("/api/sessions/:id/charts/:slot", get(chart_handler))
        .route("/api/sessions/:id/charts/:slot/png", get(chart_png_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Server bootstrap ─────────────────────────────────────────────────────────

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Dashboard ready at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
