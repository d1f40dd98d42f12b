//! Dashboard API service using Axum.
//!
//! Routes:
//! - `GET  /`                   - service info and endpoint listing
//! - `GET  /api/health`         - liveness plus collection sizes
//! - `GET  /api/sheets`         - current sheet collection
//! - `GET  /api/tasks`          - current task collection
//! - `POST /api/update-sheets`  - replace sheets (`{"sheets": [...]}`)
//! - `POST /api/update-tasks`   - replace tasks (`{"tasks": [...]}`)
//! - `GET  /api/debug`          - full dump of both collections
//!
//! Both collections live in an [`ApiStore`] owned by the router. Updates
//! fully replace a collection with the valid subset of the posted array;
//! the body is parsed completely before the swap. Bodies are capped at
//! [`MAX_BODY_BYTES`]; anything larger is a structured 413.
//!
//! Every origin is allowed and there is no authentication on the update
//! routes.

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;

use crate::defaults;
use crate::error::{Error, Result};
use crate::model::{self, CollectionKind, Record, SheetLink, Task};

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, Accept, Origin, X-Requested-With";

/// Largest accepted update body
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Env var naming the deployment environment in health output
pub const ENV_ENVIRONMENT: &str = "DASHSYNC_ENV";

/// In-memory collections served by the API
#[derive(Debug)]
pub struct ApiStore {
    sheets: RwLock<Vec<Value>>,
    tasks: RwLock<Vec<Value>>,
    started: Instant,
    environment: String,
}

/// Outcome of a full replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub count: usize,
    pub filtered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataCounts {
    pub sheets: usize,
    pub tasks: usize,
}

impl ApiStore {
    pub fn new(sheets: Vec<Value>, tasks: Vec<Value>) -> Self {
        Self {
            sheets: RwLock::new(sheets),
            tasks: RwLock::new(tasks),
            started: Instant::now(),
            environment: std::env::var(ENV_ENVIRONMENT)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "development".to_string()),
        }
    }

    /// Store holding the default dataset
    pub fn seeded() -> Self {
        Self::new(
            model::to_values(&defaults::default_sheets()),
            model::to_values(&defaults::default_tasks()),
        )
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    fn slot(&self, kind: CollectionKind) -> &RwLock<Vec<Value>> {
        match kind {
            CollectionKind::Sheets => &self.sheets,
            CollectionKind::Tasks => &self.tasks,
        }
    }

    pub fn list(&self, kind: CollectionKind) -> Vec<Value> {
        self.slot(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the collection with the elements that pass validation.
    pub fn replace(&self, kind: CollectionKind, elements: Vec<Value>) -> ReplaceOutcome {
        let is_valid: fn(&Value) -> bool = match kind {
            CollectionKind::Sheets => SheetLink::is_valid_value,
            CollectionKind::Tasks => Task::is_valid_value,
        };
        let total = elements.len();
        let valid: Vec<Value> = elements.into_iter().filter(|e| is_valid(e)).collect();
        let outcome = ReplaceOutcome {
            count: valid.len(),
            filtered: total - valid.len(),
        };

        *self
            .slot(kind)
            .write()
            .unwrap_or_else(PoisonError::into_inner) = valid;

        if outcome.filtered > 0 {
            tracing::warn!(%kind, filtered = outcome.filtered, "filtered out invalid records");
        }
        tracing::info!(%kind, count = outcome.count, "collection replaced");
        outcome
    }

    pub fn counts(&self) -> DataCounts {
        DataCounts {
            sheets: self.sheets.read().unwrap_or_else(PoisonError::into_inner).len(),
            tasks: self.tasks.read().unwrap_or_else(PoisonError::into_inner).len(),
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

// Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
    environment: String,
    data_status: DataCounts,
    version: &'static str,
    uptime: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    success: bool,
    message: String,
    count: usize,
    filtered_count: usize,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct BadRequestResponse {
    success: bool,
    error: String,
    received: &'static str,
}

#[derive(Debug, Serialize)]
struct RejectedBodyResponse {
    success: bool,
    error: String,
    limit: usize,
}

#[derive(Debug, Serialize)]
struct NotFoundResponse {
    success: bool,
    error: &'static str,
    path: String,
    method: String,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct InternalErrorResponse {
    success: bool,
    error: &'static str,
    message: String,
    timestamp: String,
}

/// Failure surfaced as a structured 500
#[derive(Debug)]
pub struct ApiError(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("unhandled error: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(InternalErrorResponse {
                success: false,
                error: "Internal server error",
                message: self.0,
                timestamp: now(),
            }),
        )
            .into_response()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

// Route handlers

async fn root(State(store): State<Arc<ApiStore>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Dashboard API",
        "status": "running",
        "timestamp": now(),
        "endpoints": {
            "health": "GET /api/health",
            "sheets": "GET /api/sheets",
            "tasks": "GET /api/tasks",
            "updateSheets": "POST /api/update-sheets",
            "updateTasks": "POST /api/update-tasks",
            "debug": "GET /api/debug",
        },
        "dataStatus": store.counts(),
    }))
}

async fn health(State(store): State<Arc<ApiStore>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        message: "Dashboard API is running",
        timestamp: now(),
        environment: store.environment.clone(),
        data_status: store.counts(),
        version: env!("CARGO_PKG_VERSION"),
        uptime: store.uptime_secs(),
    })
}

async fn list_sheets(State(store): State<Arc<ApiStore>>) -> impl IntoResponse {
    let sheets = store.list(CollectionKind::Sheets);
    tracing::debug!(count = sheets.len(), "serving sheets");
    Json(sheets)
}

async fn list_tasks(State(store): State<Arc<ApiStore>>) -> impl IntoResponse {
    let tasks = store.list(CollectionKind::Tasks);
    tracing::debug!(count = tasks.len(), "serving tasks");
    Json(tasks)
}

async fn update_sheets(
    State(store): State<Arc<ApiStore>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    match body {
        Ok(body) => replace_collection(&store, CollectionKind::Sheets, &body),
        Err(rejection) => rejected_body(rejection),
    }
}

async fn update_tasks(
    State(store): State<Arc<ApiStore>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    match body {
        Ok(body) => replace_collection(&store, CollectionKind::Tasks, &body),
        Err(rejection) => rejected_body(rejection),
    }
}

async fn debug(State(store): State<Arc<ApiStore>>) -> impl IntoResponse {
    let sheets = store.list(CollectionKind::Sheets);
    let tasks = store.list(CollectionKind::Tasks);
    Json(serde_json::json!({
        "timestamp": now(),
        "server": {
            "uptime": store.uptime_secs(),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "data": {
            "sheets": { "count": sheets.len(), "items": sheets },
            "tasks": { "count": tasks.len(), "items": tasks },
        },
    }))
}

async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            success: false,
            error: "Endpoint not found",
            path: uri.path().to_string(),
            method: method.to_string(),
            timestamp: now(),
        }),
    )
}

fn replace_collection(store: &ApiStore, kind: CollectionKind, body: &[u8]) -> Response {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(err) => {
            return bad_request(format!("Invalid JSON body: {err}"), "invalid json");
        }
    };

    let elements = match payload.get(kind.as_str()) {
        Some(Value::Array(elements)) => elements.clone(),
        other => {
            return bad_request(
                format!("Invalid {kind} data - must be an array"),
                json_type(other),
            );
        }
    };

    let outcome = store.replace(kind, elements);
    let label = match kind {
        CollectionKind::Sheets => "Sheets",
        CollectionKind::Tasks => "Tasks",
    };

    Json(UpdateResponse {
        success: true,
        message: format!("{label} updated successfully"),
        count: outcome.count,
        filtered_count: outcome.filtered,
        timestamp: now(),
    })
    .into_response()
}

fn bad_request(error: String, received: &'static str) -> Response {
    tracing::warn!(received, "rejected update: {error}");
    (
        StatusCode::BAD_REQUEST,
        Json(BadRequestResponse {
            success: false,
            error,
            received,
        }),
    )
        .into_response()
}

/// Body that could not be read, usually over the size limit.
fn rejected_body(rejection: BytesRejection) -> Response {
    let status = rejection.status();
    let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
        format!("Request body exceeds {MAX_BODY_BYTES} bytes")
    } else {
        rejection.body_text()
    };
    tracing::warn!(status = status.as_u16(), "rejected update body: {error}");
    (
        status,
        Json(RejectedBodyResponse {
            success: false,
            error,
            limit: MAX_BODY_BYTES,
        }),
    )
        .into_response()
}

fn json_type(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

// Middleware

async fn cors(request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        origin.unwrap_or_else(|| HeaderValue::from_static("*")),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status();
    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), "request failed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %path, status = status.as_u16(), "request rejected");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), "request served");
    }
    response
}

async fn catch_panics(request: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => ApiError(panic_message(panic.as_ref())).into_response(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Create the API router
pub fn router(store: Arc<ApiStore>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/sheets", get(list_sheets))
        .route("/api/tasks", get(list_tasks))
        .route("/api/update-sheets", post(update_sheets))
        .route("/api/update-tasks", post(update_tasks))
        .route("/api/debug", get(debug))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(catch_panics))
        .layer(middleware::from_fn(log_requests))
        .layer(middleware::from_fn(cors))
        .with_state(store)
}

/// Bind the listening socket
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    let listener = TcpListener::bind((host, port)).await?;
    Ok(listener)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, store: Arc<ApiStore>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!(
        %addr,
        sheets = store.counts().sheets,
        tasks = store.counts().tasks,
        "dashboard API listening"
    );

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(Error::Io)?;

    tracing::info!("dashboard API stopped");
    Ok(())
}
