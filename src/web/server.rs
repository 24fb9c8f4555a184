//! HTTP server implementation.
//!
//! Each route maps onto one store or cascade operation. Mutations follow
//! post/redirect/get: they answer `303 See Other` to the index with a flash
//! message in the query string.

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::flash::Flash;
use super::{render, templates};
use crate::collapse::{COLLAPSE_STATE_KEY, CollapseCache, MemoryStore};
use crate::config::{ServerConfig, UiConfig};
use crate::db::Database;
use crate::error::{ErrorCode, TaskError, TaskResult};
use crate::hierarchy::build_forest;
use crate::types::{TaskId, TaskStats};

/// Server state shared across handlers.
#[derive(Clone)]
pub struct WebServer {
    /// Reference to the task database.
    db: Arc<Database>,
    /// Rendering options.
    ui: Arc<UiConfig>,
}

impl WebServer {
    pub fn new(db: Arc<Database>, ui: Arc<UiConfig>) -> Self {
        Self { db, ui }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn ui(&self) -> &UiConfig {
        &self.ui
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Turn a store error into the response the user sees.
///
/// Missing tasks get a 404 page, fixable input goes back to the index as an
/// error flash, anything else is a 500.
fn error_response(state: &WebServer, err: TaskError) -> Response {
    match err.code {
        ErrorCode::TaskNotFound => {
            warn!(error = %err, "Task not found");
            (
                StatusCode::NOT_FOUND,
                Html(render::render_not_found(state.ui(), &err.message)),
            )
                .into_response()
        }
        code if code.is_user_error() => {
            warn!(error = %err, ?code, "Rejected request");
            Redirect::to(&Flash::error(err.message).redirect_target()).into_response()
        }
        code => {
            error!(error = %err, ?code, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!(
                    r#"<div class="message message-error">Something went wrong: {}</div>"#,
                    render::html_escape(&err.message)
                )),
            )
                .into_response()
        }
    }
}

fn redirect_with(flash: Option<Flash>) -> Response {
    match flash {
        Some(flash) => Redirect::to(&flash.redirect_target()).into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// Read the collapse-state blob from the request cookie.
fn collapse_from_headers(headers: &HeaderMap, ui: &UiConfig) -> CollapseCache<MemoryStore> {
    let blob = cookie_value(headers, COLLAPSE_STATE_KEY);
    CollapseCache::from_blob(MemoryStore::new(), blob.as_deref())
        .with_default(ui.collapsed_by_default)
}

/// Find a cookie by name and URL-decode its value.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}

/// Parse an optional id from a form field; blank means "none".
fn parse_optional_id(field: &str, value: Option<&str>) -> TaskResult<Option<TaskId>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| TaskError::invalid_value(field, "Invalid parent task")),
    }
}

#[derive(Debug, serde::Deserialize)]
struct IndexParams {
    msg: Option<String>,
}

/// Index page: the full task forest.
async fn index(
    State(state): State<WebServer>,
    Query(params): Query<IndexParams>,
    headers: HeaderMap,
) -> Response {
    let tasks = match state.db().get_all_tasks() {
        Ok(tasks) => tasks,
        Err(e) => return error_response(&state, e),
    };
    // Counted from the same snapshot that gets rendered.
    let stats = TaskStats::from_tasks(&tasks);

    let forest = build_forest(tasks);
    let collapse = collapse_from_headers(&headers, state.ui());
    let flash = params.msg.as_deref().and_then(Flash::parse);

    Html(render::render_index(
        state.ui(),
        &forest,
        stats,
        &collapse,
        flash.as_ref(),
    ))
    .into_response()
}

/// Form data for new tasks.
#[derive(Debug, serde::Deserialize)]
struct AddForm {
    #[serde(default)]
    task: String,
    parent_id: Option<String>,
}

async fn add_task(State(state): State<WebServer>, Form(form): Form<AddForm>) -> Response {
    let parent_id = match parse_optional_id("parent_id", form.parent_id.as_deref()) {
        Ok(parent_id) => parent_id,
        Err(e) => return error_response(&state, e),
    };

    match state.db().create_task(&form.task, parent_id) {
        Ok(_) => redirect_with(Some(Flash::success("Task added successfully!"))),
        Err(e) if e.code == ErrorCode::MissingRequiredField => {
            redirect_with(Some(Flash::error("Please enter a task!")))
        }
        Err(e) => error_response(&state, e),
    }
}

async fn toggle_task(State(state): State<WebServer>, Path(task_id): Path<TaskId>) -> Response {
    match state.db().toggle_task(task_id) {
        Ok(_) => redirect_with(None),
        Err(e) => error_response(&state, e),
    }
}

#[derive(Debug, serde::Deserialize)]
struct CascadeParams {
    completed: Option<bool>,
}

async fn toggle_with_children(
    State(state): State<WebServer>,
    Path(task_id): Path<TaskId>,
    Query(params): Query<CascadeParams>,
) -> Response {
    match state.db().toggle_with_children(task_id, params.completed) {
        Ok(_) => redirect_with(None),
        Err(e) => error_response(&state, e),
    }
}

#[derive(Debug, serde::Deserialize)]
struct EditForm {
    #[serde(default)]
    task: String,
}

async fn edit_task(
    State(state): State<WebServer>,
    Path(task_id): Path<TaskId>,
    Form(form): Form<EditForm>,
) -> Response {
    match state.db().update_task_text(task_id, &form.task) {
        Ok(_) => redirect_with(Some(Flash::success("Task updated!"))),
        Err(e) if e.code == ErrorCode::MissingRequiredField => {
            redirect_with(Some(Flash::error("Task text cannot be empty!")))
        }
        Err(e) => error_response(&state, e),
    }
}

async fn delete_task(State(state): State<WebServer>, Path(task_id): Path<TaskId>) -> Response {
    match state.db().delete_with_descendants(task_id) {
        Ok(1) => redirect_with(Some(Flash::info("Task deleted!"))),
        Ok(removed) => redirect_with(Some(Flash::info(format!(
            "Task deleted along with {} subtask{}!",
            removed - 1,
            if removed == 2 { "" } else { "s" }
        )))),
        Err(e) => error_response(&state, e),
    }
}

#[derive(Debug, serde::Deserialize)]
struct MoveForm {
    parent_id: Option<String>,
}

async fn move_task(
    State(state): State<WebServer>,
    Path(task_id): Path<TaskId>,
    Form(form): Form<MoveForm>,
) -> Response {
    let result = parse_optional_id("parent_id", form.parent_id.as_deref())
        .and_then(|parent_id| state.db().move_task(task_id, parent_id));
    match result {
        Ok(_) => redirect_with(Some(Flash::success("Task moved!"))),
        Err(e) => error_response(&state, e),
    }
}

#[derive(Debug, serde::Deserialize)]
struct CollapseParams {
    collapsed: bool,
}

/// No-script fallback for folding a subtree: rewrite the cookie and go back.
async fn set_collapse(
    State(state): State<WebServer>,
    Path(parent_id): Path<TaskId>,
    Query(params): Query<CollapseParams>,
    headers: HeaderMap,
) -> Response {
    let mut collapse = collapse_from_headers(&headers, state.ui());
    if let Err(e) = collapse.set_state(parent_id, params.collapsed) {
        return error_response(&state, TaskError::internal(e));
    }

    let blob = collapse
        .store()
        .get(COLLAPSE_STATE_KEY)
        .unwrap_or("{}")
        .to_string();
    let cookie = format!(
        "{}={}; Path=/; Max-Age=31536000; SameSite=Lax",
        COLLAPSE_STATE_KEY,
        urlencoding::encode(&blob)
    );

    let mut response = Redirect::to("/").into_response();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, "Could not encode collapse cookie"),
    }
    response
}

async fn about(State(state): State<WebServer>) -> Html<String> {
    Html(render::render_about(state.ui()))
}

async fn style_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        templates::STYLE_CSS,
    )
}

async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        templates::APP_JS,
    )
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found(State(state): State<WebServer>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(render::render_not_found(
            state.ui(),
            "The page you requested does not exist.",
        )),
    )
        .into_response()
}

/// Build the router with all routes.
pub fn build_router(state: WebServer) -> Router {
    Router::new()
        // Page routes
        .route("/", get(index))
        .route("/about", get(about))
        // Task mutations
        .route("/add", post(add_task))
        .route("/toggle/{task_id}", get(toggle_task).post(toggle_task))
        .route(
            "/toggle_with_children/{task_id}",
            get(toggle_with_children).post(toggle_with_children),
        )
        .route("/edit/{task_id}", post(edit_task))
        .route("/delete/{task_id}", get(delete_task).post(delete_task))
        .route("/move/{task_id}", post(move_task))
        .route("/collapse/{task_id}", get(set_collapse))
        // Static assets
        .route("/static/css/style.css", get(style_css))
        .route("/static/js/app.js", get(app_js))
        // API routes
        .route("/api/health", get(health))
        .fallback(not_found)
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle for a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Trigger graceful shutdown and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            error!("Server task failed: {}", e);
        }
    }
}

/// Bind and start serving in a background task.
///
/// Port 0 binds an ephemeral port; the handle reports the real address.
pub async fn start_server(
    db: Arc<Database>,
    server: &ServerConfig,
    ui: Arc<UiConfig>,
) -> anyhow::Result<ServerHandle> {
    let app = build_router(WebServer::new(db, ui));

    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port)).await?;
    let addr = listener.local_addr()?;

    info!("TaskNest listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Server shutting down");
            })
            .await
        {
            error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }

    #[test]
    fn cookie_value_finds_and_decodes() {
        let headers = headers_with_cookie("theme=dark; collapseState=%7B%221%22%3Afalse%7D");
        assert_eq!(
            cookie_value(&headers, "collapseState").as_deref(),
            Some(r#"{"1":false}"#)
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn collapse_from_cookie_applies_state_and_default() {
        let headers = headers_with_cookie("collapseState=%7B%221%22%3Afalse%7D");
        let cache = collapse_from_headers(&headers, &UiConfig::default());
        assert_eq!(cache.get_state(1), Some(false));
        assert!(cache.is_collapsed(2));
    }

    #[test]
    fn parse_optional_id_cases() {
        assert_eq!(parse_optional_id("parent_id", None).unwrap(), None);
        assert_eq!(parse_optional_id("parent_id", Some(" ")).unwrap(), None);
        assert_eq!(parse_optional_id("parent_id", Some("12")).unwrap(), Some(12));
        let err = parse_optional_id("parent_id", Some("abc")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    }
}
