use crate::channel::serve_socket;
use crate::manager::SessionManager;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tandem_common::TandemError;
use tandem_mirror::ContentCache;
use tandem_mirror::intercept::{FetchBody, encode_for_fetch};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Shared state passed to HTTP/WS handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub cache: Arc<ContentCache>,
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/getContent", get(get_content))
        .route("/healthz", get(healthz))
        .route("/sessions/:id/redirect", post(redirect_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state.manager.clone(), state.shutdown.clone()))
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub url: String,
}

/// Cached intercepted resources; binary payloads travel as base64 text.
async fn get_content(State(state): State<AppState>, Query(query): Query<ContentQuery>) -> Response {
    let Some(entry) = state.cache.lookup(&query.url).await else {
        return (StatusCode::NOT_FOUND, "Content not found").into_response();
    };
    match encode_for_fetch(&entry) {
        FetchBody::Text(body) => ([(header::CONTENT_TYPE, entry.mime.clone())], body).into_response(),
        FetchBody::Base64(body) => (
            [
                (header::CONTENT_TYPE, entry.mime.clone()),
                (
                    HeaderName::from_static("content-transfer-encoding"),
                    "base64".to_string(),
                ),
            ],
            body,
        )
            .into_response(),
    }
}

async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.manager.registry().len(),
        "cached": state.cache.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RedirectRequest {
    pub url: String,
}

async fn redirect_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RedirectRequest>,
) -> StatusCode {
    match state.manager.registry().redirect(id, request.url).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(TandemError::SessionNotFound(_)) | Err(TandemError::ChannelClosed) => StatusCode::NOT_FOUND,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
