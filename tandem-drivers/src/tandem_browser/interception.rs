//! Response-stage interception through the DevTools `Fetch` domain.
//!
//! Paused responses are decoded, run through the shared [`ContentCache`]
//! and fulfilled with rebuilt headers. Redirects and unreadable bodies are
//! continued untouched.
use super::cdp::{discover_page_socket, CdpConnection, CdpEvent, DevToolsCommands};
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tandem_mirror::intercept::{fulfill_headers, is_redirect, ContentCache, InterceptPattern, ResourceKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PausedRequest {
    pub url: String,
}

/// Parameters of a `Fetch.requestPaused` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPaused {
    pub request_id: String,
    pub request: PausedRequest,
    pub resource_type: String,
    pub response_status_code: Option<u16>,
    pub response_headers: Option<Vec<HeaderEntry>>,
}

impl RequestPaused {
    pub fn kind(&self) -> ResourceKind {
        self.resource_type.parse().unwrap_or(ResourceKind::Other)
    }

    /// Original `Content-Type`, matched case-insensitively.
    pub fn content_type(&self) -> Option<&str> {
        self.response_headers
            .as_deref()?
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-type"))
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PausedAction {
    Continue,
    Rewrite,
}

/// Only complete, non-redirect responses are rewritten.
pub fn plan(paused: &RequestPaused) -> PausedAction {
    match paused.response_status_code {
        Some(status) if !is_redirect(status) => PausedAction::Rewrite,
        _ => PausedAction::Continue,
    }
}

/// `Fetch.enable` parameters for the configured patterns.
pub fn enable_params(patterns: &[InterceptPattern]) -> Value {
    let patterns: Vec<Value> = patterns
        .iter()
        .map(|p| {
            json!({
                "urlPattern": p.url_pattern,
                "resourceType": p.kind.as_str(),
                "requestStage": "Response",
            })
        })
        .collect();
    json!({ "patterns": patterns })
}

pub fn fulfill_params(request_id: &str, status: u16, mime: &str, payload: &[u8]) -> Value {
    let headers: Vec<Value> = fulfill_headers(mime, payload.len())
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();
    json!({
        "requestId": request_id,
        "responseCode": status,
        "responseHeaders": headers,
        "body": BASE64.encode(payload),
    })
}

/// Decode a `Fetch.getResponseBody` result.
pub fn decode_body(result: &Value) -> Result<Vec<u8>> {
    let body = result["body"].as_str().context("response body missing")?;
    if result["base64Encoded"].as_bool().unwrap_or(false) {
        Ok(BASE64.decode(body).context("response body not base64")?)
    } else {
        Ok(body.as_bytes().to_vec())
    }
}

/// Running interception for one page; dropping it stops interception.
pub struct InterceptorHandle {
    task: JoinHandle<()>,
}

impl InterceptorHandle {
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for InterceptorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Attach to the page behind `debug_port` and start intercepting. With no
/// patterns nothing is attached.
pub async fn attach(
    debug_port: u16,
    patterns: &[InterceptPattern],
    cache: Arc<ContentCache>,
) -> Result<Option<InterceptorHandle>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let ws_url = discover_page_socket(debug_port).await?;
    let (conn, events) = CdpConnection::connect(&ws_url).await?;
    conn.send("Fetch.enable", enable_params(patterns))
        .await
        .context("enable response interception")?;
    debug!(target: "mirror.intercept", patterns = patterns.len(), "interception enabled");

    let task = tokio::spawn(event_loop(Arc::new(conn), events, cache));
    Ok(Some(InterceptorHandle { task }))
}

async fn event_loop(conn: Arc<CdpConnection>, mut events: mpsc::Receiver<CdpEvent>, cache: Arc<ContentCache>) {
    while let Some(event) = events.recv().await {
        if event.method != "Fetch.requestPaused" {
            continue;
        }
        let paused: RequestPaused = match serde_json::from_value(event.params) {
            Ok(paused) => paused,
            Err(e) => {
                warn!(target: "mirror.intercept", error = %e, "unreadable requestPaused event");
                continue;
            }
        };
        let conn = conn.clone();
        let cache = cache.clone();
        tokio::spawn(async move {
            let request_id = paused.request_id.clone();
            if let Err(e) = handle_paused(conn.as_ref(), &cache, paused).await {
                warn!(target: "mirror.intercept", %request_id, error = %e, "interception failed");
            }
        });
    }
}

/// Every paused request ends in exactly one of fulfil or continue; a failed
/// fulfil falls back to continuing the original response.
async fn handle_paused(
    conn: &dyn DevToolsCommands,
    cache: &ContentCache,
    paused: RequestPaused,
) -> Result<()> {
    let status = match (plan(&paused), paused.response_status_code) {
        (PausedAction::Rewrite, Some(status)) => status,
        _ => return continue_request(conn, &paused.request_id).await,
    };

    let raw = match conn
        .command("Fetch.getResponseBody", json!({ "requestId": paused.request_id }))
        .await
        .and_then(|result| decode_body(&result))
    {
        Ok(raw) => raw,
        Err(e) => {
            debug!(target: "mirror.intercept", url = %paused.request.url, error = %e, "body unavailable; continuing");
            return continue_request(conn, &paused.request_id).await;
        }
    };

    let mime = paused
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let entry = cache
        .resolve(&paused.request.url, paused.kind(), &mime, &raw)
        .await;
    if let Err(e) = conn
        .command(
            "Fetch.fulfillRequest",
            fulfill_params(&paused.request_id, status, &entry.mime, &entry.payload),
        )
        .await
    {
        warn!(target: "mirror.intercept", url = %paused.request.url, error = %e, "fulfil failed; continuing original");
        return continue_request(conn, &paused.request_id).await;
    }
    debug!(target: "mirror.intercept", url = %paused.request.url, bytes = entry.payload.len(), "fulfilled");
    Ok(())
}

async fn continue_request(conn: &dyn DevToolsCommands, request_id: &str) -> Result<()> {
    conn.command("Fetch.continueRequest", json!({ "requestId": request_id }))
        .await?;
    Ok(())
}
