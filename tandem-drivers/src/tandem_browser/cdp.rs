//! Minimal DevTools protocol client over `tokio-tungstenite`.
//!
//! Only what interception needs: command/response correlation and an event
//! stream.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingTx = oneshot::Sender<Result<Value, String>>;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

struct CdpCommand {
    method: String,
    params: Value,
    response_tx: PendingTx,
}

/// A protocol event (a message with `method` and no `id`).
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

/// Entry of the DevTools `/json/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    pub web_socket_debugger_url: Option<String>,
}

/// First page target's debugger URL from a `/json/list` response.
pub fn page_socket_url(targets: &[TargetInfo]) -> Option<String> {
    targets
        .iter()
        .filter(|t| t.kind == "page")
        .find_map(|t| t.web_socket_debugger_url.clone())
}

/// Poll the browser's DevTools HTTP endpoint until a page target appears.
pub async fn discover_page_socket(port: u16) -> Result<String> {
    let url = format!("http://127.0.0.1:{port}/json/list");
    for _ in 0..50 {
        if let Ok(resp) = reqwest::get(&url).await {
            if let Ok(targets) = resp.json::<Vec<TargetInfo>>().await {
                if let Some(ws) = page_socket_url(&targets) {
                    return Ok(ws);
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("no page target on DevTools port {port}"))
}

/// Anything that can run a DevTools command and return its `result`.
#[async_trait]
pub trait DevToolsCommands: Send + Sync {
    async fn command(&self, method: &str, params: Value) -> Result<Value>;
}

pub struct CdpConnection {
    cmd_tx: mpsc::Sender<CdpCommand>,
    handler: JoinHandle<()>,
}

impl CdpConnection {
    /// Connect to a target's debugger socket. Events arrive on the returned
    /// receiver until the socket closes.
    pub async fn connect(ws_url: &str) -> Result<(Self, mpsc::Receiver<CdpEvent>)> {
        let (ws, _) = connect_async(ws_url)
            .await
            .with_context(|| format!("DevTools connect {ws_url}"))?;
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);
        let handler = tokio::spawn(handler_loop(ws, cmd_rx, event_tx));
        tracing::debug!(target: "driver.cdp", %ws_url, "connected");
        Ok((Self { cmd_tx, handler }, event_rx))
    }

    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(CdpCommand {
                method: method.to_string(),
                params,
                response_tx: tx,
            })
            .await
            .map_err(|_| anyhow!("DevTools connection closed"))?;

        tokio::time::timeout(COMMAND_TIMEOUT, rx)
            .await
            .map_err(|_| anyhow!("DevTools {method} timed out"))?
            .map_err(|_| anyhow!("DevTools {method} response dropped"))?
            .map_err(|e| anyhow!("DevTools {method}: {e}"))
    }
}

#[async_trait]
impl DevToolsCommands for CdpConnection {
    async fn command(&self, method: &str, params: Value) -> Result<Value> {
        self.send(method, params).await
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn handler_loop(
    ws: WsStream,
    mut cmd_rx: mpsc::Receiver<CdpCommand>,
    event_tx: mpsc::Sender<CdpEvent>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<u64, PendingTx> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let id = next_id;
                next_id += 1;
                let msg = json!({ "id": id, "method": cmd.method, "params": cmd.params });
                pending.insert(id, cmd.response_tx);
                if ws_tx.send(Message::Text(msg.to_string().into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(val) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                match classify(val) {
                    Incoming::Response { id, result } => {
                        if let Some(tx) = pending.remove(&id) {
                            let _ = tx.send(result);
                        }
                    }
                    Incoming::Event(event) => {
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Incoming::Ignored => {}
                }
            }
        }
    }
    tracing::debug!(target: "driver.cdp", pending = pending.len(), "connection closed");
}

#[derive(Debug)]
enum Incoming {
    Response { id: u64, result: Result<Value, String> },
    Event(CdpEvent),
    Ignored,
}

fn classify(mut val: Value) -> Incoming {
    if let Some(id) = val.get("id").and_then(Value::as_u64) {
        let result = match val.get("error") {
            Some(err) => Err(err["message"].as_str().unwrap_or("DevTools error").to_string()),
            None => Ok(val["result"].take()),
        };
        return Incoming::Response { id, result };
    }
    match val.get("method").and_then(Value::as_str) {
        Some(method) => Incoming::Event(CdpEvent {
            method: method.to_string(),
            params: val["params"].take(),
        }),
        None => Incoming::Ignored,
    }
}
