//! WebSocket transport for the patch channel.
use crate::manager::SessionManager;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tandem_mirror::protocol::{InputEvent, ServerEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const OUTBOUND_CAPACITY: usize = 64;
const INBOUND_CAPACITY: usize = 256;
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Parse an inbound frame; malformed frames are logged and dropped.
pub fn decode_input(text: &str) -> Option<InputEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(target: "server.session", error = %e, "malformed client frame ignored");
            None
        }
    }
}

/// Bridge one upgraded socket to a mirrored session. Returns once the
/// session has been torn down.
pub async fn serve_socket(socket: WebSocket, manager: Arc<SessionManager>, shutdown: CancellationToken) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_CAPACITY);
    let (in_tx, in_rx) = mpsc::channel::<InputEvent>(INBOUND_CAPACITY);
    let cancel = shutdown.child_token();

    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(target: "server.session", error = %e, "event not serializable");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        writer_cancel.cancel();
        let _ = sink.close().await;
    });

    let reader_cancel = cancel.clone();
    let reader = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                _ = reader_cancel.cancelled() => break,
                msg = stream.next() => msg,
            };
            match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = decode_input(&text) {
                        if in_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(target: "server.session", error = %e, "socket read failed");
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
        reader_cancel.cancel();
    });

    if let Err(e) = manager.run_session(in_rx, out_tx, cancel.clone()).await {
        warn!(target: "server.session", error = %e, "session failed");
    }

    cancel.cancel();
    reader.abort();
    if tokio::time::timeout(WRITER_DRAIN, writer).await.is_err() {
        debug!(target: "server.session", "writer did not drain in time");
    }
}
