//! Main-frame navigation events from the DevTools `Page` domain.
use super::cdp::{discover_page_socket, CdpConnection, CdpEvent};
use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

const NAVIGATION_BUFFER: usize = 32;

/// Follows the main frame across navigations.
#[derive(Debug, Default)]
pub struct MainFrame {
    id: Option<String>,
}

impl MainFrame {
    /// URL the main frame moved to, if `event` is such a navigation.
    /// `Page.frameNavigated` without a `parentId` names the main frame;
    /// same-document moves (fragments, `pushState`) count only for it.
    pub fn navigated_to(&mut self, event: &CdpEvent) -> Option<String> {
        match event.method.as_str() {
            "Page.frameNavigated" => {
                let frame = &event.params["frame"];
                if frame.get("parentId").is_some_and(|p| !p.is_null()) {
                    return None;
                }
                self.id = frame["id"].as_str().map(str::to_string);
                let mut url = frame["url"].as_str()?.to_string();
                if let Some(fragment) = frame["urlFragment"].as_str() {
                    url.push_str(fragment);
                }
                Some(url)
            }
            "Page.navigatedWithinDocument" => {
                let frame_id = event.params["frameId"].as_str()?;
                if self.id.as_deref() != Some(frame_id) {
                    return None;
                }
                event.params["url"].as_str().map(str::to_string)
            }
            _ => None,
        }
    }
}

/// Running navigation feed for one page; dropping it closes the feed.
pub struct NavigationWatch {
    task: JoinHandle<()>,
}

impl NavigationWatch {
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for NavigationWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribe to main-frame navigations of the page behind `debug_port`.
pub async fn watch(debug_port: u16) -> Result<(NavigationWatch, mpsc::Receiver<String>)> {
    let ws_url = discover_page_socket(debug_port).await?;
    let (conn, mut events) = CdpConnection::connect(&ws_url).await?;
    conn.send("Page.enable", json!({}))
        .await
        .context("enable page events")?;

    let (tx, rx) = mpsc::channel(NAVIGATION_BUFFER);
    let task = tokio::spawn(async move {
        // The connection lives as long as the feed.
        let _conn = conn;
        let mut main_frame = MainFrame::default();
        while let Some(event) = events.recv().await {
            if let Some(url) = main_frame.navigated_to(&event) {
                debug!(target: "driver.cdp", %url, "main frame navigated");
                if tx.send(url).await.is_err() {
                    break;
                }
            }
        }
    });
    Ok((NavigationWatch { task }, rx))
}
