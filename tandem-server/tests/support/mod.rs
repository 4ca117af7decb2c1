#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tandem_config::MirrorConfig;
use tandem_mirror::browser::{Capture, ControlledSession, FrameCapture, PageCapture};
use tandem_mirror::input::{KeyStroke, RangeSelection};
use tandem_mirror::intercept::{ContentCache, Passthrough};
use tandem_server::{AppState, BrowserLauncher, LaunchedBrowser, SessionManager, router};
use tokio_util::sync::CancellationToken;

/// A page that never changes, at a fixed URL. Records clicks.
pub struct StaticPage {
    pub markup: String,
    pub url: String,
    pub clicks: Mutex<Vec<String>>,
}

impl StaticPage {
    pub fn new(markup: &str, url: &str) -> Self {
        Self {
            markup: markup.to_string(),
            url: url.to_string(),
            clicks: Mutex::new(Vec::new()),
        }
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControlledSession for StaticPage {
    async fn capture(&self) -> Capture {
        Capture::Ready(PageCapture {
            main_markup: self.markup.clone(),
            frames: Vec::<FrameCapture>::new(),
        })
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn click(&self, css_path: &str) -> Result<()> {
        self.clicks.lock().unwrap().push(css_path.to_string());
        Ok(())
    }

    async fn press_key(&self, _stroke: &KeyStroke) -> Result<()> {
        Ok(())
    }

    async fn send_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn set_native_selection(&self, _css_path: &str, _start: usize, _end: usize) -> Result<()> {
        Ok(())
    }

    async fn select_range(&self, _range: &RangeSelection) -> Result<bool> {
        Ok(true)
    }
}

/// Hands out the same page to every session and counts launches and closes.
pub struct FakeLauncher {
    pub page: Arc<StaticPage>,
    pub launched: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub fail: bool,
}

impl FakeLauncher {
    pub fn new(page: Arc<StaticPage>) -> Self {
        Self {
            page,
            launched: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeBrowser {
    page: Arc<StaticPage>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn LaunchedBrowser>> {
        if self.fail {
            return Err(anyhow!("webdriver unreachable"));
        }
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser {
            page: self.page.clone(),
            closed: self.closed.clone(),
        }))
    }
}

#[async_trait]
impl LaunchedBrowser for FakeBrowser {
    fn session(&self) -> Arc<dyn ControlledSession> {
        self.page.clone()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn fast_mirror() -> MirrorConfig {
    MirrorConfig {
        cycle_interval_ms: 10,
        retry_initial_ms: 5,
        retry_max_ms: 20,
        url_poll_ms: 10,
        click_timeout_ms: 100,
    }
}

pub fn state_with(launcher: Arc<FakeLauncher>) -> AppState {
    AppState {
        manager: Arc::new(SessionManager::new(launcher, &fast_mirror())),
        cache: Arc::new(ContentCache::new(Arc::new(Passthrough))),
        shutdown: CancellationToken::new(),
    }
}

/// Serve `state` on an ephemeral port until its shutdown token fires.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, router(state))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });
    addr
}
