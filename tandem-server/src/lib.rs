//! HTTP and WebSocket surface of Tandem.
//!
//! - `GET /ws`: the patch channel, one controlled browser per connection
//! - `GET /getContent?url=`: intercepted resources from the content cache
//! - `GET /healthz`: liveness and session count
//! - `POST /sessions/:id/redirect`: send a client elsewhere
pub mod channel;
pub mod launcher;
pub mod manager;
pub mod registry;
pub mod routes;

use anyhow::Context;
use std::sync::Arc;
use tandem_common::TandemError;
use tandem_config::TandemConfig;
use tandem_mirror::intercept::{ContentCache, ContentTransform, InterceptPattern};
use tokio_util::sync::CancellationToken;

pub use launcher::{BrowserLauncher, LaunchedBrowser, WebDriverLauncher};
pub use manager::SessionManager;
pub use registry::SessionRegistry;
pub use routes::{AppState, router};

/// Wire the content cache, browser launcher and session manager from config.
pub fn build_state(
    config: &TandemConfig,
    transform: Arc<dyn ContentTransform>,
    shutdown: CancellationToken,
) -> Result<AppState, TandemError> {
    let patterns = InterceptPattern::from_config(&config.intercept)?;

    let mut cache = ContentCache::new(transform);
    if let Some(dir) = &config.intercept.cache_dir {
        cache = cache.with_cache_dir(dir);
    }
    let cache = Arc::new(cache);

    let launcher = Arc::new(WebDriverLauncher::new(
        config.browser.clone(),
        config.mirror.click_timeout(),
        patterns,
        cache.clone(),
    ));
    let manager = Arc::new(SessionManager::new(launcher, &config.mirror));

    Ok(AppState {
        manager,
        cache,
        shutdown,
    })
}

/// Bind the configured address and serve until `shutdown` fires.
pub async fn serve(config: &TandemConfig, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("bind {}", config.server.bind))?;
    tracing::info!(target: "server.session", addr = %config.server.bind, "listening");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
