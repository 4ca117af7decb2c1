use crate::launcher::BrowserLauncher;
use crate::registry::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tandem_common::{Result, TandemError};
use tandem_config::MirrorConfig;
use tandem_mirror::navigation::track_navigation;
use tandem_mirror::protocol::{InputEvent, ServerEvent};
use tandem_mirror::session::{run_diff_loop, LoopTiming};
use tandem_mirror::{DiffEngine, InputReplicator};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Owns the lifecycle of one controlled browser per connected client.
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    registry: SessionRegistry,
    timing: LoopTiming,
    url_poll: Duration,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, mirror: &MirrorConfig) -> Self {
        Self {
            launcher,
            registry: SessionRegistry::new(),
            timing: LoopTiming::from(mirror),
            url_poll: mirror.url_poll(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Drive one session until `cancel` fires or the client channel closes,
    /// then tear the browser down. Teardown failures are logged only.
    pub async fn run_session(
        &self,
        inbound: mpsc::Receiver<InputEvent>,
        outbound: mpsc::Sender<ServerEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let id = Uuid::new_v4();
        self.run(id, inbound, outbound, cancel)
            .instrument(info_span!("session", %id))
            .await
    }

    async fn run(
        &self,
        id: Uuid,
        inbound: mpsc::Receiver<InputEvent>,
        outbound: mpsc::Sender<ServerEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut browser = match self.launcher.launch().await {
            Ok(browser) => browser,
            Err(e) => {
                warn!(target: "server.session", error = %e, "browser launch failed");
                return Err(TandemError::Driver(e));
            }
        };
        self.registry.insert(id, outbound.clone());
        info!(target: "server.session", "session started");

        let session = browser.session();
        let navigation = tokio::spawn(
            track_navigation(
                session.clone(),
                browser.take_navigations(),
                outbound.clone(),
                self.url_poll,
                cancel.clone(),
            )
            .in_current_span(),
        );
        let input = tokio::spawn(
            InputReplicator::new(session.clone())
                .run(inbound, cancel.clone())
                .in_current_span(),
        );

        let mut engine = DiffEngine::new();
        let result = run_diff_loop(session, &mut engine, outbound, self.timing, cancel.clone()).await;

        cancel.cancel();
        self.registry.remove(&id);
        join_task("navigation", navigation).await;
        join_task("input", input).await;
        if let Err(e) = browser.close().await {
            warn!(target: "server.session", error = %e, "teardown failed");
        }
        info!(target: "server.session", frames = engine.frame_count(), "session ended");

        match result {
            Err(TandemError::ChannelClosed) => Ok(()),
            other => other,
        }
    }
}

/// Await a per-session task. A panic or abort is logged, not propagated.
async fn join_task(name: &'static str, task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "server.session", task = name, error = %e, "session task failed");
            false
        }
    }
}
