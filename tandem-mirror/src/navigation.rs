//! Reports the controlled session's location to the client.
use crate::browser::ControlledSession;
use crate::protocol::ServerEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Path, query and fragment of `url`. Strings that do not parse as an
/// absolute URL are returned as they are.
///
/// ```
/// use tandem_mirror::navigation::relative_location;
///
/// assert_eq!(relative_location("https://example.com/a/b?x=1#top"), "/a/b?x=1#top");
/// assert_eq!(relative_location("https://example.com"), "/");
/// ```
pub fn relative_location(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let mut out = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Remembers the last reported location.
#[derive(Debug, Default)]
pub struct NavigationTracker {
    last: Option<String>,
}

impl NavigationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The relative location to report, if it differs from the last one.
    pub fn observe(&mut self, url: &str) -> Option<String> {
        let location = relative_location(url);
        if self.last.as_deref() == Some(location.as_str()) {
            return None;
        }
        self.last = Some(location.clone());
        Some(location)
    }
}

/// Emit `updateBrowserUrl` whenever the session's location changes.
///
/// URLs from `navigations` (the browser's own main-frame navigation events)
/// are reported as they arrive; the session URL is also polled every `poll`
/// so changes the event stream misses still surface. When the stream ends
/// only the poll remains. Ends on cancellation or when the outbound channel
/// closes.
pub async fn track_navigation(
    session: Arc<dyn ControlledSession>,
    mut navigations: Option<mpsc::Receiver<String>>,
    outbound: mpsc::Sender<ServerEvent>,
    poll: Duration,
    cancel: CancellationToken,
) {
    let mut tracker = NavigationTracker::new();
    loop {
        match session.current_url().await {
            Ok(url) => {
                if !report(&mut tracker, &url, &outbound).await {
                    return;
                }
            }
            Err(e) => tracing::debug!(target: "mirror.nav", error = %e, "url not readable"),
        }

        let next_poll = tokio::time::sleep(poll);
        tokio::pin!(next_poll);
        loop {
            let navigated = tokio::select! {
                _ = cancel.cancelled() => return,
                _ = &mut next_poll => break,
                url = next_navigation(&mut navigations) => url,
            };
            match navigated {
                Some(url) => {
                    if !report(&mut tracker, &url, &outbound).await {
                        return;
                    }
                }
                None => {
                    tracing::debug!(target: "mirror.nav", "navigation events ended; polling only");
                    navigations = None;
                }
            }
        }
    }
}

async fn next_navigation(navigations: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match navigations {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// `false` once the client is gone.
async fn report(tracker: &mut NavigationTracker, url: &str, outbound: &mpsc::Sender<ServerEvent>) -> bool {
    let Some(location) = tracker.observe(url) else {
        return true;
    };
    tracing::debug!(target: "mirror.nav", %location, "location changed");
    outbound
        .send(ServerEvent::UpdateBrowserUrl { url: location })
        .await
        .is_ok()
}
