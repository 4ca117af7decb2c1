//! The per-session capture → diff → send loop.
use crate::browser::{Capture, ControlledSession};
use crate::protocol::ServerEvent;
use crate::snapshot::DiffEngine;
use std::sync::Arc;
use std::time::Duration;
use tandem_common::TandemError;
use tandem_config::MirrorConfig;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    /// Pause after a successful cycle.
    pub cycle_interval: Duration,
    pub retry_initial: Duration,
    pub retry_max: Duration,
}

impl From<&MirrorConfig> for LoopTiming {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            cycle_interval: config.cycle_interval(),
            retry_initial: config.retry_initial(),
            retry_max: config.retry_max(),
        }
    }
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self::from(&MirrorConfig::default())
    }
}

/// Doubling delay between `initial` and `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following one doubles, up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Run diff cycles until `cancel` fires (`Ok`) or the outbound channel
/// closes (`Err(ChannelClosed)`). Cycles never overlap; an unavailable
/// capture is retried with backoff and never reported.
pub async fn run_diff_loop(
    session: Arc<dyn ControlledSession>,
    engine: &mut DiffEngine,
    outbound: mpsc::Sender<ServerEvent>,
    timing: LoopTiming,
    cancel: CancellationToken,
) -> Result<(), TandemError> {
    let mut backoff = Backoff::new(timing.retry_initial, timing.retry_max);
    loop {
        let capture = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            capture = session.capture() => capture,
        };

        let pause = match capture {
            Capture::Unavailable => {
                let delay = backoff.next_delay();
                tracing::trace!(target: "mirror.diff", ?delay, "capture unavailable");
                delay
            }
            Capture::Ready(page) => {
                backoff.reset();
                if let Some(batch) = engine.cycle(&page) {
                    outbound
                        .send(ServerEvent::DomChanges(batch))
                        .await
                        .map_err(|_| TandemError::ChannelClosed)?;
                }
                timing.cycle_interval
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap_and_resets() {
        let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_millis(300));
        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![50, 100, 200, 300, 300]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
    }

    #[test]
    fn timing_comes_from_config() {
        let timing = LoopTiming::default();
        assert_eq!(timing.cycle_interval, Duration::from_millis(100));
        assert_eq!(timing.retry_initial, Duration::from_millis(50));
        assert_eq!(timing.retry_max, Duration::from_millis(1000));
    }
}
