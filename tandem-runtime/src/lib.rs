//! Process runtime for the Tandem server: one multi-threaded Tokio runtime
//! plus the root cancellation token every session is a child of.
use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct TandemRuntime {
    runtime: Runtime,
    shutdown: CancellationToken,
}

#[derive(Clone)]
pub struct TandemHandle {
    inner: Handle,
    shutdown: CancellationToken,
}

impl TandemRuntime {
    /// Build the runtime. `worker_threads` of `None` uses one per core.
    ///
    /// ```
    /// use tandem_runtime::TandemRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = TandemRuntime::build("tandem-doctest", Some(1)).unwrap();
    /// assert_eq!(runtime.block_on(async { 2 + 2 }), 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);
        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }
        let runtime = builder.build().context("tokio runtime")?;
        Ok(Self {
            runtime,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> TandemHandle {
        TandemHandle {
            inner: self.runtime.handle().clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Fire the shutdown token, then give tasks `graceful` to finish.
    ///
    /// ```
    /// use tandem_runtime::TandemRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = TandemRuntime::build("tandem-shutdown", Some(1)).unwrap();
    /// let token = runtime.handle().shutdown_token();
    /// runtime.shutdown(Duration::from_millis(5));
    /// assert!(token.is_cancelled());
    /// ```
    pub fn shutdown(self, graceful: Duration) {
        self.shutdown.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl TandemHandle {
    /// ```
    /// use tandem_runtime::TandemRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = TandemRuntime::build("tandem-spawn", Some(1)).unwrap();
    /// let task = runtime.handle().spawn(async { 21 * 2 });
    /// assert_eq!(runtime.block_on(async move { task.await.unwrap() }), 42);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    /// Root token; cancelled on ctrl-c or [`TandemRuntime::shutdown`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel the root token on the first ctrl-c.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let shutdown = self.shutdown.clone();
        self.inner.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => tracing::info!("interrupt received, shutting down"),
                        Err(e) => tracing::warn!(error = %e, "signal handler unavailable; shutting down"),
                    }
                    shutdown.cancel();
                }
            }
        })
    }
}
