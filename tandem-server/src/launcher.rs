use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tandem_config::BrowserConfig;
use tandem_drivers::tandem_browser::driver::TandemDriver;
use tandem_drivers::tandem_browser::interception::{self, InterceptorHandle};
use tandem_drivers::tandem_browser::navigation::{self, NavigationWatch};
use tandem_mirror::intercept::{ContentCache, InterceptPattern};
use tandem_mirror::ControlledSession;
use tokio::sync::mpsc;
use tracing::warn;

/// Starts one controlled browser per client.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn LaunchedBrowser>>;
}

#[async_trait]
pub trait LaunchedBrowser: Send + Sync {
    fn session(&self) -> Arc<dyn ControlledSession>;

    /// Main-frame navigation URLs as the browser reports them. Taken once;
    /// `None` leaves location tracking to polling.
    fn take_navigations(&mut self) -> Option<mpsc::Receiver<String>> {
        None
    }

    /// Stop interception and close the browser.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Chrome through WebDriver, opened on the configured target with response
/// interception attached.
pub struct WebDriverLauncher {
    browser: BrowserConfig,
    click_timeout: Duration,
    patterns: Vec<InterceptPattern>,
    cache: Arc<ContentCache>,
}

impl WebDriverLauncher {
    pub fn new(
        browser: BrowserConfig,
        click_timeout: Duration,
        patterns: Vec<InterceptPattern>,
        cache: Arc<ContentCache>,
    ) -> Self {
        Self {
            browser,
            click_timeout,
            patterns,
            cache,
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn LaunchedBrowser>> {
        let driver = Arc::new(TandemDriver::new(&self.browser, self.click_timeout).await?);

        // Interception goes on before the first navigation so the target's
        // own scripts are already covered.
        let interceptor = match interception::attach(
            driver.debug_port(),
            &self.patterns,
            self.cache.clone(),
        )
        .await
        {
            Ok(handle) => handle,
            Err(e) => {
                close_after_failed_launch(driver.close()).await;
                return Err(e);
            }
        };

        let (watch, navigations) = match navigation::watch(driver.debug_port()).await {
            Ok((watch, rx)) => (Some(watch), Some(rx)),
            Err(e) => {
                warn!(target: "server.session", error = %e, "navigation events unavailable; polling only");
                (None, None)
            }
        };

        if let Err(e) = driver.goto(&self.browser.target_url).await {
            close_after_failed_launch(driver.close()).await;
            return Err(e);
        }

        Ok(Box::new(WebDriverBrowser {
            driver,
            interceptor,
            watch,
            navigations,
        }))
    }
}

/// Logs a failed close; the launch error is what the caller reports.
async fn close_after_failed_launch(close: impl Future<Output = Result<()>>) -> bool {
    match close.await {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "server.session", error = %e, "browser not closed after failed launch");
            false
        }
    }
}

struct WebDriverBrowser {
    driver: Arc<TandemDriver>,
    interceptor: Option<InterceptorHandle>,
    watch: Option<NavigationWatch>,
    navigations: Option<mpsc::Receiver<String>>,
}

#[async_trait]
impl LaunchedBrowser for WebDriverBrowser {
    fn session(&self) -> Arc<dyn ControlledSession> {
        self.driver.clone()
    }

    fn take_navigations(&mut self) -> Option<mpsc::Receiver<String>> {
        self.navigations.take()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let WebDriverBrowser {
            driver,
            interceptor,
            watch,
            ..
        } = *self;
        if let Some(interceptor) = interceptor {
            interceptor.shutdown();
        }
        if let Some(watch) = watch {
            watch.shutdown();
        }
        driver.close().await
    }
}
