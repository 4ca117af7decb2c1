use crate::tandem_browser::launch::{capabilities, free_port};
use crate::tandem_browser::scripts::PageScripts;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fantoccini::actions::{InputSource, KeyAction, KeyActions};
use fantoccini::key::Key as WebKey;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Value};
use std::time::Duration;
use tandem_config::BrowserConfig;
use tandem_mirror::browser::{Capture, ControlledSession, PageCapture};
use tandem_mirror::input::{Key, KeyStroke, RangeSelection};
use tracing::debug;

/// Thin wrapper around a `fantoccini` WebDriver client driving one Chrome
/// instance with its own DevTools port.
pub struct TandemDriver {
    pub client: Client,
    debug_port: u16,
    click_timeout: Duration,
}

impl TandemDriver {
    /// Start a browser through the configured WebDriver endpoint.
    pub async fn new(config: &BrowserConfig, click_timeout: Duration) -> Result<Self> {
        let debug_port = free_port()?;
        let client = ClientBuilder::native()
            .capabilities(capabilities(config, debug_port))
            .connect(&config.webdriver_url)
            .await
            .with_context(|| format!("connect to WebDriver at {}", config.webdriver_url))?;
        debug!(target: "driver.webdriver", debug_port, "browser started");

        Ok(Self {
            client,
            debug_port,
            click_timeout,
        })
    }

    /// DevTools port of this browser.
    pub fn debug_port(&self) -> u16 {
        self.debug_port
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigate to {url}"))?;
        Ok(())
    }

    /// Close the underlying browser session.
    pub async fn close(&self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}

fn web_key(key: Key) -> char {
    match key {
        Key::Char(c) => c,
        Key::Enter => WebKey::Enter.into(),
        Key::Tab => WebKey::Tab.into(),
        Key::Backspace => WebKey::Backspace.into(),
        Key::Delete => WebKey::Delete.into(),
        Key::Escape => WebKey::Escape.into(),
        Key::Insert => WebKey::Insert.into(),
        Key::Home => WebKey::Home.into(),
        Key::End => WebKey::End.into(),
        Key::PageUp => WebKey::PageUp.into(),
        Key::PageDown => WebKey::PageDown.into(),
        Key::ArrowUp => WebKey::Up.into(),
        Key::ArrowDown => WebKey::Down.into(),
        Key::ArrowLeft => WebKey::Left.into(),
        Key::ArrowRight => WebKey::Right.into(),
        Key::Shift => WebKey::Shift.into(),
        Key::Control => WebKey::Control.into(),
        Key::Alt => WebKey::Alt.into(),
        Key::Meta => WebKey::Meta.into(),
        Key::F(n) => function_key(n).into(),
    }
}

fn function_key(n: u8) -> WebKey {
    match n {
        1 => WebKey::F1,
        2 => WebKey::F2,
        3 => WebKey::F3,
        4 => WebKey::F4,
        5 => WebKey::F5,
        6 => WebKey::F6,
        7 => WebKey::F7,
        8 => WebKey::F8,
        9 => WebKey::F9,
        10 => WebKey::F10,
        11 => WebKey::F11,
        _ => WebKey::F12,
    }
}

/// Key-down/key-up sequence, with Control wrapped around chords.
fn key_actions(stroke: &KeyStroke) -> KeyActions {
    let value = web_key(stroke.key);
    let control: char = WebKey::Control.into();
    let mut actions = KeyActions::new("keyboard".to_string());
    if stroke.control {
        actions = actions.then(KeyAction::Down { value: control });
    }
    actions = actions
        .then(KeyAction::Down { value })
        .then(KeyAction::Up { value });
    if stroke.control {
        actions = actions.then(KeyAction::Up { value: control });
    }
    actions
}

#[async_trait]
impl ControlledSession for TandemDriver {
    async fn capture(&self) -> Capture {
        let value = match self.client.execute(PageScripts::capture(), vec![]).await {
            Ok(Value::Null) => return Capture::Unavailable,
            Ok(value) => value,
            Err(e) => {
                debug!(target: "driver.webdriver", error = %e, "capture script failed");
                return Capture::Unavailable;
            }
        };
        match serde_json::from_value::<PageCapture>(value) {
            Ok(page) => Capture::Ready(page),
            Err(e) => {
                debug!(target: "driver.webdriver", error = %e, "unexpected capture shape");
                Capture::Unavailable
            }
        }
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn click(&self, css_path: &str) -> Result<()> {
        let element = self
            .client
            .wait()
            .at_most(self.click_timeout)
            .for_element(Locator::Css(css_path))
            .await
            .with_context(|| format!("no element matches `{css_path}`"))?;
        element.click().await?;
        Ok(())
    }

    async fn press_key(&self, stroke: &KeyStroke) -> Result<()> {
        self.client.perform_actions(key_actions(stroke)).await?;
        self.client.release_actions().await?;
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let focused = self.client.active_element().await?;
        focused.send_keys(text).await?;
        Ok(())
    }

    async fn set_native_selection(&self, css_path: &str, start: usize, end: usize) -> Result<()> {
        let found = self
            .client
            .execute(
                PageScripts::native_selection(),
                vec![json!(css_path), json!(start), json!(end)],
            )
            .await?;
        if found.as_bool() != Some(true) {
            return Err(anyhow!("`{css_path}` is not a text control"));
        }
        Ok(())
    }

    async fn select_range(&self, range: &RangeSelection) -> Result<bool> {
        let installed = self
            .client
            .execute(PageScripts::range_selection(), vec![serde_json::to_value(range)?])
            .await?;
        Ok(installed.as_bool() == Some(true))
    }
}
