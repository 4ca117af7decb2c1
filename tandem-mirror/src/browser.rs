use crate::input::{KeyStroke, RangeSelection};
use anyhow::Result;
use serde::Deserialize;

/// Joins the selectors of frames nested in frames, outermost first:
/// `#outer >>> iframe:nth-of-type(2)`.
pub const FRAME_PATH_SEPARATOR: &str = " >>> ";

/// Markup of one reachable nested frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameCapture {
    /// Stable CSS selector of the `iframe` element in its parent document,
    /// prefixed by its ancestor frames' selectors for frames within frames.
    pub selector: String,
    /// Full document markup of the frame.
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCapture {
    pub main_markup: String,
    /// Frames in discovery order.
    #[serde(default)]
    pub frames: Vec<FrameCapture>,
}

/// Result of one snapshot attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Ready(PageCapture),
    /// Mid-navigation or not queryable; skip the cycle and retry.
    Unavailable,
}

/// A browser session driven on behalf of one client.
///
/// Handles are shared between the diff loop and the input task, so every
/// operation takes `&self`.
#[async_trait::async_trait]
pub trait ControlledSession: Send + Sync {
    /// Snapshot the main document and every reachable frame, scripts removed.
    async fn capture(&self) -> Capture;

    async fn current_url(&self) -> Result<String>;

    /// Wait (bounded) for `css_path` and click it.
    async fn click(&self, css_path: &str) -> Result<()>;

    async fn press_key(&self, stroke: &KeyStroke) -> Result<()>;

    /// Type `text` into the focused element.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Set `selectionStart`/`selectionEnd` on a text control.
    async fn set_native_selection(&self, css_path: &str, start: usize, end: usize) -> Result<()>;

    /// Install a document range. `Ok(false)` when an anchor did not resolve.
    async fn select_range(&self, range: &RangeSelection) -> Result<bool>;
}
