//! JSON frames exchanged over the patch channel.
//!
//! Every frame is `{"event": <name>, "data": {...}}`.
use serde::{Deserialize, Serialize};
use tandem_dom::Patch;

/// Client → server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum InputEvent {
    Click(ClickEvent),
    KeyPress(KeyPressEvent),
    SelectionChange(SelectionChangeEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub css_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPressEvent {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionChangeEvent {
    pub start_css_path: String,
    pub end_css_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_node_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_node_path: Option<String>,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "domchanges")]
    DomChanges(PatchBatch),
    #[serde(rename = "updateBrowserUrl")]
    UpdateBrowserUrl { url: String },
    #[serde(rename = "redir")]
    Redirect { url: String },
}

impl ServerEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Changes to the head and body of one scope. A missing side did not change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Patch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bodydiv: Option<Patch>,
}

impl ScopeChanges {
    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.bodydiv.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameChanges {
    pub selector: String,
    #[serde(flatten)]
    pub changes: ScopeChanges,
}

/// Everything that changed in one diff cycle: main document first, then
/// frames in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<ScopeChanges>,
    #[serde(default)]
    pub iframes: Vec<FrameChanges>,
}

impl PatchBatch {
    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.iframes.is_empty()
    }
}
