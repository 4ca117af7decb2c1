//! Replays client input into the controlled session.
//!
//! Every event stands alone: a failure is logged and the next event is
//! handled as usual.
use crate::browser::ControlledSession;
use crate::protocol::{InputEvent, SelectionChangeEvent};
use serde::Serialize;
use std::sync::Arc;
use tandem_common::TandemError;
use tandem_dom::NodePath;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Keys the client names explicitly. Anything else is a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Shift,
    Control,
    Alt,
    Meta,
    F(u8),
}

impl Key {
    pub fn from_name(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(c));
        }
        let key = match name {
            "Enter" => Key::Enter,
            "Tab" => Key::Tab,
            "Backspace" => Key::Backspace,
            "Delete" => Key::Delete,
            "Escape" => Key::Escape,
            "Insert" => Key::Insert,
            "Home" => Key::Home,
            "End" => Key::End,
            "PageUp" => Key::PageUp,
            "PageDown" => Key::PageDown,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Shift" => Key::Shift,
            "Control" => Key::Control,
            "Alt" => Key::Alt,
            "Meta" => Key::Meta,
            "Space" => Key::Char(' '),
            other => {
                let n: u8 = other.strip_prefix('F')?.parse().ok()?;
                if !(1..=12).contains(&n) {
                    return None;
                }
                Key::F(n)
            }
        };
        Some(key)
    }
}

/// Chord names and the key pressed while Control is held.
const CONTROL_CHORDS: &[(&str, Key)] = &[
    ("CtrlA", Key::Char('a')),
    ("CtrlC", Key::Char('c')),
    ("CtrlX", Key::Char('x')),
    ("CtrlV", Key::Char('v')),
    ("CtrlZ", Key::Char('z')),
    ("CtrlY", Key::Char('y')),
    ("CtrlF", Key::Char('f')),
    ("CtrlS", Key::Char('s')),
    ("CtrlR", Key::Char('r')),
    ("CtrlW", Key::Char('w')),
    ("CtrlE", Key::Char('e')),
    ("CtrlQ", Key::Char('q')),
    ("CtrlBackspace", Key::Backspace),
];

/// A key press, optionally with Control held around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub control: bool,
    pub key: Key,
}

impl KeyStroke {
    pub fn plain(key: Key) -> Self {
        Self {
            control: false,
            key,
        }
    }

    /// `None` for names that are neither a chord, a named key nor a single
    /// character.
    ///
    /// ```
    /// use tandem_mirror::input::{Key, KeyStroke};
    ///
    /// let undo = KeyStroke::from_name("CtrlZ").unwrap();
    /// assert!(undo.control);
    /// assert_eq!(undo.key, Key::Char('z'));
    /// assert_eq!(KeyStroke::from_name("q"), Some(KeyStroke::plain(Key::Char('q'))));
    /// assert_eq!(KeyStroke::from_name("Hyper"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some((_, key)) = CONTROL_CHORDS.iter().find(|(chord, _)| *chord == name) {
            return Some(Self {
                control: true,
                key: *key,
            });
        }
        Key::from_name(name).map(Self::plain)
    }
}

/// One end of a document range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionAnchor {
    pub css_path: String,
    /// Walked from the selector's element; `None` anchors at the element.
    pub node_path: Option<NodePath>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeSelection {
    pub start: SelectionAnchor,
    pub end: SelectionAnchor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPlan {
    /// Both ends inside one text control.
    Native {
        css_path: String,
        start: usize,
        end: usize,
    },
    Range(RangeSelection),
}

/// Decide how a selection change is installed. Node paths are used only
/// when both ends carry one; a malformed path abandons the event.
pub fn plan_selection(event: &SelectionChangeEvent) -> Result<SelectionPlan, TandemError> {
    if event.start_css_path == event.end_css_path {
        return Ok(SelectionPlan::Native {
            css_path: event.start_css_path.clone(),
            start: event.start_offset,
            end: event.end_offset,
        });
    }

    let present = |p: &Option<String>| p.as_deref().filter(|s| !s.is_empty()).map(str::to_owned);
    let (start_path, end_path) = match (present(&event.start_node_path), present(&event.end_node_path)) {
        (Some(start), Some(end)) => (Some(parse_path(&start)?), Some(parse_path(&end)?)),
        _ => (None, None),
    };

    Ok(SelectionPlan::Range(RangeSelection {
        start: SelectionAnchor {
            css_path: event.start_css_path.clone(),
            node_path: start_path,
            offset: event.start_offset,
        },
        end: SelectionAnchor {
            css_path: event.end_css_path.clone(),
            node_path: end_path,
            offset: event.end_offset,
        },
    }))
}

fn parse_path(raw: &str) -> Result<NodePath, TandemError> {
    raw.parse()
        .map_err(|e: tandem_dom::DomError| TandemError::SelectionAbandoned(e.to_string()))
}

pub struct InputReplicator {
    session: Arc<dyn ControlledSession>,
}

impl InputReplicator {
    pub fn new(session: Arc<dyn ControlledSession>) -> Self {
        Self { session }
    }

    pub async fn handle(&self, event: &InputEvent) -> Result<(), TandemError> {
        match event {
            InputEvent::Click(click) => {
                self.session.click(&click.css_path).await?;
                debug!(target: "mirror.input", css_path = %click.css_path, "clicked");
            }
            InputEvent::KeyPress(key) => self.press(&key.name).await?,
            InputEvent::SelectionChange(selection) => match plan_selection(selection)? {
                SelectionPlan::Native {
                    css_path,
                    start,
                    end,
                } => {
                    self.session
                        .set_native_selection(&css_path, start, end)
                        .await?
                }
                SelectionPlan::Range(range) => {
                    if !self.session.select_range(&range).await? {
                        return Err(TandemError::SelectionAbandoned(format!(
                            "anchors {} .. {} did not resolve",
                            range.start.css_path, range.end.css_path
                        )));
                    }
                }
            },
        }
        Ok(())
    }

    /// Dispatch a key; on failure type the literal name instead.
    async fn press(&self, name: &str) -> Result<(), TandemError> {
        let dispatched = match KeyStroke::from_name(name) {
            Some(stroke) => self.session.press_key(&stroke).await,
            None => Err(anyhow::anyhow!("unknown key name `{name}`")),
        };
        if let Err(e) = dispatched {
            debug!(target: "mirror.input", key = name, error = %e, "key dispatch failed; sending as text");
            self.session.send_text(name).await?;
        }
        Ok(())
    }

    /// Consume events until the channel closes or `cancel` fires.
    pub async fn run(self, mut inbound: mpsc::Receiver<InputEvent>, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = inbound.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            if let Err(e) = self.handle(&event).await {
                warn!(target: "mirror.input", error = %e, ?event, "input event not replicated");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(start: &str, end: &str, sp: Option<&str>, ep: Option<&str>) -> SelectionChangeEvent {
        SelectionChangeEvent {
            start_css_path: start.into(),
            end_css_path: end.into(),
            start_node_path: sp.map(Into::into),
            end_node_path: ep.map(Into::into),
            start_offset: 1,
            end_offset: 4,
        }
    }

    #[test]
    fn every_chord_holds_control() {
        for (name, key) in CONTROL_CHORDS {
            let stroke = KeyStroke::from_name(name).unwrap();
            assert!(stroke.control, "{name}");
            assert_eq!(stroke.key, *key);
        }
        assert_eq!(
            KeyStroke::from_name("CtrlBackspace").unwrap().key,
            Key::Backspace
        );
    }

    #[test]
    fn named_and_single_character_keys() {
        assert_eq!(KeyStroke::from_name("Enter"), Some(KeyStroke::plain(Key::Enter)));
        assert_eq!(KeyStroke::from_name("é"), Some(KeyStroke::plain(Key::Char('é'))));
        assert_eq!(KeyStroke::from_name("F5"), Some(KeyStroke::plain(Key::F(5))));
        assert_eq!(KeyStroke::from_name("F13"), None);
        assert_eq!(KeyStroke::from_name("Ctrl"), None);
        assert_eq!(KeyStroke::from_name(""), None);
    }

    #[test]
    fn same_container_uses_native_selection() {
        let plan = plan_selection(&selection("#q", "#q", Some("3:0"), Some("3:0"))).unwrap();
        assert_eq!(
            plan,
            SelectionPlan::Native {
                css_path: "#q".into(),
                start: 1,
                end: 4
            }
        );
    }

    #[test]
    fn node_paths_need_both_ends() {
        let SelectionPlan::Range(range) =
            plan_selection(&selection("#a", "#b", Some("3:0"), None)).unwrap()
        else {
            panic!("expected a range");
        };
        assert!(range.start.node_path.is_none() && range.end.node_path.is_none());

        let SelectionPlan::Range(range) =
            plan_selection(&selection("#a", "#b", Some("1:0/3:1"), Some("3:2"))).unwrap()
        else {
            panic!("expected a range");
        };
        assert_eq!(range.start.node_path.unwrap().to_string(), "1:0/3:1");
        assert_eq!(range.end.offset, 4);
    }

    #[test]
    fn malformed_paths_abandon_the_selection() {
        let err = plan_selection(&selection("#a", "#b", Some("3:x"), Some("3:0"))).unwrap_err();
        assert!(matches!(err, TandemError::SelectionAbandoned(_)));
    }

    #[test]
    fn anchors_serialize_steps_for_the_page_script() {
        let anchor = SelectionAnchor {
            css_path: "p".into(),
            node_path: Some("3:2".parse().unwrap()),
            offset: 0,
        };
        assert_eq!(
            serde_json::to_value(&anchor).unwrap(),
            serde_json::json!({"cssPath": "p", "nodePath": [{"kind": 3, "index": 2}], "offset": 0})
        );
    }
}
