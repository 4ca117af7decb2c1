//! Last-sent snapshots and the per-cycle diff.
use crate::browser::PageCapture;
use crate::protocol::{FrameChanges, PatchBatch, ScopeChanges};
use std::collections::HashMap;
use tandem_dom::diff::diff;
use tandem_dom::parse::parse_document;
use tandem_dom::{Element, Node, Patch};

/// One scope (a head or a body wrapper) as last sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSnapshot {
    markup: String,
    tree: Node,
}

impl ScopeSnapshot {
    /// `<head></head>` / `<body></body>`.
    pub fn empty(tag: &str) -> Self {
        Self::from_element(Element::new(tag))
    }

    pub fn from_element(element: Element) -> Self {
        let tree = Node::Element(element);
        Self {
            markup: tree.to_markup(),
            tree,
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn tree(&self) -> &Node {
        &self.tree
    }

    /// Adopt `next` if its markup differs and return the sanitized patch that
    /// takes the client from the old tree to the new one.
    pub fn advance(&mut self, next: ScopeSnapshot) -> Option<Patch> {
        if self.markup == next.markup {
            return None;
        }
        let patch = diff(&self.tree, &next.tree).sanitized();
        *self = next;
        if patch.is_empty() {
            tracing::debug!(target: "mirror.diff", "change consisted of filtered attributes only");
            return None;
        }
        Some(patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub head: ScopeSnapshot,
    pub body: ScopeSnapshot,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            head: ScopeSnapshot::empty("head"),
            body: ScopeSnapshot::empty("body"),
        }
    }
}

impl Snapshot {
    /// Parse a full document; scripts are dropped on the way.
    pub fn from_markup(markup: &str) -> Self {
        let doc = parse_document(markup);
        Self {
            head: ScopeSnapshot::from_element(doc.head),
            body: ScopeSnapshot::from_element(doc.body),
        }
    }

    pub fn advance(&mut self, next: Snapshot) -> Option<ScopeChanges> {
        let changes = ScopeChanges {
            head: self.head.advance(next.head),
            bodydiv: self.body.advance(next.body),
        };
        (!changes.is_empty()).then_some(changes)
    }
}

/// Tracks what the client currently holds for the main document and every
/// frame seen so far.
#[derive(Debug, Default)]
pub struct DiffEngine {
    main: Snapshot,
    frames: HashMap<String, Snapshot>,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main(&self) -> &Snapshot {
        &self.main
    }

    pub fn frame(&self, selector: &str) -> Option<&Snapshot> {
        self.frames.get(selector)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Diff a capture against the last-sent state. `None` when nothing
    /// changed. Frames missing from the capture keep their records.
    pub fn cycle(&mut self, capture: &PageCapture) -> Option<PatchBatch> {
        let main = self.main.advance(Snapshot::from_markup(&capture.main_markup));

        let mut iframes = Vec::new();
        for frame in &capture.frames {
            let record = self.frames.entry(frame.selector.clone()).or_default();
            if let Some(changes) = record.advance(Snapshot::from_markup(&frame.markup)) {
                iframes.push(FrameChanges {
                    selector: frame.selector.clone(),
                    changes,
                });
            }
        }

        let batch = PatchBatch { main, iframes };
        if batch.is_empty() {
            return None;
        }
        tracing::debug!(
            target: "mirror.diff",
            main = batch.main.is_some(),
            frames = batch.iframes.len(),
            "scopes changed"
        );
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_dom::DiffOp;

    #[test]
    fn empty_scopes_match_the_initial_baseline() {
        let snap = Snapshot::default();
        assert_eq!(snap.head.markup(), "<head></head>");
        assert_eq!(snap.body.markup(), "<body></body>");
    }

    #[test]
    fn unchanged_scope_yields_nothing() {
        let mut snap = Snapshot::from_markup("<body class=\"a\"><p>x</p></body>");
        assert!(snap
            .advance(Snapshot::from_markup("<body class=\"a\"><p>x</p></body>"))
            .is_none());
    }

    #[test]
    fn body_attributes_are_part_of_the_scope() {
        let mut snap = Snapshot::from_markup("<body><p>x</p></body>");
        let changes = snap
            .advance(Snapshot::from_markup("<body class=\"dark\"><p>x</p></body>"))
            .unwrap();
        assert!(changes.head.is_none());
        let body = changes.bodydiv.unwrap();
        assert!(matches!(
            body.ops(),
            [DiffOp::AddAttribute { route, name, .. }] if route.is_empty() && name == "class"
        ));
    }

    #[test]
    fn filtered_only_changes_still_move_the_baseline() {
        let mut scope = ScopeSnapshot::from_element(Element::new("body"));
        let next = ScopeSnapshot::from_element(Element::new("body").with_attribute(":bind", "x"));
        assert!(scope.advance(next.clone()).is_none());
        assert_eq!(scope, next);
    }
}
