//! Markup → [`Node`] conversion backed by `scraper` (html5ever).
use crate::node::{Element, Node};
use scraper::{ElementRef, Html, Node as HtmlNode};

/// Elements whose content never reaches a snapshot.
const STRIPPED_ELEMENTS: &[&str] = &["script"];

/// The two scopes of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub head: Element,
    pub body: Element,
}

impl Document {
    pub fn head_node(&self) -> Node {
        Node::Element(self.head.clone())
    }

    pub fn body_node(&self) -> Node {
        Node::Element(self.body.clone())
    }
}

/// Parse a full HTML document, dropping script elements.
///
/// html5ever always synthesizes `head` and `body`; a frameset document has
/// no body and yields an empty one.
pub fn parse_document(markup: &str) -> Document {
    let html = Html::parse_document(markup);
    let root = html.root_element();

    let mut head = None;
    let mut body = None;
    for child in root.children() {
        let Some(el) = ElementRef::wrap(child) else {
            continue;
        };
        match el.value().name() {
            "head" if head.is_none() => head = Some(convert_element(el)),
            "body" if body.is_none() => body = Some(convert_element(el)),
            _ => {}
        }
    }

    Document {
        head: head.unwrap_or_else(|| Element::new("head")),
        body: body.unwrap_or_else(|| Element::new("body")),
    }
}

fn convert_element(el: ElementRef<'_>) -> Element {
    let mut out = Element::new(el.value().name());
    for (name, value) in el.value().attrs.iter() {
        out.attributes
            .set(attribute_name(name.prefix.as_deref(), &name.local), &**value);
    }

    for child in el.children() {
        match child.value() {
            HtmlNode::Element(e) if STRIPPED_ELEMENTS.contains(&e.name()) => {}
            HtmlNode::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    out.children.push(Node::Element(convert_element(child_el)));
                }
            }
            HtmlNode::Text(text) => push_text(&mut out.children, &text.text),
            HtmlNode::Comment(comment) => out.children.push(Node::comment(&*comment.comment)),
            _ => {}
        }
    }
    out
}

/// Foreign-content attributes keep their prefix (`xlink:href`, `xml:lang`,
/// `xmlns:xlink`) so they stay distinct from unprefixed ones.
fn attribute_name(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

// Removing a script can leave two text runs side by side; keep them merged
// so the tree matches what a reparse of its serialization would give.
fn push_text(children: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text { data }) = children.last_mut() {
        data.push_str(text);
    } else {
        children.push(Node::text(text));
    }
}
