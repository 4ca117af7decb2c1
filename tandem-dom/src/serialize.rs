//! Canonical HTML serialization.
//!
//! Follows the HTML fragment serialization rules: void elements have no end
//! tag, text inside raw-text elements is written verbatim, everything else
//! is escaped. Two trees serialize to the same string only if they are equal.
use crate::node::{Element, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

impl Node {
    /// Serialize this node (and its subtree) as HTML.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_node(&mut out, self, false);
        out
    }
}

impl Element {
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, self);
        out
    }
}

fn write_node(out: &mut String, node: &Node, raw_parent: bool) {
    match node {
        Node::Element(el) => write_element(out, el),
        Node::Text { data } if raw_parent => out.push_str(data),
        Node::Text { data } => escape_text(out, data),
        Node::Comment { data } => {
            out.push_str("<!--");
            out.push_str(data);
            out.push_str("-->");
        }
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in el.attributes.iter() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(out, value);
        out.push('"');
    }
    out.push('>');

    if is_void(&el.tag) {
        return;
    }

    let raw = RAW_TEXT_ELEMENTS.contains(&el.tag.as_str());
    for child in &el.children {
        write_node(out, child, raw);
    }

    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements_have_no_end_tag() {
        let el = Element::new("input").with_attribute("value", "a\"b");
        assert_eq!(el.to_markup(), r#"<input value="a&quot;b">"#);
    }

    #[test]
    fn text_is_escaped_outside_raw_text_elements() {
        let p = Element::new("p").with_child(Node::text("a < b & c"));
        assert_eq!(p.to_markup(), "<p>a &lt; b &amp; c</p>");

        let style = Element::new("style").with_child(Node::text("a > b {}"));
        assert_eq!(style.to_markup(), "<style>a > b {}</style>");
    }

    #[test]
    fn comments_are_kept() {
        let div = Element::new("div").with_child(Node::comment(" marker "));
        assert_eq!(div.to_markup(), "<div><!-- marker --></div>");
    }
}
