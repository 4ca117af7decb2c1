use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// DOM `nodeType` of an element.
pub const ELEMENT_NODE: u16 = 1;
/// DOM `nodeType` of a text node.
pub const TEXT_NODE: u16 = 3;
/// DOM `nodeType` of a comment.
pub const COMMENT_NODE: u16 = 8;

/// A node in the mirrored tree.
///
/// Serialized as `{"type": "element", "tag": .., "attributes": {..}, "children": [..]}`,
/// `{"type": "text", "data": ..}` or `{"type": "comment", "data": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Element(Element),
    Text { data: String },
    Comment { data: String },
}

impl Node {
    pub fn text(data: impl Into<String>) -> Self {
        Node::Text { data: data.into() }
    }

    pub fn comment(data: impl Into<String>) -> Self {
        Node::Comment { data: data.into() }
    }

    /// The DOM `nodeType` number for this node.
    pub fn kind(&self) -> u16 {
        match self {
            Node::Element(_) => ELEMENT_NODE,
            Node::Text { .. } => TEXT_NODE,
            Node::Comment { .. } => COMMENT_NODE,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Children of an element; text and comment nodes have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            _ => &[],
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// An element with its attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::default(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// Ordered attribute list.
///
/// Order matters for canonical serialization, so this is a list rather than
/// a hash map; on the wire it is a JSON object whose key order follows the
/// list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k == name)
    }

    /// Overwrite in place when present, append otherwise.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|(k, _)| keep(k));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::default();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of attribute names to values")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Attributes, M::Error> {
                let mut attrs = Attributes::default();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    attrs.set(k, v);
                }
                Ok(attrs)
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_keep_insertion_order_on_the_wire() {
        let el = Element::new("a")
            .with_attribute("zeta", "1")
            .with_attribute("alpha", "2");
        let json = serde_json::to_string(&Node::from(el)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"element","tag":"a","attributes":{"zeta":"1","alpha":"2"},"children":[]}"#
        );
    }

    #[test]
    fn set_overwrites_without_moving() {
        let mut attrs: Attributes = [("a", "1"), ("b", "2")].into_iter().collect();
        attrs.set("a", "3");
        assert_eq!(attrs.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(attrs.get("a"), Some("3"));
    }

    #[test]
    fn node_kinds_follow_dom_numbering() {
        assert_eq!(Node::from(Element::new("div")).kind(), 1);
        assert_eq!(Node::text("x").kind(), 3);
        assert_eq!(Node::comment("x").kind(), 8);
    }
}
