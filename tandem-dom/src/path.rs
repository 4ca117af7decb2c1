//! Relative node paths used to anchor text selections.
//!
//! A path is a `/`-separated list of `nodeType:childIndex` steps walked from
//! a container element through its child nodes, e.g. `1:0/3:2` = "first
//! child, which must be an element, then its third child, which must be a
//! text node".
use crate::node::Node;
use crate::DomError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Expected DOM `nodeType` of the child.
    pub kind: u16,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Walk the path from `root`. `None` as soon as a step is out of range
    /// or lands on a node of the wrong kind.
    ///
    /// The controlled page resolves anchors with an in-page script
    /// (`walk` in the driver's range-selection script) that applies these
    /// same rules; this is the server-side reference used to check paths
    /// against a mirrored tree.
    pub fn resolve<'a>(&self, root: &'a Node) -> Option<&'a Node> {
        self.0.iter().try_fold(root, |node, step| {
            node.children()
                .get(step.index)
                .filter(|child| child.kind() == step.kind)
        })
    }
}

impl FromStr for NodePath {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomError::InvalidPath(s.to_string());
        if s.is_empty() {
            return Err(invalid());
        }
        s.split('/')
            .map(|step| {
                let (kind, index) = step.split_once(':').ok_or_else(invalid)?;
                Ok(PathStep {
                    kind: kind.trim().parse().map_err(|_| invalid())?,
                    index: index.trim().parse().map_err(|_| invalid())?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(NodePath)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}:{}", step.kind, step.index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Element, COMMENT_NODE, TEXT_NODE};

    fn fixture() -> Node {
        Element::new("div")
            .with_child(Node::text("lead "))
            .with_child(
                Element::new("b")
                    .with_child(Node::text("bold"))
                    .with_child(Node::comment("c")),
            )
            .with_child(Node::text(" tail"))
            .into()
    }

    #[test]
    fn parses_and_prints_steps() {
        let path: NodePath = "1:1/3:0".parse().unwrap();
        assert_eq!(
            path.steps(),
            &[
                PathStep { kind: 1, index: 1 },
                PathStep { kind: 3, index: 0 }
            ]
        );
        assert_eq!(path.to_string(), "1:1/3:0");
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "1", "a:1", "1:-1", "1:0/", "1:0//3:1"] {
            assert!(bad.parse::<NodePath>().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn valid_steps_resolve_to_the_same_node_every_time() {
        let root = fixture();
        let path: NodePath = "1:1/3:0".parse().unwrap();
        let first = path.resolve(&root).unwrap();
        let second = path.resolve(&root).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first, &Node::text("bold"));
        assert_eq!(
            NodePath::new(vec![
                PathStep { kind: 1, index: 1 },
                PathStep { kind: COMMENT_NODE, index: 1 }
            ])
            .resolve(&root),
            Some(&Node::comment("c"))
        );
    }

    #[test]
    fn out_of_range_or_wrong_kind_yields_none() {
        let root = fixture();
        assert!("1:7".parse::<NodePath>().unwrap().resolve(&root).is_none());
        assert!(NodePath::new(vec![PathStep {
            kind: TEXT_NODE,
            index: 1
        }])
        .resolve(&root)
        .is_none());
    }

    #[test]
    fn empty_path_is_the_container() {
        let root = fixture();
        assert!(std::ptr::eq(NodePath::default().resolve(&root).unwrap(), &root));
    }
}
