//! Attribute-name filtering for outgoing patches.
//!
//! Framework-internal and otherwise odd attribute names (`:class`, `@click`,
//! `[ngModel]`, names with dots) are noise to the client and some of them
//! cannot be set through `setAttribute` at all. Only names matching
//! `^[A-Za-z][A-Za-z0-9_-]*$` survive.
use crate::diff::{DiffOp, Patch};
use crate::node::Node;
use regex::Regex;
use std::sync::OnceLock;

static ATTRIBUTE_NAME: OnceLock<Regex> = OnceLock::new();

pub fn is_valid_attribute_name(name: &str) -> bool {
    ATTRIBUTE_NAME
        .get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").expect("static pattern"))
        .is_match(name)
}

impl Patch {
    /// Drop attribute ops with invalid names and strip invalid attribute
    /// names from nodes carried by the remaining ops.
    pub fn sanitized(self) -> Patch {
        let ops = self
            .into_ops()
            .into_iter()
            .filter(|op| op.attribute_name().map_or(true, is_valid_attribute_name))
            .map(|mut op| {
                match &mut op {
                    DiffOp::ReplaceElement {
                        old_value,
                        new_value,
                        ..
                    } => {
                        strip_invalid_attributes(old_value);
                        strip_invalid_attributes(new_value);
                    }
                    DiffOp::AddElement { element, .. } | DiffOp::RemoveElement { element, .. } => {
                        strip_invalid_attributes(element)
                    }
                    _ => {}
                }
                op
            })
            .collect();
        Patch::new(ops)
    }
}

fn strip_invalid_attributes(node: &mut Node) {
    if let Node::Element(el) = node {
        el.attributes.retain(is_valid_attribute_name);
        el.children.iter_mut().for_each(strip_invalid_attributes);
    }
}
