//! Structural tree diff.
//!
//! Ops are addressed by a [`Route`] of child indices from the diffed root
//! and are meant to be applied in order: each route is valid against the
//! tree as left by the ops before it. Applying a whole [`Patch`] to the old
//! tree yields a tree equal to the new one.
use crate::node::{Element, Node};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Child indices from the diffed root to a node.
pub type Route = Vec<usize>;

/// Upper bound on the LCS table for one child list; larger lists are paired
/// by position.
const LCS_CELL_LIMIT: usize = 250_000;

/// One edit. The discriminant is carried in `action` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DiffOp {
    AddAttribute {
        route: Route,
        name: String,
        value: String,
    },
    ModifyAttribute {
        route: Route,
        name: String,
        old_value: String,
        new_value: String,
    },
    RemoveAttribute {
        route: Route,
        name: String,
        value: String,
    },
    ModifyTextElement {
        route: Route,
        old_value: String,
        new_value: String,
    },
    ModifyComment {
        route: Route,
        old_value: String,
        new_value: String,
    },
    ReplaceElement {
        route: Route,
        old_value: Node,
        new_value: Node,
    },
    /// Insert `element` so that it ends up at `route`.
    AddElement { route: Route, element: Node },
    RemoveElement { route: Route, element: Node },
}

impl DiffOp {
    pub fn route(&self) -> &Route {
        match self {
            DiffOp::AddAttribute { route, .. }
            | DiffOp::ModifyAttribute { route, .. }
            | DiffOp::RemoveAttribute { route, .. }
            | DiffOp::ModifyTextElement { route, .. }
            | DiffOp::ModifyComment { route, .. }
            | DiffOp::ReplaceElement { route, .. }
            | DiffOp::AddElement { route, .. }
            | DiffOp::RemoveElement { route, .. } => route,
        }
    }

    /// Attribute name for attribute-level ops.
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            DiffOp::AddAttribute { name, .. }
            | DiffOp::ModifyAttribute { name, .. }
            | DiffOp::RemoveAttribute { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Ordered list of [`DiffOp`]s for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    ops: Vec<DiffOp>,
}

impl Patch {
    pub fn new(ops: Vec<DiffOp>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[DiffOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DiffOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Diff two trees.
pub fn diff(old: &Node, new: &Node) -> Patch {
    let mut ops = Vec::new();
    let mut route = Vec::new();
    diff_node(old, new, &mut route, &mut ops);
    Patch { ops }
}

fn diff_node(old: &Node, new: &Node, route: &mut Route, ops: &mut Vec<DiffOp>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Node::Element(a), Node::Element(b)) if a.tag == b.tag => {
            if !diff_attributes(a, b, route, ops) {
                ops.push(DiffOp::ReplaceElement {
                    route: route.clone(),
                    old_value: old.clone(),
                    new_value: new.clone(),
                });
                return;
            }
            diff_children(&a.children, &b.children, route, ops);
        }
        (Node::Text { data: a }, Node::Text { data: b }) => {
            ops.push(DiffOp::ModifyTextElement {
                route: route.clone(),
                old_value: a.clone(),
                new_value: b.clone(),
            });
        }
        (Node::Comment { data: a }, Node::Comment { data: b }) => {
            ops.push(DiffOp::ModifyComment {
                route: route.clone(),
                old_value: a.clone(),
                new_value: b.clone(),
            });
        }
        _ => ops.push(DiffOp::ReplaceElement {
            route: route.clone(),
            old_value: old.clone(),
            new_value: new.clone(),
        }),
    }
}

/// Emit attribute ops, or return `false` when the new order cannot be
/// reached by in-place edits plus appends.
fn diff_attributes(a: &Element, b: &Element, route: &Route, ops: &mut Vec<DiffOp>) -> bool {
    let surviving = a.attributes.names().filter(|n| b.attributes.contains(n));
    let added = b.attributes.names().filter(|n| !a.attributes.contains(n));
    if !surviving.chain(added).eq(b.attributes.names()) {
        return false;
    }

    for (name, value) in a.attributes.iter() {
        if !b.attributes.contains(name) {
            ops.push(DiffOp::RemoveAttribute {
                route: route.clone(),
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }
    for (name, new_value) in b.attributes.iter() {
        match a.attributes.get(name) {
            Some(old_value) if old_value != new_value => ops.push(DiffOp::ModifyAttribute {
                route: route.clone(),
                name: name.to_string(),
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
            }),
            Some(_) => {}
            None => ops.push(DiffOp::AddAttribute {
                route: route.clone(),
                name: name.to_string(),
                value: new_value.to_string(),
            }),
        }
    }
    true
}

fn diff_children(old: &[Node], new: &[Node], route: &mut Route, ops: &mut Vec<DiffOp>) {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut cursor = prefix;
    let (mut oi, mut ni) = (0, 0);
    for (ao, an) in common_subsequence(old_mid, new_mid) {
        cursor = diff_gap(&old_mid[oi..ao], &new_mid[ni..an], cursor, route, ops);
        // the anchor itself is unchanged
        cursor += 1;
        oi = ao + 1;
        ni = an + 1;
    }
    diff_gap(&old_mid[oi..], &new_mid[ni..], cursor, route, ops);
}

/// Reconcile one unmatched run of children starting at `cursor`; returns
/// the index just past the run in the updated child list.
fn diff_gap(
    old: &[Node],
    new: &[Node],
    cursor: usize,
    route: &mut Route,
    ops: &mut Vec<DiffOp>,
) -> usize {
    let paired = old.len().min(new.len());
    for k in 0..paired {
        route.push(cursor + k);
        diff_node(&old[k], &new[k], route, ops);
        route.pop();
    }
    for node in &old[paired..] {
        route.push(cursor + paired);
        ops.push(DiffOp::RemoveElement {
            route: route.clone(),
            element: node.clone(),
        });
        route.pop();
    }
    for (k, node) in new.iter().enumerate().skip(paired) {
        route.push(cursor + k);
        ops.push(DiffOp::AddElement {
            route: route.clone(),
            element: node.clone(),
        });
        route.pop();
    }
    cursor + new.len()
}

/// Index pairs of a longest common subsequence of equal subtrees.
fn common_subsequence(old: &[Node], new: &[Node]) -> Vec<(usize, usize)> {
    let (n, m) = (old.len(), new.len());
    if n == 0 || m == 0 || n.saturating_mul(m) > LCS_CELL_LIMIT {
        return Vec::new();
    }

    let old_h: Vec<u64> = old.iter().map(fingerprint).collect();
    let new_h: Vec<u64> = new.iter().map(fingerprint).collect();
    // Skip the table when the runs share nothing at all.
    let new_set: HashSet<u64> = new_h.iter().copied().collect();
    if !old_h.iter().any(|h| new_set.contains(h)) {
        return Vec::new();
    }

    let same = |i: usize, j: usize| old_h[i] == new_h[j] && old[i] == new[j];

    // table[i][j] = LCS length of old[i..] and new[j..]
    let mut table = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if same(i, j) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(table[0][0] as usize);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if same(i, j) {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

fn fingerprint(node: &Node) -> u64 {
    let mut hasher = DefaultHasher::new();
    node.hash(&mut hasher);
    hasher.finish()
}
