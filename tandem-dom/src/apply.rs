//! Replay of a [`Patch`] against a tree; the server-side twin of what the
//! client does with a `domchanges` message.
use crate::diff::{DiffOp, Patch};
use crate::node::Node;
use crate::DomError;

impl Patch {
    /// Apply every op in order. Stops at the first op that does not fit the
    /// tree; ops before it stay applied.
    pub fn apply(&self, root: &mut Node) -> Result<(), DomError> {
        for op in self.ops() {
            apply_op(root, op)?;
        }
        Ok(())
    }
}

fn apply_op(root: &mut Node, op: &DiffOp) -> Result<(), DomError> {
    match op {
        DiffOp::AddAttribute { route, name, value } => {
            element_at(root, route)?.attributes.set(name, value);
        }
        DiffOp::ModifyAttribute {
            route,
            name,
            new_value,
            ..
        } => {
            let el = element_at(root, route)?;
            if !el.attributes.contains(name) {
                return Err(DomError::MissingAttribute {
                    route: route.clone(),
                    name: name.clone(),
                });
            }
            el.attributes.set(name, new_value);
        }
        DiffOp::RemoveAttribute { route, name, .. } => {
            element_at(root, route)?
                .attributes
                .remove(name)
                .ok_or_else(|| DomError::MissingAttribute {
                    route: route.clone(),
                    name: name.clone(),
                })?;
        }
        DiffOp::ModifyTextElement {
            route, new_value, ..
        } => match node_at(root, route)? {
            Node::Text { data } => *data = new_value.clone(),
            _ => return Err(DomError::InvalidRoute(route.clone())),
        },
        DiffOp::ModifyComment {
            route, new_value, ..
        } => match node_at(root, route)? {
            Node::Comment { data } => *data = new_value.clone(),
            _ => return Err(DomError::InvalidRoute(route.clone())),
        },
        DiffOp::ReplaceElement {
            route, new_value, ..
        } => *node_at(root, route)? = new_value.clone(),
        DiffOp::AddElement { route, element } => {
            let (index, parent) = split_route(route)?;
            let children = &mut element_at(root, parent)?.children;
            if index > children.len() {
                return Err(DomError::InvalidRoute(route.clone()));
            }
            children.insert(index, element.clone());
        }
        DiffOp::RemoveElement { route, .. } => {
            let (index, parent) = split_route(route)?;
            let children = &mut element_at(root, parent)?.children;
            if index >= children.len() {
                return Err(DomError::InvalidRoute(route.clone()));
            }
            children.remove(index);
        }
    }
    Ok(())
}

fn split_route(route: &[usize]) -> Result<(usize, &[usize]), DomError> {
    route
        .split_last()
        .map(|(last, parent)| (*last, parent))
        .ok_or_else(|| DomError::InvalidRoute(route.to_vec()))
}

fn node_at<'a>(root: &'a mut Node, route: &[usize]) -> Result<&'a mut Node, DomError> {
    let mut node = root;
    for &idx in route {
        node = match node {
            Node::Element(el) => el
                .children
                .get_mut(idx)
                .ok_or_else(|| DomError::InvalidRoute(route.to_vec()))?,
            _ => return Err(DomError::InvalidRoute(route.to_vec())),
        };
    }
    Ok(node)
}

fn element_at<'a>(
    root: &'a mut Node,
    route: &[usize],
) -> Result<&'a mut crate::node::Element, DomError> {
    node_at(root, route)?
        .as_element_mut()
        .ok_or_else(|| DomError::NotAnElement(route.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::node::Element;

    #[test]
    fn replays_attribute_and_child_edits() {
        let old: Node = Element::new("div")
            .with_attribute("class", "a")
            .with_attribute("hidden", "")
            .with_child(Node::text("x"))
            .into();
        let new: Node = Element::new("div")
            .with_attribute("class", "b")
            .with_attribute("id", "main")
            .with_child(Node::text("y"))
            .with_child(Element::new("br"))
            .into();

        let mut replay = old.clone();
        diff(&old, &new).apply(&mut replay).unwrap();
        assert_eq!(replay, new);
    }

    #[test]
    fn out_of_range_route_is_rejected() {
        let mut root: Node = Element::new("div").into();
        let patch = Patch::new(vec![DiffOp::RemoveElement {
            route: vec![3],
            element: Node::text("gone"),
        }]);
        assert_eq!(
            patch.apply(&mut root),
            Err(DomError::InvalidRoute(vec![3]))
        );
    }
}
