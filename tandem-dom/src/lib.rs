//! Virtual DOM used by the mirroring engine.
//!
//! Markup captured from the controlled browser is converted into an owned
//! [`Node`] tree, serialized back into canonical markup, and compared tree to
//! tree. The resulting [`Patch`] is what the thin client applies to its own
//! copy of the page.
//!
//! - [`parse`]: markup → [`Document`] (head and body trees, scripts dropped)
//! - [`serialize`]: canonical HTML serialization of a [`Node`]
//! - [`diff`]: structural tree diff producing a [`Patch`]
//! - [`apply`]: replay of a [`Patch`] against a tree
//! - [`sanitize`]: attribute-name filtering of patches
//! - [`path`]: relative `(nodeKind, index)` paths used by text selection
//!
//! # Examples
//!
//! ```rust
//! use tandem_dom::{diff, parse::parse_document};
//!
//! let old = parse_document("<html><body><p>one</p></body></html>");
//! let new = parse_document("<html><body><p>two</p></body></html>");
//!
//! let patch = diff::diff(&old.body_node(), &new.body_node());
//! assert_eq!(patch.len(), 1);
//!
//! let mut replay = old.body_node();
//! patch.apply(&mut replay).unwrap();
//! assert_eq!(replay.to_markup(), "<body><p>two</p></body>");
//! ```

pub mod apply;
pub mod diff;
pub mod node;
pub mod parse;
pub mod path;
pub mod sanitize;
pub mod serialize;

pub use diff::{DiffOp, Patch, Route};
pub use node::{Attributes, Element, Node};
pub use parse::Document;
pub use path::{NodePath, PathStep};

/// Errors raised while replaying patches or reading node paths.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// A route did not lead to a node in the target tree.
    #[error("route {0:?} does not address a node")]
    InvalidRoute(Vec<usize>),

    /// An operation expected an element but found a text or comment node.
    #[error("route {0:?} does not address an element")]
    NotAnElement(Vec<usize>),

    /// An attribute operation referenced an attribute that is not present.
    #[error("attribute `{name}` missing at route {route:?}")]
    MissingAttribute { route: Vec<usize>, name: String },

    /// A relative node path could not be parsed.
    #[error("invalid node path `{0}`")]
    InvalidPath(String),
}
