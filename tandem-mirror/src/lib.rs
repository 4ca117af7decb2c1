//! Browser-mirroring synchronization engine.
//!
//! A controlled browser session is polled for snapshots, each snapshot is
//! diffed against the last one sent, and the resulting patches are pushed to
//! the client. Input coming back from the client is replayed into the
//! controlled session, and selected network responses are cached and
//! rewritten before the session sees them.
//!
//! - [`browser`]: the [`ControlledSession`] seam implemented by drivers
//! - [`snapshot`]: per-scope snapshots and the [`DiffEngine`]
//! - [`protocol`]: JSON events exchanged with the client
//! - [`input`]: key mapping, selection planning and the [`InputReplicator`]
//! - [`navigation`]: relative location reporting
//! - [`intercept`]: resource kinds, content transforms and the [`ContentCache`]
//! - [`script_format`]: the re-indenting script transform
//! - [`session`]: the capture → diff → send loop
//!
//! # Examples
//!
//! ```rust
//! use tandem_mirror::browser::{FrameCapture, PageCapture};
//! use tandem_mirror::DiffEngine;
//!
//! let mut engine = DiffEngine::new();
//! let capture = PageCapture {
//!     main_markup: "<html><head></head><body><p>hi</p></body></html>".into(),
//!     frames: vec![FrameCapture {
//!         selector: "#login".into(),
//!         markup: "<html><body>frame</body></html>".into(),
//!     }],
//! };
//!
//! let batch = engine.cycle(&capture).expect("first capture differs from the empty baseline");
//! assert!(batch.main.as_ref().unwrap().bodydiv.is_some());
//! assert_eq!(batch.iframes[0].selector, "#login");
//!
//! // Nothing changed, nothing to send.
//! assert!(engine.cycle(&capture).is_none());
//! ```

pub mod browser;
pub mod input;
pub mod intercept;
pub mod navigation;
pub mod protocol;
pub mod script_format;
pub mod session;
pub mod snapshot;

pub use browser::{Capture, ControlledSession};
pub use input::InputReplicator;
pub use intercept::ContentCache;
pub use snapshot::DiffEngine;
