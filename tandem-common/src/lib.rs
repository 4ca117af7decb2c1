//! Common types and utilities shared across Tandem crates.
//!
//! This crate defines the shared error type and the observability helpers
//! used throughout the Tandem workspace. It stays dependency‑light so the
//! DOM, mirroring, driver and server crates can all depend on it.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`TandemError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use tandem_common::TandemError;
//!
//! let err = TandemError::SelectionAbandoned("end anchor".into());
//! assert_eq!(err.to_string(), "Selection abandoned: end anchor");
//! ```
use uuid::Uuid;

pub mod observability;

/// Error types used across the Tandem system.
#[derive(thiserror::Error, Debug)]
pub enum TandemError {
    /// The controlled browser (WebDriver or DevTools) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The client channel went away; this ends a session.
    #[error("Channel closed")]
    ChannelClosed,

    /// A referenced session is not (or no longer) live.
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// A selection anchor could not be resolved in the controlled page.
    #[error("Selection abandoned: {0}")]
    SelectionAbandoned(String),
}

/// Convenient alias for results that use [`TandemError`].
pub type Result<T> = std::result::Result<T, TandemError>;
