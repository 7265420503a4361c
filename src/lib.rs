//! Foghorn - a bug tracking core with hierarchical event propagation.
//!
//! This library tracks bug reports filed against a tree of projects and
//! subsystems and notifies interested users when relevant events occur.
//! The moving parts:
//!
//! - [`models::tag::BugTag`] - the tag state machine that governs a report's
//!   lifecycle (which transitions are legal, which need lead privilege)
//! - [`tree::SystemTree`] - the project/subsystem hierarchy; any node can
//!   broadcast a typed signal that travels to the root and is delivered to
//!   every observer attached along the way
//! - [`notify`] - the observer pipeline and per-user mailboxes
//! - [`tracker::Tracker`] - the engine tying it all together; every mutating
//!   operation validates, mutates, then emits signals before returning
//!
//! Persistence, user management, and any front-end are out of scope; the
//! [`tracker::Tracker`] is a plain owned value that callers embed wherever
//! they need it. Callers that serve concurrent requests wrap the tracker in
//! a lock - all shared state lives behind `&mut self`.

pub mod models;
pub mod notify;
pub mod tracker;
pub mod tree;

use crate::models::tag::BugTag;

/// Library-level error type for Foghorn operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Illegal tag transition: {from} -> {to}")]
    IllegalTransition { from: BugTag, to: BugTag },

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid milestone: {0}")]
    InvalidMilestone(String),
}

/// Result type alias for Foghorn operations.
pub type Result<T> = std::result::Result<T, Error>;
