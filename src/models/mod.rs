//! Data models for Foghorn entities.
//!
//! This module defines the core data structures:
//! - `BugReport` - defects filed against a subsystem, driven by the tag
//!   state machine in [`tag`]
//! - `Comment` - tree-shaped discussion; every comment owns its replies
//! - `Milestone` - dotted version-style progress marker (`M1.2.3`)
//! - `Actor` - explicit acting-user context passed into gated operations
//! - `NodeId` / `ReportId` - arena indices into the system tree and the
//!   report store

pub mod tag;

use crate::notify::observer::Observer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tag::BugTag;

/// Index of a node in the system tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys-{}", self.0)
    }
}

/// Index of a bug report in the report store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub usize);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "br-{}", self.0)
    }
}

/// An achieved milestone, ordered lexicographically by its numeric parts.
///
/// The empty milestone (`M0`) is the minimum and the default for fresh
/// nodes, so every declared milestone compares greater or equal to it.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Milestone(Vec<u32>);

impl Milestone {
    /// Create a milestone from its dotted numeric parts.
    pub fn new(parts: Vec<u32>) -> Self {
        Self(parts)
    }

    /// The dotted numeric parts, major first.
    pub fn parts(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "M0");
        }
        let dotted: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "M{}", dotted.join("."))
    }
}

impl std::str::FromStr for Milestone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.strip_prefix('M').unwrap_or(s);
        if digits.is_empty() || digits == "0" {
            return Ok(Milestone::default());
        }
        let parts = digits
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| format!("Invalid milestone: {}", s)))
            .collect::<std::result::Result<Vec<u32>, String>>()?;
        Ok(Milestone(parts))
    }
}

/// A single comment; replies are owned by the comment they answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Comment text
    pub text: String,

    /// Id of the user who wrote it
    pub author: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Replies to this comment, in insertion order
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Create a new comment with no replies.
    pub fn new(text: String, author: String) -> Self {
        Self {
            text,
            author,
            created_at: Utc::now(),
            replies: Vec::new(),
        }
    }
}

/// A defect filed against a subsystem.
///
/// The current tag is replaced wholesale on every accepted transition; it is
/// never mutated in place. The subsystem a report belongs to is fixed at
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugReport {
    /// Report title
    pub title: String,

    /// Detailed description
    pub description: String,

    /// The subsystem this report is filed against (fixed at creation)
    pub subsystem: NodeId,

    /// Current lifecycle tag
    pub tag: BugTag,

    /// Id of the user who filed the report
    pub issuer: String,

    /// Developers assigned to the report, in assignment order
    #[serde(default)]
    pub assignees: Vec<String>,

    /// Reports this report depends on
    #[serde(default)]
    pub depends_on: Vec<ReportId>,

    /// Discussion thread; each comment owns its replies
    #[serde(default)]
    pub comments: Vec<Comment>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Milestone the fix is aimed at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_milestone: Option<Milestone>,

    /// The report this one duplicates; set only while the tag is Duplicate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<ReportId>,

    /// Steps to reproduce
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reproduction_steps: Option<String>,

    /// Proposed tests, accepted only while the tag allows them
    #[serde(default)]
    pub proposed_tests: Vec<String>,

    /// Proposed patches, accepted only while the tag allows them
    #[serde(default)]
    pub proposed_patches: Vec<String>,

    /// Observers registered directly on this report
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observers: Vec<Observer>,
}

impl BugReport {
    /// Create a new report carrying the New tag.
    pub fn new(title: String, description: String, subsystem: NodeId, issuer: String) -> Self {
        Self {
            title,
            description,
            subsystem,
            tag: BugTag::default(),
            issuer,
            assignees: Vec::new(),
            depends_on: Vec::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
            target_milestone: None,
            duplicate_of: None,
            reproduction_steps: None,
            proposed_tests: Vec::new(),
            proposed_patches: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Walk the comment tree along an index path. An empty path addresses
    /// the report itself (returns None); otherwise each element picks a
    /// child at that level.
    pub fn comment_mut(&mut self, path: &[usize]) -> Option<&mut Comment> {
        let (first, rest) = path.split_first()?;
        let mut current = self.comments.get_mut(*first)?;
        for index in rest {
            current = current.replies.get_mut(*index)?;
        }
        Some(current)
    }

    /// Immutable counterpart of [`BugReport::comment_mut`].
    pub fn comment(&self, path: &[usize]) -> Option<&Comment> {
        let (first, rest) = path.split_first()?;
        let mut current = self.comments.get(*first)?;
        for index in rest {
            current = current.replies.get(*index)?;
        }
        Some(current)
    }
}

/// Explicit acting-user context.
///
/// Foghorn never tracks a logged-in user; whoever drives the tracker passes
/// the actor into each gated operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id
    pub id: String,

    /// Whether this user is a developer (may be assigned, may propose
    /// tests and patches)
    pub developer: bool,
}

impl Actor {
    /// A developer actor.
    pub fn developer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            developer: true,
        }
    }

    /// A plain issuer actor.
    pub fn issuer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            developer: false,
        }
    }
}
