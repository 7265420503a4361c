//! Bug tag state machine.
//!
//! A bug report carries exactly one tag at a time. Tags are stateless value
//! objects keyed solely by discriminant; the per-tag data (legal successor
//! set, privilege gate, impact multiplier, ...) lives in exhaustive `match`
//! tables here so the whole machine stays checkable by the compiler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a bug report.
///
/// Transition matrix:
///
/// ```text
/// New         -> UnderReview
/// UnderReview -> Assigned | Resolved | Closed | Duplicate | NotABug
/// Assigned    -> UnderReview | Resolved | Closed | Duplicate | NotABug
/// Resolved    -> Closed | Duplicate | NotABug
/// Closed, Duplicate, NotABug -> (terminal)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugTag {
    #[default]
    New,
    UnderReview,
    Assigned,
    Resolved,
    Closed,
    Duplicate,
    NotABug,
}

/// Whether a tag may transition to itself even though the transition matrix
/// does not list it as its own successor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfTransition {
    /// `request_transition(t, t)` succeeds for non-terminal tags.
    #[default]
    Allow,
    /// Self-transitions follow the matrix like any other pair.
    Reject,
}

impl BugTag {
    /// The set of tags this tag may legally transition to.
    pub fn legal_next(self) -> &'static [BugTag] {
        match self {
            BugTag::New => &[BugTag::UnderReview],
            BugTag::UnderReview => &[
                BugTag::Assigned,
                BugTag::Resolved,
                BugTag::Closed,
                BugTag::Duplicate,
                BugTag::NotABug,
            ],
            BugTag::Assigned => &[
                BugTag::UnderReview,
                BugTag::Resolved,
                BugTag::Closed,
                BugTag::Duplicate,
                BugTag::NotABug,
            ],
            BugTag::Resolved => &[BugTag::Closed, BugTag::Duplicate, BugTag::NotABug],
            BugTag::Closed | BugTag::Duplicate | BugTag::NotABug => &[],
        }
    }

    /// Returns true if no transition out of this tag ever succeeds.
    pub fn is_terminal(self) -> bool {
        self.legal_next().is_empty()
    }

    /// Returns true if this tag marks in-progress work that may step back
    /// to review.
    pub fn is_revertible(self) -> bool {
        matches!(self, BugTag::Assigned)
    }

    /// Returns true if tests may be proposed while a report carries this tag.
    pub fn allows_tests(self) -> bool {
        matches!(self, BugTag::UnderReview | BugTag::Assigned)
    }

    /// Returns true if patches may be proposed while a report carries this tag.
    pub fn allows_patches(self) -> bool {
        matches!(self, BugTag::UnderReview | BugTag::Assigned)
    }

    /// Weight this tag contributes when a report's impact is aggregated.
    /// Terminal tags no longer weigh on a subsystem.
    pub fn impact_multiplier(self) -> f64 {
        match self {
            BugTag::New => 3.0,
            BugTag::UnderReview | BugTag::Assigned => 2.0,
            BugTag::Resolved => 1.0,
            BugTag::Closed | BugTag::Duplicate | BugTag::NotABug => 0.0,
        }
    }

    /// Returns true if setting this tag requires the acting user to be the
    /// lead developer of the report's project.
    pub fn requires_lead(self) -> bool {
        matches!(self, BugTag::Closed | BugTag::Duplicate | BugTag::NotABug)
    }

    /// Structural legality of a transition to `target`.
    ///
    /// Permission gating is layered on top by the tracker; this only answers
    /// whether the matrix (plus the self-transition policy) permits the move.
    pub fn can_transition_to(self, target: BugTag, policy: SelfTransition) -> bool {
        if self == target {
            return match policy {
                SelfTransition::Allow => !self.is_terminal(),
                SelfTransition::Reject => self.legal_next().contains(&target),
            };
        }
        self.legal_next().contains(&target)
    }

    /// Get all tags.
    pub fn all() -> &'static [BugTag] {
        &[
            BugTag::New,
            BugTag::UnderReview,
            BugTag::Assigned,
            BugTag::Resolved,
            BugTag::Closed,
            BugTag::Duplicate,
            BugTag::NotABug,
        ]
    }
}

impl fmt::Display for BugTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BugTag::New => "new",
            BugTag::UnderReview => "under_review",
            BugTag::Assigned => "assigned",
            BugTag::Resolved => "resolved",
            BugTag::Closed => "closed",
            BugTag::Duplicate => "duplicate",
            BugTag::NotABug => "not_a_bug",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for BugTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "new" => Ok(BugTag::New),
            "under_review" => Ok(BugTag::UnderReview),
            "assigned" => Ok(BugTag::Assigned),
            "resolved" => Ok(BugTag::Resolved),
            "closed" => Ok(BugTag::Closed),
            "duplicate" => Ok(BugTag::Duplicate),
            "not_a_bug" => Ok(BugTag::NotABug),
            _ => Err(format!("Unknown bug tag: {}", s)),
        }
    }
}
