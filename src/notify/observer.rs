//! Observer variants - filter and delivery fused into one predicate.
//!
//! An observer is bound to one watched observable and one user's mailbox.
//! When a signal passes its node, [`Observer::render`] either produces the
//! notification text (match) or `None` (silently ignored). There is no
//! separate filter step.

use crate::models::tag::BugTag;
use crate::models::Milestone;
use crate::notify::signal::{Signal, SignalKind};
use serde::{Deserialize, Serialize};

/// What an observer watches for, plus any sub-filter it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObserverKind {
    /// Any change to a bug report.
    BugReportChange,
    /// A bug report receiving one specific tag.
    BugReportSpecificTag { tag: BugTag },
    /// A new comment.
    CreateComment,
    /// A new bug report.
    CreateBugReport,
    /// Any achieved milestone.
    Milestone,
    /// One specific achieved milestone.
    SpecificMilestone { milestone: Milestone },
    /// A project version bump.
    SystemVersionUpdate,
}

impl ObserverKind {
    /// The signal discriminant this observer reacts to.
    pub fn signal_kind(&self) -> SignalKind {
        match self {
            ObserverKind::BugReportChange => SignalKind::BugReportChange,
            ObserverKind::BugReportSpecificTag { .. } => SignalKind::BugReportSpecificTag,
            ObserverKind::CreateComment => SignalKind::CreateComment,
            ObserverKind::CreateBugReport => SignalKind::CreateBugReport,
            ObserverKind::Milestone | ObserverKind::SpecificMilestone { .. } => {
                SignalKind::AchievedMilestone
            }
            ObserverKind::SystemVersionUpdate => SignalKind::SystemVersionUpdate,
        }
    }
}

/// A registered watcher: one user, one kind of event.
///
/// Equality is structural; attaching an identical observer twice is a no-op
/// at the observable, so one user never receives the same event twice
/// through duplicate registrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    /// Id of the user whose mailbox receives the rendered text
    pub user: String,

    /// Event filter
    pub kind: ObserverKind,
}

impl Observer {
    pub fn new(user: impl Into<String>, kind: ObserverKind) -> Self {
        Self {
            user: user.into(),
            kind,
        }
    }

    /// Render the notification text for a matching signal, or `None` when
    /// the signal is not this observer's concern.
    pub fn render(&self, signal: &Signal) -> Option<String> {
        match (&self.kind, signal) {
            (ObserverKind::BugReportChange, Signal::BugReportChange { title, tag, .. }) => Some(
                format!("The bug report '{}' has changed; it now carries the tag {}", title, tag),
            ),
            (
                ObserverKind::BugReportSpecificTag { tag: wanted },
                Signal::BugReportSpecificTag { title, tag, .. },
            ) if tag == wanted => Some(format!(
                "The bug report '{}' has received the tag {}",
                title, tag
            )),
            (ObserverKind::CreateComment, Signal::CreateComment { title, text, .. }) => Some(
                format!("New comment on bug report '{}': {}", title, text),
            ),
            (ObserverKind::CreateBugReport, Signal::CreateBugReport { title, .. }) => {
                Some(format!("A new bug report '{}' was filed", title))
            }
            (ObserverKind::Milestone, Signal::AchievedMilestone { system, milestone }) => Some(
                format!("The system '{}' has achieved milestone {}", system, milestone),
            ),
            (
                ObserverKind::SpecificMilestone { milestone: wanted },
                Signal::AchievedMilestone { system, milestone },
            ) if milestone == wanted => Some(format!(
                "The system '{}' has achieved milestone {}",
                system, milestone
            )),
            (
                ObserverKind::SystemVersionUpdate,
                Signal::SystemVersionUpdate { system, version },
            ) => Some(format!(
                "The system '{}' was updated to version {}",
                system, version
            )),
            _ => None,
        }
    }
}
