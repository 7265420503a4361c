//! Typed event records dispatched through the system tree.
//!
//! A signal is created once per event, never mutated, and read by every
//! observer it passes through on its way to the root.

use crate::models::tag::BugTag;
use crate::models::{Milestone, ReportId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of a signal, mirrored by the registration types observers
/// are keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    BugReportChange,
    BugReportSpecificTag,
    CreateComment,
    CreateBugReport,
    AchievedMilestone,
    SystemVersionUpdate,
    ProjectFork,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::BugReportChange => "bugreport_change",
            SignalKind::BugReportSpecificTag => "bugreport_specific_tag",
            SignalKind::CreateComment => "create_comment",
            SignalKind::CreateBugReport => "create_bugreport",
            SignalKind::AchievedMilestone => "achieved_milestone",
            SignalKind::SystemVersionUpdate => "system_version_update",
            SignalKind::ProjectFork => "project_fork",
        };
        write!(f, "{}", s)
    }
}

/// One immutable event record.
///
/// Each variant carries the payload observers need to render a notification;
/// nothing here references live tree or report state, so a signal stays
/// valid for the whole traversal regardless of what delivery does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// A report changed (tag transition, assignment, proposal).
    BugReportChange {
        report: ReportId,
        title: String,
        tag: BugTag,
    },
    /// A report received a specific new tag. Emitted alongside
    /// `BugReportChange` on every accepted transition.
    BugReportSpecificTag {
        report: ReportId,
        title: String,
        tag: BugTag,
    },
    /// A comment was added to a report.
    CreateComment {
        report: ReportId,
        title: String,
        text: String,
    },
    /// A report was filed.
    CreateBugReport { report: ReportId, title: String },
    /// A node declared a new achieved milestone.
    AchievedMilestone { system: String, milestone: Milestone },
    /// A project bumped its version.
    SystemVersionUpdate { system: String, version: u32 },
    /// A project was forked.
    ProjectFork { project: String, fork: String },
}

impl Signal {
    /// The discriminant observers filter on.
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::BugReportChange { .. } => SignalKind::BugReportChange,
            Signal::BugReportSpecificTag { .. } => SignalKind::BugReportSpecificTag,
            Signal::CreateComment { .. } => SignalKind::CreateComment,
            Signal::CreateBugReport { .. } => SignalKind::CreateBugReport,
            Signal::AchievedMilestone { .. } => SignalKind::AchievedMilestone,
            Signal::SystemVersionUpdate { .. } => SignalKind::SystemVersionUpdate,
            Signal::ProjectFork { .. } => SignalKind::ProjectFork,
        }
    }
}
