//! The tracking engine.
//!
//! A [`Tracker`] owns the system tree, the bug report store, and the
//! notification hub. Every mutating operation follows the same shape:
//! validate against the state machine and permission gates, mutate, then
//! emit the resulting signals into the hierarchy before returning. Signal
//! propagation is synchronous and always runs to completion.

use crate::models::tag::{BugTag, SelfTransition};
use crate::models::{Actor, BugReport, Comment, Milestone, NodeId, ReportId};
use crate::notify::{
    Mailbox, Notification, NotificationHub, ObservableId, Observer, ObserverKind, Registration,
    Signal,
};
use crate::tree::{NodeKind, SystemTree};
use crate::{Error, Result};
use tracing::debug;

/// Policy knobs carried by the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackerConfig {
    /// Whether a tag may transition to itself. Defaults to allowing it for
    /// non-terminal tags.
    pub self_transition: SelfTransition,
}

/// Parameters for filing a new bug report. The issuer is the acting user.
#[derive(Debug, Clone)]
pub struct NewBugReport {
    pub title: String,
    pub description: String,
    /// Subsystem the report is filed against; must not be a project root
    pub subsystem: NodeId,
    /// Reports this one depends on
    pub depends_on: Vec<ReportId>,
    /// Milestone the fix is aimed at
    pub target_milestone: Option<Milestone>,
    /// Steps to reproduce
    pub reproduction_steps: Option<String>,
}

impl NewBugReport {
    /// Minimal report parameters against one subsystem.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        subsystem: NodeId,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            subsystem,
            depends_on: Vec::new(),
            target_milestone: None,
            reproduction_steps: None,
        }
    }
}

/// The engine tying the tree, the report store, and the hub together.
#[derive(Debug, Default)]
pub struct Tracker {
    tree: SystemTree,
    reports: Vec<Option<BugReport>>,
    hub: NotificationHub,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Read access to the hierarchy.
    pub fn tree(&self) -> &SystemTree {
        &self.tree
    }

    // === Hierarchy ===

    /// Create a root project.
    pub fn add_project(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        lead_developer: Option<String>,
    ) -> Result<NodeId> {
        self.tree.add_project(name, description, lead_developer)
    }

    /// Create a subsystem under `parent`.
    pub fn add_subsystem(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<NodeId> {
        self.tree.add_subsystem(parent, name, description)
    }

    /// Declare an achieved milestone on a node and broadcast it.
    pub fn declare_milestone(&mut self, node: NodeId, milestone: Milestone) -> Result<()> {
        self.tree.declare_milestone(node, milestone.clone())?;
        let system = self.tree.node(node)?.name.clone();
        self.signal(node, &Signal::AchievedMilestone { system, milestone })
    }

    /// Bump a project's version and broadcast the update.
    pub fn set_project_version(&mut self, project: NodeId, version: u32) -> Result<()> {
        let node = self.tree.node_mut(project)?;
        let NodeKind::Project {
            version: current, ..
        } = &mut node.kind
        else {
            return Err(Error::InvalidInput(format!(
                "{} is not a project and carries no version",
                project
            )));
        };
        if version <= *current {
            return Err(Error::InvalidInput(format!(
                "version {} does not advance the current version {}",
                version, *current
            )));
        }
        *current = version;
        let system = node.name.clone();
        self.signal(project, &Signal::SystemVersionUpdate { system, version })
    }

    /// Fork a project: deep-copy its subtree (structure and milestones, not
    /// observers, not reports) and broadcast the fork at the source.
    pub fn fork_project(
        &mut self,
        project: NodeId,
        new_name: impl Into<String>,
    ) -> Result<NodeId> {
        let fork = self.tree.fork_project(project, new_name)?;
        let signal = Signal::ProjectFork {
            project: self.tree.node(project)?.name.clone(),
            fork: self.tree.node(fork)?.name.clone(),
        };
        self.signal(project, &signal)?;
        Ok(fork)
    }

    /// Delete a subsystem and everything under it.
    ///
    /// Registrations against every removed node and every report filed
    /// under the subtree are torn down first; skipping that teardown would
    /// leave dangling observers, which is an invariant violation rather
    /// than a recoverable condition.
    pub fn remove_subsystem(&mut self, node: NodeId) -> Result<()> {
        if self.tree.node(node)?.is_project() {
            return Err(Error::InvalidInput(format!(
                "{} is a project root, not a removable subsystem",
                node
            )));
        }
        let mut doomed_nodes = vec![node];
        doomed_nodes.extend(self.tree.descendants(node)?);

        let doomed_reports: Vec<ReportId> = self
            .reports
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let report = slot.as_ref()?;
                doomed_nodes.contains(&report.subsystem).then_some(ReportId(index))
            })
            .collect();

        for report in &doomed_reports {
            self.delete_registrations_for_observable(ObservableId::Report(*report))?;
            self.reports[report.0] = None;
        }
        for doomed in &doomed_nodes {
            self.hub.remove_registrations_for(ObservableId::Node(*doomed));
        }
        self.tree.remove_subtree(node)?;
        debug!(%node, reports = doomed_reports.len(), "removed subsystem");
        Ok(())
    }

    // === Signal propagation ===

    /// Broadcast a signal at `node`. The event travels to the root, then
    /// observers are invoked level by level from the root down to `node`;
    /// each observer that matches appends a rendered notification to its
    /// user's mailbox, non-matches are silently ignored.
    pub fn signal(&mut self, node: NodeId, signal: &Signal) -> Result<()> {
        let chain = self.tree.chain_to_root(node)?;
        debug!(origin = %node, kind = %signal.kind(), levels = chain.len(), "propagating signal");
        for level in chain.iter().rev() {
            let observers = &self.tree.node(*level)?.observers;
            for observer in observers {
                if let Some(text) = observer.render(signal) {
                    self.hub.deliver(&observer.user, text);
                }
            }
        }
        Ok(())
    }

    /// Broadcast a report-origin signal: up the subsystem chain first, then
    /// to the observers registered directly on the report.
    fn signal_report(&mut self, id: ReportId, signal: &Signal) -> Result<()> {
        let subsystem = self.report(id)?.subsystem;
        self.signal(subsystem, signal)?;
        let report = self
            .reports
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::NotFound(format!("bug report {}", id)))?;
        for observer in &report.observers {
            if let Some(text) = observer.render(signal) {
                self.hub.deliver(&observer.user, text);
            }
        }
        Ok(())
    }

    // === Bug reports ===

    /// Look up a report.
    pub fn report(&self, id: ReportId) -> Result<&BugReport> {
        self.reports
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::NotFound(format!("bug report {}", id)))
    }

    fn report_mut(&mut self, id: ReportId) -> Result<&mut BugReport> {
        self.reports
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::NotFound(format!("bug report {}", id)))
    }

    /// Every report filed under any direct or indirect subsystem of
    /// `project`, in creation order.
    pub fn reports_for_project(&self, project: NodeId) -> Result<Vec<ReportId>> {
        let nodes = self.tree.descendants(project)?;
        Ok(self
            .reports
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let report = slot.as_ref()?;
                nodes.contains(&report.subsystem).then_some(ReportId(index))
            })
            .collect())
    }

    /// File a new report. The report starts with the New tag and a
    /// `CreateBugReport` signal fires at its subsystem.
    pub fn create_report(&mut self, new: NewBugReport, actor: &Actor) -> Result<ReportId> {
        if actor.id.trim().is_empty() {
            return Err(Error::InvalidInput("issuer id must not be empty".to_string()));
        }
        if new.title.trim().is_empty() {
            return Err(Error::InvalidInput("report title must not be empty".to_string()));
        }
        if new.description.trim().is_empty() {
            return Err(Error::InvalidInput(
                "report description must not be empty".to_string(),
            ));
        }
        if self.tree.node(new.subsystem)?.is_project() {
            return Err(Error::InvalidInput(
                "reports are filed against subsystems, not project roots".to_string(),
            ));
        }
        for dependency in &new.depends_on {
            self.report(*dependency)?;
        }

        let mut report = BugReport::new(
            new.title,
            new.description,
            new.subsystem,
            actor.id.clone(),
        );
        report.depends_on = new.depends_on;
        report.target_milestone = new.target_milestone;
        report.reproduction_steps = new.reproduction_steps;

        let id = ReportId(self.reports.len());
        let title = report.title.clone();
        let subsystem = report.subsystem;
        self.reports.push(Some(report));
        debug!(report = %id, %subsystem, "filed bug report");
        self.signal(subsystem, &Signal::CreateBugReport { report: id, title })?;
        Ok(id)
    }

    /// Request a tag transition on a report.
    ///
    /// Succeeds iff the target is structurally reachable from the current
    /// tag and, for lead-gated targets, the actor is the lead developer of
    /// the report's project. On success the tag is replaced wholesale and a
    /// `BugReportChange` plus a `BugReportSpecificTag` signal fire at the
    /// report's subsystem. On failure the report is left untouched.
    pub fn request_transition(
        &mut self,
        id: ReportId,
        target: BugTag,
        actor: &Actor,
    ) -> Result<()> {
        let report = self.report(id)?;
        let current = report.tag;
        let subsystem = report.subsystem;
        let title = report.title.clone();

        if !current.can_transition_to(target, self.config.self_transition) {
            return Err(Error::IllegalTransition {
                from: current,
                to: target,
            });
        }
        if target.requires_lead() {
            let lead = self.tree.lead_of(subsystem)?;
            if lead.as_deref() != Some(actor.id.as_str()) {
                return Err(Error::NotAuthorized(format!(
                    "setting the tag {} requires the project's lead developer",
                    target
                )));
            }
        }

        self.report_mut(id)?.tag = target;
        debug!(report = %id, from = %current, to = %target, actor = %actor.id, "tag transition");
        self.signal_report(
            id,
            &Signal::BugReportChange {
                report: id,
                title: title.clone(),
                tag: target,
            },
        )?;
        self.signal_report(
            id,
            &Signal::BugReportSpecificTag {
                report: id,
                title,
                tag: target,
            },
        )
    }

    /// Record which report a Duplicate-tagged report duplicates. Legal only
    /// while the tag is Duplicate, and a report never duplicates itself.
    pub fn mark_duplicate_of(&mut self, id: ReportId, original: ReportId) -> Result<()> {
        if id == original {
            return Err(Error::InvalidInput(
                "a report cannot duplicate itself".to_string(),
            ));
        }
        self.report(original)?;
        let report = self.report_mut(id)?;
        if report.tag != BugTag::Duplicate {
            return Err(Error::InvalidInput(format!(
                "duplicate link requires the duplicate tag, report carries {}",
                report.tag
            )));
        }
        report.duplicate_of = Some(original);
        Ok(())
    }

    /// Add a comment to a report, or a reply to an existing comment
    /// addressed by its index path. Fires `CreateComment`.
    pub fn add_comment(
        &mut self,
        id: ReportId,
        parent_path: &[usize],
        text: impl Into<String>,
        actor: &Actor,
    ) -> Result<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("comment text must not be empty".to_string()));
        }
        let comment = Comment::new(text.clone(), actor.id.clone());
        let report = self.report_mut(id)?;
        let title = report.title.clone();
        if parent_path.is_empty() {
            report.comments.push(comment);
        } else {
            report
                .comment_mut(parent_path)
                .ok_or_else(|| {
                    Error::NotFound(format!("comment {:?} on report {}", parent_path, id))
                })?
                .replies
                .push(comment);
        }
        self.signal_report(
            id,
            &Signal::CreateComment {
                report: id,
                title,
                text,
            },
        )
    }

    /// Assign a developer to a report. Lead-only; assigning the same
    /// developer twice is a no-op. Fires `BugReportChange`.
    pub fn assign_developer(
        &mut self,
        id: ReportId,
        developer: impl Into<String>,
        actor: &Actor,
    ) -> Result<()> {
        let developer = developer.into();
        if developer.trim().is_empty() {
            return Err(Error::InvalidInput("assignee id must not be empty".to_string()));
        }
        let subsystem = self.report(id)?.subsystem;
        let lead = self.tree.lead_of(subsystem)?;
        if lead.as_deref() != Some(actor.id.as_str()) {
            return Err(Error::NotAuthorized(
                "assigning developers requires the project's lead developer".to_string(),
            ));
        }
        let report = self.report_mut(id)?;
        if report.assignees.contains(&developer) {
            return Ok(());
        }
        report.assignees.push(developer);
        let title = report.title.clone();
        let tag = report.tag;
        self.signal_report(
            id,
            &Signal::BugReportChange {
                report: id,
                title,
                tag,
            },
        )
    }

    /// Propose a test for a report. Developer-only, and the current tag
    /// must allow test proposals. Fires `BugReportChange`.
    pub fn propose_test(
        &mut self,
        id: ReportId,
        test: impl Into<String>,
        actor: &Actor,
    ) -> Result<()> {
        self.propose(id, test.into(), actor, Proposal::Test)
    }

    /// Propose a patch for a report. Developer-only, and the current tag
    /// must allow patch proposals. Fires `BugReportChange`.
    pub fn propose_patch(
        &mut self,
        id: ReportId,
        patch: impl Into<String>,
        actor: &Actor,
    ) -> Result<()> {
        self.propose(id, patch.into(), actor, Proposal::Patch)
    }

    fn propose(&mut self, id: ReportId, text: String, actor: &Actor, what: Proposal) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("proposal text must not be empty".to_string()));
        }
        if !actor.developer {
            return Err(Error::NotAuthorized(format!(
                "proposing a {} requires a developer",
                what.noun()
            )));
        }
        let report = self.report_mut(id)?;
        let allowed = match what {
            Proposal::Test => report.tag.allows_tests(),
            Proposal::Patch => report.tag.allows_patches(),
        };
        if !allowed {
            return Err(Error::InvalidInput(format!(
                "the tag {} does not accept proposed {}s",
                report.tag,
                what.noun()
            )));
        }
        match what {
            Proposal::Test => report.proposed_tests.push(text),
            Proposal::Patch => report.proposed_patches.push(text),
        }
        let title = report.title.clone();
        let tag = report.tag;
        self.signal_report(
            id,
            &Signal::BugReportChange {
                report: id,
                title,
                tag,
            },
        )
    }

    // === Notifications ===

    /// The mailbox for `user`, created empty on first access.
    pub fn mailbox_for_user(&mut self, user: &str) -> &Mailbox {
        self.hub.mailbox_for_user(user)
    }

    /// Register `user` for events of `kind` on `observable`. Constructs the
    /// matching observer variant, attaches it (idempotently), and records
    /// the registration for later teardown. Registering also creates the
    /// user's mailbox if it does not exist yet.
    pub fn register_observer(
        &mut self,
        user: &str,
        kind: ObserverKind,
        observable: ObservableId,
    ) -> Result<()> {
        if user.trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be empty".to_string()));
        }
        self.hub.mailbox_for_user(user);
        let observer = Observer::new(user, kind);
        let attached = match observable {
            ObservableId::Node(node) => self.tree.attach(node, observer.clone())?,
            ObservableId::Report(id) => {
                let report = self.report_mut(id)?;
                if report.observers.contains(&observer) {
                    false
                } else {
                    report.observers.push(observer.clone());
                    true
                }
            }
        };
        // A duplicate registration neither attaches nor records twice.
        if attached {
            self.hub.record(observable, &observer);
        }
        Ok(())
    }

    /// Detach and discard every observer registered against `observable`,
    /// across all users. Every observable-deletion path must call this
    /// before discarding the observable itself.
    pub fn delete_registrations_for_observable(
        &mut self,
        observable: ObservableId,
    ) -> Result<()> {
        let removed = self.hub.remove_registrations_for(observable);
        for observer in removed {
            match observable {
                ObservableId::Node(node) => {
                    // The node may already be gone; nothing left to detach then.
                    if self.tree.node(node).is_ok() {
                        self.tree.detach(node, &observer)?;
                    }
                }
                ObservableId::Report(id) => {
                    if let Some(report) = self.reports.get_mut(id.0).and_then(Option::as_mut) {
                        report.observers.retain(|attached| attached != &observer);
                    }
                }
            }
        }
        Ok(())
    }

    /// Live registrations made by `user`.
    pub fn registrations_for_user(&self, user: &str) -> Vec<&Registration> {
        self.hub.registrations_for_user(user)
    }

    /// The `count` most recent notifications for `user`, newest first. Read
    /// flags are left untouched.
    pub fn get_notifications(&self, user: &str, count: usize) -> Vec<&Notification> {
        self.hub.get_notifications(user, count)
    }

    /// Mark `user`'s notification at `index` (0 = newest) as read.
    pub fn mark_as_read(&mut self, user: &str, index: usize) -> Result<()> {
        self.hub.mark_as_read(user, index)
    }
}

#[derive(Debug, Clone, Copy)]
enum Proposal {
    Test,
    Patch,
}

impl Proposal {
    fn noun(self) -> &'static str {
        match self {
            Proposal::Test => "test",
            Proposal::Patch => "patch",
        }
    }
}
