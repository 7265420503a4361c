//! Integration tests for the notification pipeline.
//!
//! These tests drive the public `Tracker` API end to end:
//! - registrations on subsystems, projects, and reports
//! - signal propagation from a leaf subsystem to the root
//! - mailbox retrieval order and read flags
//! - teardown when observables disappear

use foghorn::models::tag::BugTag;
use foghorn::models::{Actor, Milestone, NodeId, ReportId};
use foghorn::notify::{ObservableId, ObserverKind};
use foghorn::tracker::{NewBugReport, Tracker};

struct World {
    tracker: Tracker,
    project: NodeId,
    word: NodeId,
    excel: NodeId,
    report: ReportId,
    dev: Actor,
    issuer: Actor,
}

/// Office suite with two subsystems and one open report against `word`.
fn world() -> World {
    let mut tracker = Tracker::new();
    let dev = Actor::developer("dave");
    let issuer = Actor::issuer("ida");
    let project = tracker
        .add_project("office", "Office suite", Some("lea".to_string()))
        .unwrap();
    let word = tracker
        .add_subsystem(project, "word", "Word processor")
        .unwrap();
    let excel = tracker
        .add_subsystem(project, "excel", "Spreadsheet")
        .unwrap();
    let report = tracker
        .create_report(
            NewBugReport::new("Crash on save", "Saving a large file crashes", word),
            &issuer,
        )
        .unwrap();
    World {
        tracker,
        project,
        word,
        excel,
        report,
        dev,
        issuer,
    }
}

#[test]
fn test_tag_change_notifies_subsystem_and_project_watchers_once() {
    let mut w = world();
    w.tracker
        .register_observer("sue", ObserverKind::BugReportChange, ObservableId::Node(w.word))
        .unwrap();
    w.tracker
        .register_observer("pat", ObserverKind::BugReportChange, ObservableId::Node(w.project))
        .unwrap();
    w.tracker
        .register_observer("eve", ObserverKind::BugReportChange, ObservableId::Node(w.excel))
        .unwrap();

    w.tracker
        .request_transition(w.report, BugTag::UnderReview, &w.dev)
        .unwrap();

    for user in ["sue", "pat"] {
        let delivered = w.tracker.get_notifications(user, 10);
        assert_eq!(delivered.len(), 1, "{} should get exactly one", user);
        assert!(delivered[0].text.contains("Crash on save"));
        assert!(delivered[0].text.contains("under_review"));
    }
    assert!(w.tracker.get_notifications("eve", 10).is_empty());
}

#[test]
fn test_specific_tag_watcher_fires_only_on_its_tag() {
    let mut w = world();
    w.tracker
        .register_observer(
            "sue",
            ObserverKind::BugReportSpecificTag { tag: BugTag::Resolved },
            ObservableId::Node(w.project),
        )
        .unwrap();

    w.tracker
        .request_transition(w.report, BugTag::UnderReview, &w.dev)
        .unwrap();
    assert!(w.tracker.get_notifications("sue", 10).is_empty());

    w.tracker
        .request_transition(w.report, BugTag::Resolved, &w.dev)
        .unwrap();
    let delivered = w.tracker.get_notifications("sue", 10);
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].text.contains("received the tag resolved"));
}

#[test]
fn test_creation_notifies_every_ancestor_level() {
    let mut w = world();
    let macros = w
        .tracker
        .add_subsystem(w.excel, "macros", "Macro engine")
        .unwrap();
    for (user, node) in [("sue", macros), ("mid", w.excel), ("pat", w.project)] {
        w.tracker
            .register_observer(user, ObserverKind::CreateBugReport, ObservableId::Node(node))
            .unwrap();
    }

    w.tracker
        .create_report(
            NewBugReport::new("Macro loops", "Macro never terminates", macros),
            &w.issuer,
        )
        .unwrap();

    for user in ["sue", "mid", "pat"] {
        assert_eq!(w.tracker.get_notifications(user, 10).len(), 1);
    }
}

#[test]
fn test_mailbox_order_and_read_flags() {
    let mut w = world();
    w.tracker
        .register_observer("sue", ObserverKind::CreateComment, ObservableId::Node(w.word))
        .unwrap();
    for text in ["N1", "N2", "N3"] {
        w.tracker.add_comment(w.report, &[], text, &w.issuer).unwrap();
    }

    let two = w.tracker.get_notifications("sue", 2);
    assert_eq!(two.len(), 2);
    assert!(two[0].text.ends_with("N3"));
    assert!(two[1].text.ends_with("N2"));

    // Retrieval does not consume; asking again gives the same view.
    let again = w.tracker.get_notifications("sue", 2);
    assert_eq!(again[0].text, two[0].text);

    w.tracker.mark_as_read("sue", 0).unwrap();
    let all = w.tracker.get_notifications("sue", 10);
    assert!(all[0].read);
    assert!(!all[1].read);
    assert!(!all[2].read);
}

#[test]
fn test_comment_replies_also_signal() {
    let mut w = world();
    w.tracker
        .register_observer("sue", ObserverKind::CreateComment, ObservableId::Node(w.project))
        .unwrap();
    w.tracker
        .add_comment(w.report, &[], "Confirmed here too", &w.issuer)
        .unwrap();
    w.tracker
        .add_comment(w.report, &[0], "Which version?", &w.dev)
        .unwrap();

    let delivered = w.tracker.get_notifications("sue", 10);
    assert_eq!(delivered.len(), 2);
    assert!(delivered[0].text.contains("Which version?"));

    let report = w.tracker.report(w.report).unwrap();
    assert_eq!(report.comments.len(), 1);
    assert_eq!(report.comments[0].replies.len(), 1);
}

#[test]
fn test_subsystem_deletion_silences_all_registrations_under_it() {
    let mut w = world();
    w.tracker
        .register_observer("sue", ObserverKind::BugReportChange, ObservableId::Node(w.word))
        .unwrap();
    w.tracker
        .register_observer("sue", ObserverKind::CreateComment, ObservableId::Report(w.report))
        .unwrap();
    w.tracker
        .register_observer("pat", ObserverKind::CreateBugReport, ObservableId::Node(w.project))
        .unwrap();

    w.tracker.remove_subsystem(w.word).unwrap();

    assert!(w.tracker.report(w.report).is_err());
    assert!(w.tracker.registrations_for_user("sue").is_empty());
    assert_eq!(w.tracker.registrations_for_user("pat").len(), 1);

    // Filing against the surviving subsystem still reaches the project watcher.
    w.tracker
        .create_report(NewBugReport::new("Sum is off", "Sums drift", w.excel), &w.issuer)
        .unwrap();
    assert_eq!(w.tracker.get_notifications("pat", 10).len(), 1);
}

#[test]
fn test_milestone_and_version_events() {
    let mut w = world();
    w.tracker
        .register_observer("sue", ObserverKind::Milestone, ObservableId::Node(w.project))
        .unwrap();
    w.tracker
        .register_observer(
            "pat",
            ObserverKind::SpecificMilestone {
                milestone: Milestone::new(vec![1, 0]),
            },
            ObservableId::Node(w.project),
        )
        .unwrap();
    w.tracker
        .register_observer("ver", ObserverKind::SystemVersionUpdate, ObservableId::Node(w.project))
        .unwrap();

    w.tracker
        .declare_milestone(w.word, Milestone::new(vec![1, 0]))
        .unwrap();
    w.tracker.set_project_version(w.project, 2).unwrap();

    assert_eq!(w.tracker.get_notifications("sue", 10).len(), 1);
    let specific = w.tracker.get_notifications("pat", 10);
    assert_eq!(specific.len(), 1);
    assert!(specific[0].text.contains("M1.0"));
    assert!(w.tracker.get_notifications("ver", 10)[0]
        .text
        .contains("version 2"));
}
