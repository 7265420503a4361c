//! Notification pipeline: mailboxes, registrations, and teardown.
//!
//! The hub owns every mailbox (keyed by user id) and the ledger of live
//! registrations. Observers themselves are attached to their observables
//! (tree nodes and bug reports); the ledger exists so that registrations
//! can be torn down when an observable is deleted, across all users.

pub mod mailbox;
pub mod observer;
pub mod signal;

pub use mailbox::{Mailbox, Notification};
pub use observer::{Observer, ObserverKind};
pub use signal::{Signal, SignalKind};

use crate::models::{NodeId, ReportId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// Identity of something observers can be registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservableId {
    /// A project or subsystem node
    Node(NodeId),
    /// A bug report
    Report(ReportId),
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservableId::Node(id) => write!(f, "{}", id),
            ObservableId::Report(id) => write!(f, "{}", id),
        }
    }
}

/// The (user, observer, observable) binding tracked for teardown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Id of the registering user
    pub user: String,

    /// What the observer is attached to
    pub observable: ObservableId,

    /// The attached observer
    pub observer: Observer,
}

/// Process-wide registry binding users to mailboxes and observers to
/// observables.
#[derive(Debug, Default)]
pub struct NotificationHub {
    /// Lazily created mailboxes, one per user, never deleted
    mailboxes: HashMap<String, Mailbox>,

    /// Live registrations, in registration order
    registrations: Vec<Registration>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mailbox for `user`, created empty on first access. This is the
    /// only creation path; identity is stable for the user's lifetime.
    pub fn mailbox_for_user(&mut self, user: &str) -> &mut Mailbox {
        self.mailboxes
            .entry(user.to_string())
            .or_insert_with(|| Mailbox::new(user))
    }

    /// The mailbox for `user`, if one was ever created.
    pub fn mailbox(&self, user: &str) -> Option<&Mailbox> {
        self.mailboxes.get(user)
    }

    /// Append a rendered notification to `user`'s mailbox.
    pub fn deliver(&mut self, user: &str, text: String) {
        trace!(user, %text, "delivering notification");
        self.mailbox_for_user(user).add_notification(text);
    }

    /// Record a registration so it can be torn down later.
    pub fn record(&mut self, observable: ObservableId, observer: &Observer) {
        debug!(user = %observer.user, %observable, "recording registration");
        self.registrations.push(Registration {
            user: observer.user.clone(),
            observable,
            observer: observer.clone(),
        });
    }

    /// Drop every registration against `observable`, across all users, and
    /// return the observers that were bound to it so the caller can detach
    /// them from the observable itself.
    pub fn remove_registrations_for(&mut self, observable: ObservableId) -> Vec<Observer> {
        let mut removed = Vec::new();
        self.registrations.retain(|registration| {
            if registration.observable == observable {
                removed.push(registration.observer.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            debug!(%observable, count = removed.len(), "tore down registrations");
        }
        removed
    }

    /// Live registrations made by `user`, in registration order.
    pub fn registrations_for_user(&self, user: &str) -> Vec<&Registration> {
        self.registrations
            .iter()
            .filter(|registration| registration.user == user)
            .collect()
    }

    /// The `count` most recent notifications for `user`, newest first.
    /// A user without a mailbox simply has none yet.
    pub fn get_notifications(&self, user: &str, count: usize) -> Vec<&Notification> {
        self.mailboxes
            .get(user)
            .map(|mailbox| mailbox.recent(count))
            .unwrap_or_default()
    }

    /// Mark `user`'s notification at `index` (0 = newest) as read.
    pub fn mark_as_read(&mut self, user: &str, index: usize) -> Result<()> {
        let mailbox = self
            .mailboxes
            .get_mut(user)
            .ok_or_else(|| Error::NotFound(format!("mailbox for user '{}'", user)))?;
        if !mailbox.mark_as_read(index) {
            return Err(Error::NotFound(format!(
                "notification {} for user '{}'",
                index, user
            )));
        }
        Ok(())
    }
}
