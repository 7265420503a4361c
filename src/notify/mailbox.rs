//! Per-user notification queues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One delivered notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Rendered notification text
    pub text: String,

    /// Whether the user has read it
    #[serde(default)]
    pub read: bool,

    /// Delivery timestamp
    pub created_at: DateTime<Utc>,
}

/// A user's ordered notification queue.
///
/// Mailboxes are created lazily, owned by exactly one user, and never
/// deleted during that user's lifetime. Entries are appended in delivery
/// order and retrieved most-recent-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mailbox {
    /// Id of the owning user
    pub user: String,

    /// Notifications in insertion order (oldest first)
    notifications: Vec<Notification>,
}

impl Mailbox {
    /// Create an empty mailbox for `user`.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            notifications: Vec::new(),
        }
    }

    /// Append a notification, unread.
    pub fn add_notification(&mut self, text: impl Into<String>) {
        self.notifications.push(Notification {
            text: text.into(),
            read: false,
            created_at: Utc::now(),
        });
    }

    /// The `count` most recently inserted notifications, newest first.
    /// Read flags are left untouched.
    pub fn recent(&self, count: usize) -> Vec<&Notification> {
        self.notifications.iter().rev().take(count).collect()
    }

    /// Mark one notification read in place. `index` counts from the newest
    /// entry (0 = most recent), matching the order [`Mailbox::recent`]
    /// returns. Returns false if the index is out of range.
    pub fn mark_as_read(&mut self, index: usize) -> bool {
        let len = self.notifications.len();
        if index >= len {
            return false;
        }
        self.notifications[len - 1 - index].read = true;
        true
    }

    /// Total number of notifications ever delivered.
    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    /// Check if the mailbox has never received a notification.
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}
