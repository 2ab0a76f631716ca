//! Inbound message records produced by the unread-inbox scan.

use serde::{Deserialize, Serialize};

/// Opaque identifier addressing one conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unread conversation extracted from the live inbox DOM.
///
/// Transient: the driver hands these to the caller for persistence and
/// deduplication and keeps nothing. `read` is always `false` at extraction
/// time since only unread-marked items are scanned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform-side subscriber identifier (the thread id doubles as one).
    pub subscriber_id: String,
    /// Subscriber display name as rendered in the chat list.
    pub subscriber_name: String,
    /// Avatar image URL, when the list item carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Excerpt of the most recent message in the thread.
    pub excerpt: String,
    pub thread_id: ThreadId,
    pub read: bool,
}
