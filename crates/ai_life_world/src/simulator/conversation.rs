//! World-wide conversation lock: at most one dialogue is composed or shown at a time.

use serde::{Deserialize, Serialize};

use super::types::ConversationId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationKind {
    /// Opened by a `Talk` decision from the periodic loop.
    PeriodicTalk { speaker: String },
    /// Opened by the controlled agent bumping into another agent.
    Collision { initiator: String, partner: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveConversation {
    pub id: ConversationId,
    pub kind: ConversationKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationLock {
    holder: Option<ActiveConversation>,
    next_id: ConversationId,
}

impl ConversationLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    pub fn holder(&self) -> Option<&ActiveConversation> {
        self.holder.as_ref()
    }

    pub fn is_held_by(&self, id: ConversationId) -> bool {
        self.holder.as_ref().map(|active| active.id) == Some(id)
    }

    /// Check-and-set in one step. Returns `None` while another conversation holds the lock.
    pub fn try_acquire(&mut self, kind: ConversationKind) -> Option<ConversationId> {
        if self.holder.is_some() {
            return None;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.holder = Some(ActiveConversation { id, kind });
        Some(id)
    }

    /// Releases the lock only if `id` is the current holder.
    pub fn release(&mut self, id: ConversationId) -> bool {
        if !self.is_held_by(id) {
            return false;
        }
        self.holder = None;
        true
    }
}
