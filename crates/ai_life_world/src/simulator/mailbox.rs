//! Single-slot inbox carrying one conversational message to an agent.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub sender: String,
    pub content: String,
}

impl IncomingMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }
}

/// Lossy last-write-wins inbox.
///
/// A second `deposit` before the owner reads the slot replaces the unread message.
/// Swap in a bounded queue here if delivery ever has to be guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    slot: Option<IncomingMessage>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a message, returning the unread one it replaced (if any).
    pub fn deposit(
        &mut self,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Option<IncomingMessage> {
        self.slot.replace(IncomingMessage::new(sender, content))
    }

    pub fn take_if_present(&mut self) -> Option<IncomingMessage> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<&IncomingMessage> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
