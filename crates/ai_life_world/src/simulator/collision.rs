//! One-shot conversation opened when the controlled agent bumps into another agent.

use serde::{Deserialize, Serialize};

use super::conversation::ConversationKind;
use super::prompt::COLLISION_CONTEXT;
use super::types::ConversationId;
use super::world::{format_dialogue, ChatWorld, ContactEvent};
use crate::geometry::unit_vector;
use crate::models::Personality;

pub const COMPOSING_PLACEHOLDER: &str = "AI is thinking...";

/// An open collision conversation waiting for its line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionConversation {
    pub id: ConversationId,
    pub initiator: String,
    pub partner: String,
    /// Voiced in the prompt's "You are" role.
    pub initiator_personality: Personality,
    /// Shown in the dialogue label.
    pub partner_personality: Personality,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionOutcome {
    Shown,
    /// The placeholder was dismissed before the line arrived.
    ReplyDiscarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionConversationHandler {
    context: String,
}

impl Default for CollisionConversationHandler {
    fn default() -> Self {
        Self::new(COLLISION_CONTEXT)
    }
}

impl CollisionConversationHandler {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Opens a conversation for a contact, or returns `None` when a conversation is already
    /// open. The event is not queued.
    pub fn on_contact(
        &self,
        world: &mut ChatWorld,
        contact: &ContactEvent,
    ) -> Option<CollisionConversation> {
        if world.is_talking() || contact.initiator != world.player_name() {
            return None;
        }
        let initiator_personality = world.agent(&contact.initiator)?.personality;
        let partner_personality = world.agent(&contact.partner)?.personality;

        let id = world.acquire_conversation(ConversationKind::Collision {
            initiator: contact.initiator.clone(),
            partner: contact.partner.clone(),
        })?;
        for name in [&contact.initiator, &contact.partner] {
            if let Some(agent) = world.agent_mut(name) {
                agent.halt();
            }
        }
        world.show_dialogue(id, COMPOSING_PLACEHOLDER.to_string());
        tracing::info!(
            conversation = id,
            initiator = %contact.initiator,
            partner = %contact.partner,
            "collision conversation opened"
        );

        Some(CollisionConversation {
            id,
            initiator: contact.initiator.clone(),
            partner: contact.partner.clone(),
            initiator_personality,
            partner_personality,
            context: self.context.clone(),
        })
    }

    /// Renders the reply (if the conversation is still open) and pushes the pair apart.
    pub fn complete(
        &self,
        world: &mut ChatWorld,
        conversation: &CollisionConversation,
        reply: &str,
    ) -> CollisionOutcome {
        let text = format_dialogue(
            &conversation.partner,
            conversation.partner_personality.tag(),
            reply,
        );
        let outcome = if world.show_dialogue(conversation.id, text) {
            CollisionOutcome::Shown
        } else {
            tracing::debug!(conversation = conversation.id, "collision reply arrived after dismiss");
            CollisionOutcome::ReplyDiscarded
        };
        repel(world, &conversation.initiator, &conversation.partner);
        outcome
    }
}

/// Displaces both agents apart along the line between them by the repulsion distance.
fn repel(world: &mut ChatWorld, initiator: &str, partner: &str) {
    let (Some(a), Some(b)) = (world.agent(initiator), world.agent(partner)) else {
        return;
    };
    let (ux, uy) = unit_vector(a.pos, b.pos);
    let magnitude = world.config().repulsion_distance;
    world.displace(initiator, -ux * magnitude, -uy * magnitude);
    world.displace(partner, ux * magnitude, uy * magnitude);
}
