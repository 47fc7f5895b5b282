//! Simulation context: the agent roster, the conversation lock and the dialogue viewport,
//! plus the minimal motion/contact stand-in for the physics collaborator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::agent::Agent;
use super::conversation::{ConversationKind, ConversationLock};
use super::decision::{DecisionRequest, DecisionResponse};
use super::dialogue::{DialogueDismissed, DialogueViewport, TextLayout, DEFAULT_VIEWPORT_HEIGHT};
use super::types::{ConversationId, Direction, WorldConfig, WorldTimeMs, BODY_SIZE};
use crate::geometry::{distance, TilePos, WorldBounds, WorldPos};
use crate::models::{CharacterError, CharacterRecord};

pub const PLAYER_SPAWN_TILE: TilePos = TilePos { x: 14, y: 12 };
pub const CLOSE_HINT: &str = "(Click to close)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("agent already in world: {name}")]
    DuplicateAgent { name: String },
    #[error("unknown agent: {name}")]
    UnknownAgent { name: String },
    #[error(transparent)]
    Character(#[from] CharacterError),
}

/// Controlled agent began touching another agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub initiator: String,
    pub partner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppliedAction {
    Moved {
        direction: Direction,
    },
    Stopped,
    Talked {
        conversation: ConversationId,
        /// Target whose mailbox received the line, if it was present.
        delivered_to: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// A conversation held the lock when the response arrived.
    ConversationActive,
    /// The ticket was expired or superseded.
    StaleTicket,
    UnknownAgent,
}

#[derive(Debug, Clone)]
pub struct ChatWorld {
    config: WorldConfig,
    bounds: WorldBounds,
    now_ms: WorldTimeMs,
    player: String,
    agents: BTreeMap<String, Agent>,
    lock: ConversationLock,
    viewport: DialogueViewport,
    touching: BTreeSet<String>,
}

impl ChatWorld {
    /// Spawns the controlled agent from its ledger record at the default spawn tile.
    pub fn enter(config: WorldConfig, record: &CharacterRecord) -> Result<Self, WorldError> {
        let player = Agent::from_record(record, WorldPos::from_tile(PLAYER_SPAWN_TILE))?;
        Ok(Self::with_player(config, player))
    }

    pub fn with_player(config: WorldConfig, player: Agent) -> Self {
        let viewport = DialogueViewport::new(
            DEFAULT_VIEWPORT_HEIGHT,
            config.scroll_sensitivity,
            TextLayout::default(),
        );
        let bounds = WorldBounds::default();
        let mut player = player;
        player.pos = bounds.clamp(player.pos);
        let name = player.name.clone();
        let mut agents = BTreeMap::new();
        agents.insert(name.clone(), player);
        Self {
            config,
            bounds,
            now_ms: 0,
            player: name,
            agents,
            lock: ConversationLock::new(),
            viewport,
            touching: BTreeSet::new(),
        }
    }

    pub fn spawn(&mut self, agent: Agent) -> Result<(), WorldError> {
        if self.agents.contains_key(&agent.name) {
            return Err(WorldError::DuplicateAgent { name: agent.name });
        }
        let mut agent = agent;
        agent.pos = self.bounds.clamp(agent.pos);
        self.agents.insert(agent.name.clone(), agent);
        Ok(())
    }

    pub fn spawn_record(
        &mut self,
        record: &CharacterRecord,
        pos: WorldPos,
    ) -> Result<(), WorldError> {
        self.spawn(Agent::from_record(record, pos)?)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn now_ms(&self) -> WorldTimeMs {
        self.now_ms
    }

    pub fn player_name(&self) -> &str {
        &self.player
    }

    pub fn player(&self) -> Option<&Agent> {
        self.agents.get(&self.player)
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.get(name)
    }

    pub fn agent_mut(&mut self, name: &str) -> Option<&mut Agent> {
        self.agents.get_mut(name)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Every agent except the controlled one, in name order.
    pub fn npc_names(&self) -> Vec<String> {
        self.agents
            .keys()
            .filter(|name| **name != self.player)
            .cloned()
            .collect()
    }

    pub fn lock(&self) -> &ConversationLock {
        &self.lock
    }

    pub fn viewport(&self) -> &DialogueViewport {
        &self.viewport
    }

    pub fn is_talking(&self) -> bool {
        self.lock.is_held()
    }

    /// Names of other agents strictly within the proximity radius of `name`.
    pub fn nearby_names(&self, name: &str) -> Vec<String> {
        let Some(origin) = self.agents.get(name) else {
            return Vec::new();
        };
        let radius = self.config.proximity_radius;
        self.agents
            .values()
            .filter(|other| other.name != origin.name)
            .filter(|other| distance(origin.pos, other.pos) < radius)
            .map(|other| other.name.clone())
            .collect()
    }

    /// Samples the decision snapshot for `name`, consuming its mailbox.
    pub fn take_snapshot(&mut self, name: &str) -> Option<DecisionRequest> {
        let nearby = self.nearby_names(name);
        let agent = self.agents.get_mut(name)?;
        Some(DecisionRequest {
            agent: agent.name.clone(),
            personality: agent.personality,
            vitals: agent.vitals,
            tile: agent.pos.tile(),
            nearby,
            incoming: agent.mailbox.take_if_present(),
        })
    }

    /// Applies a validated decision. `Talk` only lands if the lock can be taken.
    pub fn apply_decision(
        &mut self,
        name: &str,
        response: DecisionResponse,
    ) -> Result<AppliedAction, DiscardReason> {
        let speed = self.config.move_speed;
        let agent = self
            .agents
            .get_mut(name)
            .ok_or(DiscardReason::UnknownAgent)?;
        match response {
            DecisionResponse::Move { direction } => {
                agent.walk(direction, speed);
                Ok(AppliedAction::Moved { direction })
            }
            DecisionResponse::Stop => {
                agent.halt();
                Ok(AppliedAction::Stopped)
            }
            DecisionResponse::Talk { content, target } => {
                let conversation = self
                    .lock
                    .try_acquire(ConversationKind::PeriodicTalk {
                        speaker: name.to_string(),
                    })
                    .ok_or(DiscardReason::ConversationActive)?;
                agent.halt();
                let label = if name == self.player {
                    "Me".to_string()
                } else {
                    agent.personality.tag().to_string()
                };
                let text = format_dialogue(name, &label, &content);
                self.viewport.show(conversation, text);

                let delivered_to = target
                    .filter(|target| target != name)
                    .and_then(|target| {
                        let recipient = self.agents.get_mut(&target)?;
                        recipient.mailbox.deposit(name, content);
                        Some(target)
                    });
                Ok(AppliedAction::Talked {
                    conversation,
                    delivered_to,
                })
            }
        }
    }

    pub(crate) fn acquire_conversation(&mut self, kind: ConversationKind) -> Option<ConversationId> {
        self.lock.try_acquire(kind)
    }

    /// Shows `text` only while `conversation` still owns the lock.
    pub(crate) fn show_dialogue(&mut self, conversation: ConversationId, text: String) -> bool {
        if !self.lock.is_held_by(conversation) {
            return false;
        }
        self.viewport.show(conversation, text);
        true
    }

    /// Pointer-down anywhere: dismisses a visible dialogue and releases its lock.
    pub fn pointer_down(&mut self) -> Option<DialogueDismissed> {
        let dismissed = self.viewport.dismiss()?;
        self.lock.release(dismissed.conversation);
        Some(dismissed)
    }

    pub fn scroll_dialogue(&mut self, delta: f64) {
        self.viewport.scroll(delta);
    }

    pub(crate) fn displace(&mut self, name: &str, dx: f64, dy: f64) {
        let bounds = self.bounds;
        if let Some(agent) = self.agents.get_mut(name) {
            agent.pos = bounds.clamp(agent.pos.offset(dx, dy));
        }
    }

    /// Advances motion by `dt_ms` and reports contacts that began this step.
    pub fn advance(&mut self, dt_ms: u64) -> Vec<ContactEvent> {
        self.now_ms = self.now_ms.saturating_add(dt_ms);
        let dt_secs = dt_ms as f64 / 1000.0;
        let bounds = self.bounds;
        for agent in self.agents.values_mut() {
            agent.integrate(dt_secs);
            agent.pos = bounds.clamp(agent.pos);
            agent.refresh_animation();
        }
        self.detect_contacts()
    }

    fn detect_contacts(&mut self) -> Vec<ContactEvent> {
        let Some(player) = self.agents.get(&self.player) else {
            return Vec::new();
        };
        let player_pos = player.pos;
        let mut events = Vec::new();
        for other in self.agents.values() {
            if other.name == self.player {
                continue;
            }
            let overlapping = (other.pos.x - player_pos.x).abs() < BODY_SIZE
                && (other.pos.y - player_pos.y).abs() < BODY_SIZE;
            if overlapping {
                if self.touching.insert(other.name.clone()) {
                    events.push(ContactEvent {
                        initiator: self.player.clone(),
                        partner: other.name.clone(),
                    });
                }
            } else {
                self.touching.remove(&other.name);
            }
        }
        events
    }
}

pub(crate) fn format_dialogue(name: &str, label: &str, content: &str) -> String {
    format!("{name} ({label}):\n\n\"{content}\"\n\n{CLOSE_HINT}")
}
