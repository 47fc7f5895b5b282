//! Periodic decision dispatch: `Idle -> Requesting -> Applying -> Idle` per agent.
//!
//! The dispatcher never waits on the remote call. `poll` hands out tickets carrying the
//! request snapshot; whoever runs the call reports back through `resolve`, which
//! re-validates the ticket and the conversation lock before touching the world.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::decision::{DecisionRequest, DecisionResponse};
use super::types::{TicketId, WorldConfig, WorldTimeMs};
use super::world::{AppliedAction, ChatWorld, DiscardReason};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTicket {
    pub id: TicketId,
    pub agent: String,
    pub issued_at_ms: WorldTimeMs,
}

/// An issued decision: the continuation token plus the snapshot to send out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDecision {
    pub ticket: DecisionTicket,
    pub request: DecisionRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleSkip {
    ConversationActive,
    InFlight,
    UnknownAgent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Applied { action: AppliedAction },
    Discarded { reason: DiscardReason },
}

impl DecisionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DecisionOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone)]
pub struct DecisionDispatcher {
    period_ms: u64,
    timeout_ms: u64,
    next_due_ms: WorldTimeMs,
    next_ticket: TicketId,
    in_flight: BTreeMap<String, DecisionTicket>,
    /// Last NPC served; the next cycle picks the first name after it.
    npc_cursor: Option<String>,
}

impl DecisionDispatcher {
    pub fn new(config: &WorldConfig) -> Self {
        let period_ms = config.decision_period_ms.max(1);
        Self {
            period_ms,
            timeout_ms: config.decision_timeout_ms.max(1),
            next_due_ms: period_ms,
            next_ticket: 0,
            in_flight: BTreeMap::new(),
            npc_cursor: None,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn next_due_ms(&self) -> WorldTimeMs {
        self.next_due_ms
    }

    pub fn is_in_flight(&self, agent: &str) -> bool {
        self.in_flight.contains_key(agent)
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &DecisionTicket> {
        self.in_flight.values()
    }

    /// Runs the periodic timer. When a period elapses, issues one cycle for the controlled
    /// agent and at most one for the next NPC in round-robin order.
    pub fn poll(&mut self, world: &mut ChatWorld) -> Vec<PendingDecision> {
        let now = world.now_ms();
        if now < self.next_due_ms {
            return Vec::new();
        }
        while self.next_due_ms <= now {
            self.next_due_ms = self.next_due_ms.saturating_add(self.period_ms);
        }
        if world.is_talking() {
            tracing::debug!(now_ms = now, "decision cycle skipped: conversation active");
            return Vec::new();
        }

        let mut issued = Vec::new();
        let player = world.player_name().to_string();
        if let Ok(pending) = self.begin_cycle(world, &player) {
            issued.push(pending);
        }
        if let Some(npc) = self.next_npc(world) {
            self.npc_cursor = Some(npc.clone());
            if let Ok(pending) = self.begin_cycle(world, &npc) {
                issued.push(pending);
            }
        }
        issued
    }

    fn next_npc(&self, world: &ChatWorld) -> Option<String> {
        let ready: Vec<String> = world
            .npc_names()
            .into_iter()
            .filter(|name| !self.in_flight.contains_key(name))
            .collect();
        let first = ready.first()?.clone();
        match &self.npc_cursor {
            None => Some(first),
            Some(cursor) => Some(
                ready
                    .iter()
                    .find(|name| name.as_str() > cursor.as_str())
                    .cloned()
                    .unwrap_or(first),
            ),
        }
    }

    /// Starts one decision cycle for `agent`, consuming its mailbox into the snapshot.
    pub fn begin_cycle(
        &mut self,
        world: &mut ChatWorld,
        agent: &str,
    ) -> Result<PendingDecision, CycleSkip> {
        if world.is_talking() {
            return Err(CycleSkip::ConversationActive);
        }
        if self.in_flight.contains_key(agent) {
            return Err(CycleSkip::InFlight);
        }
        let request = world.take_snapshot(agent).ok_or(CycleSkip::UnknownAgent)?;

        self.next_ticket += 1;
        let ticket = DecisionTicket {
            id: self.next_ticket,
            agent: agent.to_string(),
            issued_at_ms: world.now_ms(),
        };
        self.in_flight.insert(agent.to_string(), ticket.clone());
        tracing::debug!(
            agent,
            ticket = ticket.id,
            nearby = request.nearby.len(),
            has_message = request.incoming.is_some(),
            "decision requested"
        );
        Ok(PendingDecision { ticket, request })
    }

    /// Applies a response if its ticket is still current and no conversation is open.
    pub fn resolve(
        &mut self,
        world: &mut ChatWorld,
        ticket: &DecisionTicket,
        response: DecisionResponse,
    ) -> DecisionOutcome {
        match self.in_flight.get(&ticket.agent) {
            Some(current) if current.id == ticket.id => {
                self.in_flight.remove(&ticket.agent);
            }
            _ => {
                tracing::debug!(agent = %ticket.agent, ticket = ticket.id, "stale decision discarded");
                return DecisionOutcome::Discarded {
                    reason: DiscardReason::StaleTicket,
                };
            }
        }

        if world.is_talking() {
            tracing::debug!(
                agent = %ticket.agent,
                ticket = ticket.id,
                "decision discarded: conversation active"
            );
            return DecisionOutcome::Discarded {
                reason: DiscardReason::ConversationActive,
            };
        }

        match world.apply_decision(&ticket.agent, response) {
            Ok(action) => {
                tracing::debug!(agent = %ticket.agent, ticket = ticket.id, ?action, "decision applied");
                DecisionOutcome::Applied { action }
            }
            Err(reason) => DecisionOutcome::Discarded { reason },
        }
    }

    /// Drops tickets older than the decision timeout; their agents fall back to standing still.
    pub fn expire_overdue(&mut self, world: &mut ChatWorld) -> Vec<DecisionTicket> {
        let now = world.now_ms();
        let timeout_ms = self.timeout_ms;
        let overdue: Vec<String> = self
            .in_flight
            .values()
            .filter(|ticket| now.saturating_sub(ticket.issued_at_ms) >= timeout_ms)
            .map(|ticket| ticket.agent.clone())
            .collect();

        let mut expired = Vec::with_capacity(overdue.len());
        for agent in overdue {
            let Some(ticket) = self.in_flight.remove(&agent) else {
                continue;
            };
            tracing::warn!(agent = %ticket.agent, ticket = ticket.id, timeout_ms, "decision timed out");
            if !world.is_talking() {
                let _ = world.apply_decision(&ticket.agent, DecisionResponse::Stop);
            }
            expired.push(ticket);
        }
        expired
    }
}
