//! WorldRunner: drives the chat world tick by tick and runs remote calls off the tick path.
//!
//! Remote calls run on `tokio` blocking workers; their results come back over a channel and
//! are drained at the start of the next tick, so every world mutation stays on the caller's
//! thread.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::collision::{CollisionConversation, CollisionConversationHandler, CollisionOutcome};
use super::decision::{DecisionError, DecisionTrace};
use super::dispatch::{DecisionDispatcher, DecisionOutcome, DecisionTicket, PendingDecision};
use super::llm_client::{DecisionClient, LlmCompletionClient, CONVERSATION_FALLBACK_REPLY};
use super::types::{ConversationId, TicketId, WorldTimeMs};
use super::world::{AppliedAction, ChatWorld, DiscardReason};

pub const DEFAULT_LOG_CAPACITY: usize = 512;

/// A finished remote call waiting to be applied on the next tick.
#[derive(Debug, Clone)]
pub enum Completion {
    Decision {
        ticket: DecisionTicket,
        /// The snapshot carried a mailbox message.
        had_message: bool,
        trace: DecisionTrace,
    },
    Conversation {
        conversation: CollisionConversation,
        reply: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerMetrics {
    pub ticks: u64,
    pub decisions_issued: u64,
    pub decisions_applied: u64,
    pub decisions_discarded: u64,
    pub decisions_expired: u64,
    /// Decisions that degraded to `Stop` because of an error.
    pub fallbacks: u64,
    pub conversations_opened: u64,
    pub collisions_ignored: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerLogEntry {
    pub tick: u64,
    pub time: WorldTimeMs,
    pub kind: RunnerLogKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunnerLogKind {
    DecisionIssued {
        agent: String,
        ticket: TicketId,
    },
    DecisionApplied {
        agent: String,
        ticket: TicketId,
        action: AppliedAction,
    },
    DecisionDiscarded {
        agent: String,
        ticket: TicketId,
        reason: DiscardReason,
    },
    DecisionExpired {
        agent: String,
        ticket: TicketId,
    },
    DialogueShown {
        conversation: ConversationId,
        text: String,
    },
    DialogueDismissed {
        conversation: ConversationId,
    },
    CollisionIgnored {
        initiator: String,
        partner: String,
    },
    CollisionReplyDiscarded {
        conversation: ConversationId,
    },
}

pub struct WorldRunner<C: LlmCompletionClient + 'static> {
    world: ChatWorld,
    dispatcher: DecisionDispatcher,
    collisions: CollisionConversationHandler,
    client: Arc<DecisionClient<C>>,
    credential: Option<String>,
    handle: Handle,
    call_timeout: Duration,
    completion_tx: UnboundedSender<Completion>,
    completion_rx: UnboundedReceiver<Completion>,
    ready: VecDeque<Completion>,
    metrics: RunnerMetrics,
    last_traces: BTreeMap<String, DecisionTrace>,
    log: VecDeque<RunnerLogEntry>,
    log_capacity: usize,
}

impl<C: LlmCompletionClient + 'static> WorldRunner<C> {
    /// `handle` must belong to a runtime with the time driver enabled.
    pub fn new(
        world: ChatWorld,
        client: DecisionClient<C>,
        credential: Option<String>,
        handle: Handle,
    ) -> Self {
        let dispatcher = DecisionDispatcher::new(world.config());
        let call_timeout = Duration::from_millis(world.config().decision_timeout_ms.max(1));
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            world,
            dispatcher,
            collisions: CollisionConversationHandler::default(),
            client: Arc::new(client),
            credential,
            handle,
            call_timeout,
            completion_tx,
            completion_rx,
            ready: VecDeque::new(),
            metrics: RunnerMetrics::default(),
            last_traces: BTreeMap::new(),
            log: VecDeque::new(),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }

    pub fn with_collision_handler(mut self, handler: CollisionConversationHandler) -> Self {
        self.collisions = handler;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity.max(1);
        self
    }

    pub fn world(&self) -> &ChatWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut ChatWorld {
        &mut self.world
    }

    pub fn dispatcher(&self) -> &DecisionDispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &RunnerMetrics {
        &self.metrics
    }

    pub fn last_trace(&self, agent: &str) -> Option<&DecisionTrace> {
        self.last_traces.get(agent)
    }

    pub fn log(&self) -> impl Iterator<Item = &RunnerLogEntry> {
        self.log.iter()
    }

    /// One simulation step: apply finished calls, move, react to contacts, expire overdue
    /// tickets, then issue whatever the periodic timer says is due.
    pub fn tick(&mut self, dt_ms: u64) -> Vec<RunnerLogEntry> {
        self.metrics.ticks += 1;
        let mut events = Vec::new();

        self.drain_completions();
        while let Some(completion) = self.ready.pop_front() {
            self.apply_completion(completion, &mut events);
        }

        let contacts = self.world.advance(dt_ms);
        for contact in contacts {
            match self.collisions.on_contact(&mut self.world, &contact) {
                Some(conversation) => {
                    self.metrics.conversations_opened += 1;
                    self.push_dialogue_shown(conversation.id, &mut events);
                    self.spawn_conversation(conversation);
                }
                None => {
                    self.metrics.collisions_ignored += 1;
                    tracing::debug!(partner = %contact.partner, "collision ignored");
                    self.record(
                        RunnerLogKind::CollisionIgnored {
                            initiator: contact.initiator,
                            partner: contact.partner,
                        },
                        &mut events,
                    );
                }
            }
        }

        for ticket in self.dispatcher.expire_overdue(&mut self.world) {
            self.metrics.decisions_expired += 1;
            self.record(
                RunnerLogKind::DecisionExpired {
                    agent: ticket.agent,
                    ticket: ticket.id,
                },
                &mut events,
            );
        }

        for pending in self.dispatcher.poll(&mut self.world) {
            self.metrics.decisions_issued += 1;
            self.record(
                RunnerLogKind::DecisionIssued {
                    agent: pending.ticket.agent.clone(),
                    ticket: pending.ticket.id,
                },
                &mut events,
            );
            self.spawn_decision(pending);
        }

        events
    }

    /// Waits up to `max_wait` for one remote call to finish. The result is applied on the
    /// next `tick`. Returns false if nothing arrived in time.
    pub async fn wait_for_completion(&mut self, max_wait: Duration) -> bool {
        match tokio::time::timeout(max_wait, self.completion_rx.recv()).await {
            Ok(Some(completion)) => {
                self.ready.push_back(completion);
                true
            }
            _ => false,
        }
    }

    /// Pointer-down anywhere on screen.
    pub fn pointer_down(&mut self) -> Option<RunnerLogEntry> {
        let dismissed = self.world.pointer_down()?;
        tracing::info!(conversation = dismissed.conversation, "dialogue dismissed");
        let mut events = Vec::with_capacity(1);
        self.record(
            RunnerLogKind::DialogueDismissed {
                conversation: dismissed.conversation,
            },
            &mut events,
        );
        events.pop()
    }

    pub fn scroll(&mut self, delta: f64) {
        self.world.scroll_dialogue(delta);
    }

    fn drain_completions(&mut self) {
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.ready.push_back(completion);
        }
    }

    fn apply_completion(&mut self, completion: Completion, events: &mut Vec<RunnerLogEntry>) {
        match completion {
            Completion::Decision {
                ticket,
                had_message,
                trace,
            } => {
                if trace.is_fallback() {
                    self.metrics.fallbacks += 1;
                    if had_message {
                        tracing::warn!(
                            agent = %ticket.agent,
                            ticket = ticket.id,
                            "incoming message dropped by fallback decision"
                        );
                    }
                }
                let response = trace.response.clone();
                self.last_traces.insert(ticket.agent.clone(), trace);

                match self.dispatcher.resolve(&mut self.world, &ticket, response) {
                    DecisionOutcome::Applied { action } => {
                        self.metrics.decisions_applied += 1;
                        let opened = match &action {
                            AppliedAction::Talked { conversation, .. } => Some(*conversation),
                            _ => None,
                        };
                        self.record(
                            RunnerLogKind::DecisionApplied {
                                agent: ticket.agent,
                                ticket: ticket.id,
                                action,
                            },
                            events,
                        );
                        if let Some(conversation) = opened {
                            self.metrics.conversations_opened += 1;
                            self.push_dialogue_shown(conversation, events);
                        }
                    }
                    DecisionOutcome::Discarded { reason } => {
                        self.metrics.decisions_discarded += 1;
                        self.record(
                            RunnerLogKind::DecisionDiscarded {
                                agent: ticket.agent,
                                ticket: ticket.id,
                                reason,
                            },
                            events,
                        );
                    }
                }
            }
            Completion::Conversation {
                conversation,
                reply,
            } => match self.collisions.complete(&mut self.world, &conversation, &reply) {
                CollisionOutcome::Shown => self.push_dialogue_shown(conversation.id, events),
                CollisionOutcome::ReplyDiscarded => self.record(
                    RunnerLogKind::CollisionReplyDiscarded {
                        conversation: conversation.id,
                    },
                    events,
                ),
            },
        }
    }

    fn push_dialogue_shown(&mut self, conversation: ConversationId, events: &mut Vec<RunnerLogEntry>) {
        let text = self.world.viewport().text().to_string();
        tracing::info!(conversation, "dialogue shown");
        self.record(RunnerLogKind::DialogueShown { conversation, text }, events);
    }

    fn spawn_decision(&self, pending: PendingDecision) {
        let client = Arc::clone(&self.client);
        let credential = self.credential.clone();
        let tx = self.completion_tx.clone();
        let call_timeout = self.call_timeout;
        self.handle.spawn(async move {
            let PendingDecision { ticket, request } = pending;
            let agent = request.agent.clone();
            let had_message = request.incoming.is_some();
            let call = tokio::task::spawn_blocking(move || {
                client.decide_with_trace(credential.as_deref(), &request)
            });
            let mut trace = match tokio::time::timeout(call_timeout, call).await {
                Ok(Ok(trace)) => trace,
                Ok(Err(err)) => DecisionTrace::fallback(
                    agent,
                    &DecisionError::Aborted {
                        message: err.to_string(),
                    },
                ),
                Err(_) => {
                    let err = DecisionError::TimedOut {
                        timeout_ms: call_timeout.as_millis() as u64,
                    };
                    tracing::warn!(agent = %agent, error = %err, "decision call abandoned");
                    DecisionTrace::fallback(agent, &err)
                }
            };
            trace.ticket = Some(ticket.id);
            let _ = tx.send(Completion::Decision {
                ticket,
                had_message,
                trace,
            });
        });
    }

    fn spawn_conversation(&self, conversation: CollisionConversation) {
        let client = Arc::clone(&self.client);
        let credential = self.credential.clone();
        let tx = self.completion_tx.clone();
        let call_timeout = self.call_timeout;
        self.handle.spawn(async move {
            let own = conversation.initiator_personality;
            let other = conversation.partner_personality;
            let context = conversation.context.clone();
            let call = tokio::task::spawn_blocking(move || {
                client.converse(credential.as_deref(), own, other, &context)
            });
            let reply = match tokio::time::timeout(call_timeout, call).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(err)) => {
                    tracing::warn!(conversation = conversation.id, error = %err, "conversation task aborted");
                    CONVERSATION_FALLBACK_REPLY.to_string()
                }
                Err(_) => {
                    tracing::warn!(conversation = conversation.id, "conversation call timed out");
                    CONVERSATION_FALLBACK_REPLY.to_string()
                }
            };
            let _ = tx.send(Completion::Conversation {
                conversation,
                reply,
            });
        });
    }

    fn record(&mut self, kind: RunnerLogKind, events: &mut Vec<RunnerLogEntry>) {
        let entry = RunnerLogEntry {
            tick: self.metrics.ticks,
            time: self.world.now_ms(),
            kind,
        };
        if self.log.len() >= self.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(entry.clone());
        events.push(entry);
    }
}
