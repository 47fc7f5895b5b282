//! Chat world simulator - agent decisions, the conversation lock and dialogue presentation.
//!
//! This module is organized into submodules:
//! - `types`: Shared aliases, tunables and `WorldConfig`
//! - `agent` / `mailbox`: Agents and their single-slot message mailbox
//! - `decision` / `prompt` / `llm_client`: Decision contract, prompts and the remote client
//! - `conversation` / `dialogue`: Conversation lock and the scrollable dialogue viewport
//! - `world`: ChatWorld simulation context
//! - `dispatch` / `collision`: Periodic decision dispatch and collision conversations
//! - `runner`: WorldRunner tick driver, metrics and event log

mod agent;
mod collision;
mod conversation;
mod decision;
mod dialogue;
mod dispatch;
mod llm_client;
mod mailbox;
mod prompt;
mod runner;
mod types;
mod world;

#[cfg(test)]
mod tests;

pub use agent::{Agent, AnimationState};
pub use collision::{
    CollisionConversation, CollisionConversationHandler, CollisionOutcome, COMPOSING_PLACEHOLDER,
};
pub use conversation::{ActiveConversation, ConversationKind, ConversationLock};
pub use decision::{
    parse_decision, DecisionError, DecisionRequest, DecisionResponse, DecisionTrace,
};
pub use dialogue::{
    DialogueDismissed, DialogueViewport, TextLayout, DEFAULT_LINE_HEIGHT, DEFAULT_VIEWPORT_HEIGHT,
    DEFAULT_WRAP_COLUMNS,
};
pub use dispatch::{
    CycleSkip, DecisionDispatcher, DecisionOutcome, DecisionTicket, PendingDecision,
};
pub use llm_client::{
    DecisionClient, LlmClientConfig, LlmClientError, LlmCompletionClient, LlmCompletionRequest,
    LlmCompletionResult, LlmConfigError, OpenAiChatCompletionClient, CONVERSATION_FALLBACK_REPLY,
    CONVERSATION_MAX_CHARS, CONVERSATION_MAX_TOKENS, DEFAULT_CONFIG_FILE_NAME,
    DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MAX_TOKENS, DEFAULT_LLM_MODEL, DEFAULT_LLM_SYSTEM_PROMPT,
    DEFAULT_LLM_TEMPERATURE, DEFAULT_LLM_TIMEOUT_MS, ENV_LLM_API_KEY, ENV_LLM_BASE_URL,
    ENV_LLM_MAX_TOKENS, ENV_LLM_MODEL, ENV_LLM_SYSTEM_PROMPT, ENV_LLM_TEMPERATURE,
    ENV_LLM_TIMEOUT_MS,
};
pub(crate) use llm_client::read_config_table;
pub use mailbox::{IncomingMessage, Mailbox};
pub use prompt::{conversation_prompt, decision_prompt, COLLISION_CONTEXT};
pub use runner::{
    Completion, RunnerLogEntry, RunnerLogKind, RunnerMetrics, WorldRunner, DEFAULT_LOG_CAPACITY,
};
pub use types::{
    AgentName, ConversationId, Direction, TicketId, WorldConfig, WorldTimeMs, BODY_SIZE,
    DEFAULT_DECISION_PERIOD_MS, DEFAULT_DECISION_TIMEOUT_MS, DEFAULT_MOVE_SPEED,
    DEFAULT_PROXIMITY_RADIUS, DEFAULT_REPULSION_DISTANCE, DEFAULT_SCROLL_SENSITIVITY,
    WALK_SPEED_EPSILON,
};
pub use world::{
    AppliedAction, ChatWorld, ContactEvent, DiscardReason, WorldError, CLOSE_HINT,
    PLAYER_SPAWN_TILE,
};
