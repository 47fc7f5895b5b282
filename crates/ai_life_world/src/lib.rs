pub mod config;
pub mod geometry;
pub mod models;
pub mod simulator;

pub use config::{AppConfig, ConfigError, WORLD_TABLE_KEY};
pub use geometry::{
    distance, unit_vector, TilePos, Velocity, WorldBounds, WorldPos, MAP_HEIGHT_TILES,
    MAP_WIDTH_TILES, TILE_SIZE,
};
pub use models::{
    personality_profile, CharacterError, CharacterRecord, Personality, Vitals,
    HAIR_COLOR_PALETTE, UNKNOWN_PERSONALITY_PROFILE,
};

// Decision loop and conversations
pub use simulator::{
    Agent, AppliedAction, ChatWorld, CollisionConversation, CollisionConversationHandler,
    ContactEvent, ConversationKind, ConversationLock, DecisionClient, DecisionDispatcher,
    DecisionError, DecisionOutcome, DecisionRequest, DecisionResponse, DecisionTicket,
    DecisionTrace, DialogueDismissed, DialogueViewport, Direction, DiscardReason,
    IncomingMessage, LlmClientConfig, LlmClientError, LlmCompletionClient, LlmConfigError,
    Mailbox, OpenAiChatCompletionClient, RunnerLogEntry, RunnerLogKind, RunnerMetrics,
    WorldConfig, WorldError, WorldRunner,
};
