//! Decision contract: the snapshot sent out, the action that comes back, and how raw
//! model output is turned into one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::llm_client::LlmClientError;
use super::mailbox::IncomingMessage;
use super::types::{Direction, TicketId};
use crate::geometry::TilePos;
use crate::models::{Personality, Vitals};

/// Immutable snapshot of one agent taken when its decision cycle starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub agent: String,
    pub personality: Personality,
    pub vitals: Vitals,
    pub tile: TilePos,
    pub nearby: Vec<String>,
    pub incoming: Option<IncomingMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DecisionResponse {
    Move {
        direction: Direction,
    },
    Stop,
    Talk {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl DecisionResponse {
    pub fn is_stop(&self) -> bool {
        matches!(self, DecisionResponse::Stop)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DecisionResponse::Move { .. } => "move",
            DecisionResponse::Stop => "stop",
            DecisionResponse::Talk { .. } => "talk",
        }
    }
}

/// Every variant degrades to `DecisionResponse::Stop`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("missing access credential")]
    MissingCredential,
    #[error("transport failure: {0}")]
    Transport(#[from] LlmClientError),
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
    #[error("decision timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
    #[error("decision task aborted: {message}")]
    Aborted { message: String },
}

/// Diagnostic record of a single decision call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub agent: String,
    pub ticket: Option<TicketId>,
    pub response: DecisionResponse,
    pub llm_input: Option<String>,
    pub llm_output: Option<String>,
    pub error: Option<String>,
    pub latency_ms: Option<u64>,
}

impl DecisionTrace {
    pub fn fallback(agent: impl Into<String>, error: &DecisionError) -> Self {
        Self {
            agent: agent.into(),
            ticket: None,
            response: DecisionResponse::Stop,
            llm_input: None,
            llm_output: None,
            error: Some(error.to_string()),
            latency_ms: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct DecisionPayload {
    action: String,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    target: Option<String>,
}

/// Parses model output into a response. Any deviation from the contract is an error.
pub fn parse_decision(output: &str) -> Result<DecisionResponse, DecisionError> {
    let json = extract_json_block(output).unwrap_or(output);
    let payload: DecisionPayload =
        serde_json::from_str(json).map_err(|err| DecisionError::MalformedResponse {
            message: format!("json parse failed: {err}"),
        })?;

    match payload.action.trim().to_ascii_lowercase().as_str() {
        "move" => {
            let raw = payload.direction.unwrap_or_default();
            let direction =
                Direction::parse(&raw).ok_or_else(|| DecisionError::MalformedResponse {
                    message: format!("move requires direction up|down|left|right, got `{raw}`"),
                })?;
            Ok(DecisionResponse::Move { direction })
        }
        "stop" => Ok(DecisionResponse::Stop),
        "talk" => {
            let content = payload
                .content
                .map(|content| content.trim().to_string())
                .filter(|content| !content.is_empty())
                .ok_or_else(|| DecisionError::MalformedResponse {
                    message: "talk missing `content`".to_string(),
                })?;
            let target = payload
                .target
                .map(|target| target.trim().to_string())
                .filter(|target| !target.is_empty());
            Ok(DecisionResponse::Talk { content, target })
        }
        other => Err(DecisionError::MalformedResponse {
            message: format!("unsupported action: {other}"),
        }),
    }
}

fn extract_json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    raw.get(start..=end)
}
