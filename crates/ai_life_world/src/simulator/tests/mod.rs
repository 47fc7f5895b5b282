//! Cross-module tests for the chat world simulator.

use super::*;
use crate::geometry::WorldPos;
use crate::models::Personality;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PLAYER: &str = "Alice";

fn spawn_pos() -> WorldPos {
    WorldPos::from_tile(PLAYER_SPAWN_TILE)
}

fn world_with(npcs: &[(&str, Personality, WorldPos)]) -> ChatWorld {
    let player = Agent::new(PLAYER, Personality::Friendly, spawn_pos());
    let mut world = ChatWorld::with_player(WorldConfig::default(), player);
    for (name, personality, pos) in npcs {
        world
            .spawn(Agent::new(*name, *personality, *pos))
            .expect("spawn npc");
    }
    world
}

fn talk(content: &str, target: Option<&str>) -> DecisionResponse {
    DecisionResponse::Talk {
        content: content.to_string(),
        target: target.map(str::to_string),
    }
}

/// Answers decision prompts with `decision` and conversation prompts with `reply`.
#[derive(Debug, Clone)]
struct ScriptedClient {
    decision: String,
    reply: String,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    fn new(decision: &str, reply: &str) -> Self {
        Self {
            decision: decision.to_string(),
            reply: reply.to_string(),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts").clone()
    }
}

impl LlmCompletionClient for ScriptedClient {
    fn complete(
        &self,
        _credential: &str,
        request: &LlmCompletionRequest,
    ) -> Result<LlmCompletionResult, LlmClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompts")
            .push(request.user_prompt.clone());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let output = if request.json_mode {
            self.decision.clone()
        } else {
            self.reply.clone()
        };
        Ok(LlmCompletionResult {
            output,
            model: Some(request.model.clone()),
            total_tokens: None,
        })
    }
}

mod collision;
mod runner;
