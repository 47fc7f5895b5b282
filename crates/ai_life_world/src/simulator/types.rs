use serde::{Deserialize, Serialize};

pub type AgentName = String;
pub type WorldTimeMs = u64;
pub type ConversationId = u64;
pub type TicketId = u64;

pub const DEFAULT_PROXIMITY_RADIUS: f64 = 80.0;
pub const DEFAULT_DECISION_PERIOD_MS: u64 = 1_000;
pub const DEFAULT_MOVE_SPEED: f64 = 60.0;
pub const DEFAULT_REPULSION_DISTANCE: f64 = 20.0;
pub const DEFAULT_SCROLL_SENSITIVITY: f64 = 0.5;
pub const DEFAULT_DECISION_TIMEOUT_MS: u64 = 30_000;

/// Side length of the square collision body every agent carries.
pub const BODY_SIZE: f64 = 10.0;
/// Below this speed an agent is considered standing still.
pub const WALK_SPEED_EPSILON: f64 = 0.1;

/// Tunable constants of the decision and dialogue subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub proximity_radius: f64,
    pub decision_period_ms: u64,
    /// World units per second.
    pub move_speed: f64,
    pub repulsion_distance: f64,
    pub scroll_sensitivity: f64,
    pub decision_timeout_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            proximity_radius: DEFAULT_PROXIMITY_RADIUS,
            decision_period_ms: DEFAULT_DECISION_PERIOD_MS,
            move_speed: DEFAULT_MOVE_SPEED,
            repulsion_distance: DEFAULT_REPULSION_DISTANCE,
            scroll_sensitivity: DEFAULT_SCROLL_SENSITIVITY,
            decision_timeout_ms: DEFAULT_DECISION_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Screen-space unit step; y grows downwards.
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}
