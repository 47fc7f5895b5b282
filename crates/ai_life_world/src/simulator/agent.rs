//! Agent state: identity, kinematics, vitals, personality and inbox.

use serde::{Deserialize, Serialize};

use super::mailbox::Mailbox;
use super::types::{Direction, WALK_SPEED_EPSILON};
use crate::geometry::{Velocity, WorldPos};
use crate::models::{CharacterError, CharacterRecord, Personality, Vitals};

/// Movement animation derived from velocity each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationState {
    pub facing: Direction,
    pub walking: bool,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            facing: Direction::Down,
            walking: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub owner: Option<String>,
    pub pos: WorldPos,
    pub velocity: Velocity,
    pub vitals: Vitals,
    pub personality: Personality,
    pub mailbox: Mailbox,
    pub animation: AnimationState,
}

impl Agent {
    pub fn new(name: impl Into<String>, personality: Personality, pos: WorldPos) -> Self {
        Self {
            name: name.into(),
            owner: None,
            pos,
            velocity: Velocity::ZERO,
            vitals: Vitals::default(),
            personality,
            mailbox: Mailbox::new(),
            animation: AnimationState::default(),
        }
    }

    pub fn from_record(record: &CharacterRecord, pos: WorldPos) -> Result<Self, CharacterError> {
        let name = record.name.trim();
        if name.is_empty() {
            return Err(CharacterError::EmptyName);
        }
        let mut agent = Self::new(name, record.parsed_personality()?, pos);
        agent.owner = record.owner.clone();
        agent.vitals = record.vitals();
        Ok(agent)
    }

    /// Zeroes velocity and halts the walk animation.
    pub fn halt(&mut self) {
        self.velocity = Velocity::ZERO;
        self.animation.walking = false;
    }

    /// Sets velocity along one axis and zeroes the other.
    pub fn walk(&mut self, direction: Direction, speed: f64) {
        let (ux, uy) = direction.unit();
        self.velocity = Velocity::new(ux * speed, uy * speed);
    }

    pub fn integrate(&mut self, dt_secs: f64) {
        self.pos = self
            .pos
            .offset(self.velocity.vx * dt_secs, self.velocity.vy * dt_secs);
    }

    /// Picks facing from the dominant velocity axis; a near-zero speed stops the walk.
    pub fn refresh_animation(&mut self) {
        let velocity = self.velocity;
        if velocity.speed() < WALK_SPEED_EPSILON {
            self.animation.walking = false;
            return;
        }
        self.animation.facing = if velocity.vx.abs() > velocity.vy.abs() {
            if velocity.vx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if velocity.vy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        };
        self.animation.walking = true;
    }
}
