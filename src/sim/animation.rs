//! Directional walk animation for the roamer
//!
//! Facing is derived from the velocity every tick; while moving, the walk
//! cycle alternates between two frames on a fixed period.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Millis;
use crate::config::SimConfig;

/// Sprite facing (screen coordinates: +y is down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Idle,
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Facing {
    /// Facing for a moving velocity, using the configured diagonal band
    pub fn from_velocity(vel: Vec2, config: &SimConfig) -> Self {
        let abs_x = vel.x.abs();
        let abs_y = vel.y.abs();
        let ratio = if abs_y > 0.0 { abs_x / abs_y } else { 0.0 };

        let diagonal = (config.diagonal_ratio_min..=config.diagonal_ratio_max).contains(&ratio)
            && abs_x > config.diagonal_min_velocity
            && abs_y > config.diagonal_min_velocity;

        if diagonal {
            return match (vel.x < 0.0, vel.y < 0.0) {
                (true, false) => Facing::DownLeft,
                (false, false) => Facing::DownRight,
                (true, true) => Facing::UpLeft,
                (false, true) => Facing::UpRight,
            };
        }

        if abs_x > abs_y {
            if vel.x < 0.0 { Facing::Left } else { Facing::Right }
        } else if vel.y < 0.0 {
            Facing::Up
        } else {
            Facing::Down
        }
    }

    fn index(self) -> u32 {
        self as u32
    }
}

/// Facing plus walk-cycle frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub facing: Facing,
    /// 0 or 1
    pub frame: u8,
}

impl Pose {
    /// `facing * 2 + frame`, for render output
    pub fn packed(self) -> u32 {
        self.facing.index() * 2 + self.frame as u32
    }
}

/// Per-entity animation state machine
#[derive(Debug, Clone, Default)]
pub struct Animator {
    pose: Pose,
    /// When the current facing began
    since_ms: Millis,
}

impl Animator {
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Advance from the current velocity
    pub fn update(&mut self, vel: Vec2, now: Millis, config: &SimConfig) -> Pose {
        let moving = vel.length() > config.moving_threshold;
        let facing = if moving {
            Facing::from_velocity(vel, config)
        } else {
            Facing::Idle
        };

        if facing != self.pose.facing {
            self.pose.facing = facing;
            self.since_ms = now;
        }

        self.pose.frame = if moving {
            ((now.saturating_sub(self.since_ms) / config.animation_frame_ms.max(1)) % 2) as u8
        } else {
            0
        };
        self.pose
    }
}
