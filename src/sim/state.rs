//! Game state and core simulation types
//!
//! Screen-space coordinates: origin top-left, y grows downward, velocities in
//! pixels per frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::BALL_SPEED_CAP;
use crate::settings::ArenaSettings;

/// Which side won a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointOutcome {
    PlayerWon,
    OpponentWon,
}

impl PointOutcome {
    pub fn player_won(self) -> bool {
        self == PointOutcome::PlayerWon
    }
}

/// The ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Per-axis serve speed, used for resets and the speed cap
    pub base_speed: f32,
}

impl Ball {
    pub fn new(pos: Vec2, radius: f32, base_speed: f32) -> Self {
        Self {
            pos,
            vel: Vec2::splat(base_speed),
            radius,
            base_speed,
        }
    }

    /// Multiply the current velocity, capping horizontal speed
    pub fn increase_speed(&mut self, factor: f32) {
        self.vel *= factor;
        let max_speed = self.base_speed * BALL_SPEED_CAP;
        if self.vel.x.abs() > max_speed {
            self.vel.x = max_speed.copysign(self.vel.x);
        }
    }

    /// Restore serve speed, keeping direction
    pub fn reset_speed(&mut self) {
        self.vel = Vec2::new(
            self.base_speed.copysign(self.vel.x),
            self.base_speed.copysign(self.vel.y),
        );
    }

    /// Re-center and serve toward the side that just scored
    pub fn reset(&mut self, center: Vec2) {
        self.pos = center;
        self.vel.x = -self.vel.x;
    }

    /// Whether the ball is travelling toward the opponent (right side)
    pub fn moving_right(&self) -> bool {
        self.vel.x > 0.0
    }
}

/// How a paddle follows its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddleMotion {
    /// Covers a fixed fraction of the remaining distance each frame
    Smoothed,
    /// Moves at most `speed` pixels per frame
    SpeedLimited,
}

/// Fraction of the remaining distance a smoothed paddle covers per frame
const SMOOTHING: f32 = 0.3;

/// A paddle; `y` is the top edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub target_y: f32,
    pub motion: PaddleMotion,
}

impl Paddle {
    pub fn new(x: f32, y: f32, arena: &ArenaSettings, motion: PaddleMotion) -> Self {
        Self {
            x,
            y,
            width: arena.paddle_width,
            height: arena.paddle_height,
            speed: arena.paddle_speed,
            target_y: y,
            motion,
        }
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn set_target(&mut self, y: f32) {
        self.target_y = y;
    }

    /// Move toward the target, staying inside the arena
    pub fn update(&mut self, arena_height: f32) {
        let max_y = (arena_height - self.height).max(0.0);
        self.target_y = self.target_y.clamp(0.0, max_y);

        let diff = self.target_y - self.y;
        match self.motion {
            PaddleMotion::Smoothed => {
                if diff.abs() > 1.0 {
                    self.y += diff * SMOOTHING;
                } else {
                    self.y = self.target_y;
                }
            }
            PaddleMotion::SpeedLimited => {
                self.y += diff.clamp(-self.speed, self.speed);
            }
        }

        self.y = self.y.clamp(0.0, max_y);
    }

    /// Axis-aligned overlap test against the ball
    pub fn overlaps(&self, ball: &Ball) -> bool {
        ball.pos.x - ball.radius <= self.x + self.width
            && ball.pos.x + ball.radius >= self.x
            && ball.pos.y + ball.radius >= self.y
            && ball.pos.y - ball.radius <= self.y + self.height
    }
}

/// Complete game state for one match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub width: f32,
    pub height: f32,
    pub ball: Ball,
    /// Human-controlled paddle (left)
    pub player: Paddle,
    /// Computer paddle (right)
    pub opponent: Paddle,
    pub player_score: u32,
    pub opponent_score: u32,
    /// Paddle hits in the current rally
    pub rally_length: u32,
    pub frame_count: u64,
    pub paused: bool,
}

impl GameState {
    pub fn new(arena: &ArenaSettings) -> Self {
        let center = Vec2::new(arena.width / 2.0, arena.height / 2.0);
        let paddle_y = (arena.height - arena.paddle_height) / 2.0;
        Self {
            width: arena.width,
            height: arena.height,
            ball: Ball::new(center, arena.ball_radius, arena.ball_speed),
            player: Paddle::new(30.0, paddle_y, arena, PaddleMotion::Smoothed),
            opponent: Paddle::new(
                arena.width - 30.0 - arena.paddle_width,
                paddle_y,
                arena,
                PaddleMotion::SpeedLimited,
            ),
            player_score: 0,
            opponent_score: 0,
            rally_length: 0,
            frame_count: 0,
            paused: false,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Re-center the ball at serve speed and end the rally
    pub fn reset_ball(&mut self) {
        let center = self.center();
        self.ball.reset(center);
        self.ball.reset_speed();
        self.rally_length = 0;
    }
}
