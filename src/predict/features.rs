//! Feature extraction from live game state

use super::window::FeatureVector;
use crate::consts::VELOCITY_SCALE;
use crate::sim::GameState;

/// Build the model input for this frame
///
/// Layout: ball x, ball y, ball vx, ball vy, player paddle y, finger y.
/// Positions are divided by the arena size, velocities by `VELOCITY_SCALE`.
/// An untracked hand reads as 0.
pub fn extract_features(state: &GameState, finger_y: Option<f32>) -> FeatureVector {
    let ball = &state.ball;
    [
        ball.pos.x / state.width,
        ball.pos.y / state.height,
        ball.vel.x / VELOCITY_SCALE,
        ball.vel.y / VELOCITY_SCALE,
        state.player.y / state.height,
        finger_y.unwrap_or(0.0) / state.height,
    ]
}
