//! Per-frame simulation tick
//!
//! Advances paddles and ball by one frame and reports when a point ends.

use super::state::{Ball, GameState, Paddle, PointOutcome};

/// Speed-up applied on every paddle hit
const PADDLE_HIT_BOOST: f32 = 1.10;
/// Vertical velocity added per unit of off-center hit
const SPIN: f32 = 2.0;

/// Input commands for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pause toggle
    pub pause: bool,
}

/// Advance the game by one frame
pub fn tick(state: &mut GameState, input: &TickInput) -> Option<PointOutcome> {
    if input.pause {
        state.paused = !state.paused;
    }
    if state.paused {
        return None;
    }

    state.frame_count += 1;

    state.player.update(state.height);
    state.opponent.update(state.height);

    if deflect(&mut state.ball, &state.player) || deflect(&mut state.ball, &state.opponent) {
        state.rally_length += 1;
        state.ball.increase_speed(PADDLE_HIT_BOOST);
    }

    let outcome = advance_ball(&mut state.ball, state.width, state.height);
    match outcome {
        Some(PointOutcome::PlayerWon) => state.player_score += 1,
        Some(PointOutcome::OpponentWon) => state.opponent_score += 1,
        None => {}
    }
    if outcome.is_some() {
        state.reset_ball();
    }
    outcome
}

/// Move the ball, bounce off top/bottom walls, detect scoring
fn advance_ball(ball: &mut Ball, width: f32, height: f32) -> Option<PointOutcome> {
    ball.pos += ball.vel;

    if ball.pos.y - ball.radius <= 0.0 || ball.pos.y + ball.radius >= height {
        ball.vel.y = -ball.vel.y;
        ball.pos.y = ball.pos.y.clamp(ball.radius, height - ball.radius);
    }

    if ball.pos.x - ball.radius <= 0.0 {
        Some(PointOutcome::OpponentWon)
    } else if ball.pos.x + ball.radius >= width {
        Some(PointOutcome::PlayerWon)
    } else {
        None
    }
}

/// Reflect the ball off a paddle with spin; returns true on a hit
fn deflect(ball: &mut Ball, paddle: &Paddle) -> bool {
    if !paddle.overlaps(ball) {
        return false;
    }

    ball.vel.x = -ball.vel.x;

    // Spin from where the ball struck the paddle (-1 top edge, +1 bottom edge)
    let hit_pos = (ball.pos.y - paddle.center_y()) / (paddle.height / 2.0);
    let max_vy = ball.base_speed * 1.5;
    ball.vel.y = (ball.vel.y + hit_pos * SPIN).clamp(-max_vy, max_vy);

    // Push out so the next frame doesn't hit again
    ball.pos.x = if ball.vel.x > 0.0 {
        paddle.x + paddle.width + ball.radius
    } else {
        paddle.x - ball.radius
    };
    true
}
