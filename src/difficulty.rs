//! Opponent difficulty composition and control
//!
//! [`DifficultyCoordinator`] runs once per point: rating-derived parameters,
//! scaled by the affective multiplier. [`OpponentAi`] runs every frame and
//! turns those parameters plus the player forecast into a paddle target.

use std::collections::VecDeque;

use rand::Rng;

use crate::affect::AffectiveModulator;
use crate::rating::{OpponentParameters, RatingStore, SkillRatingSystem};
use crate::sim::GameState;

/// Stateless composition of rating and mood into opponent parameters
pub struct DifficultyCoordinator;

impl DifficultyCoordinator {
    /// Weaken `params` by `multiplier` when it is below 1.0
    ///
    /// Speed scales down and aim error scales up; reaction delay is untouched.
    pub fn compose(params: OpponentParameters, multiplier: f32) -> OpponentParameters {
        if !(multiplier > 0.0 && multiplier < 1.0) {
            return params;
        }
        OpponentParameters {
            speed: params.speed * multiplier,
            error_margin: params.error_margin / multiplier,
            ..params
        }
    }

    /// Fresh parameters for the next point
    pub fn resolve<S: RatingStore>(
        rating: &SkillRatingSystem<S>,
        affect: &mut AffectiveModulator,
    ) -> OpponentParameters {
        let params = Self::compose(rating.parameters(), affect.multiplier_logged());
        log::debug!(
            "Opponent parameters: speed {:.2}, error {:.1}, delay {}",
            params.speed,
            params.error_margin,
            params.reaction_delay
        );
        params
    }
}

/// Per-frame opponent paddle controller
#[derive(Debug, Clone)]
pub struct OpponentAi {
    params: OpponentParameters,
    /// Recent targets, oldest first; the front is what the paddle acts on
    pending: VecDeque<f32>,
}

impl OpponentAi {
    pub fn new(params: OpponentParameters) -> Self {
        Self {
            params,
            pending: VecDeque::new(),
        }
    }

    pub fn parameters(&self) -> OpponentParameters {
        self.params
    }

    pub fn set_parameters(&mut self, params: OpponentParameters) {
        self.params = params;
    }

    /// Aim for this frame
    ///
    /// Tracks the ball while it approaches. With a forecast, the target is
    /// pushed `strategy_offset` toward the half the player is not expected to
    /// cover. Aim noise applies every frame. An idle opponent drifts back to
    /// the centre.
    pub fn target<R: Rng>(
        &self,
        state: &GameState,
        forecast: Option<f32>,
        strategy_offset: f32,
        rng: &mut R,
    ) -> f32 {
        let paddle = &state.opponent;
        if !state.ball.moving_right() {
            return state.height / 2.0 - paddle.height / 2.0;
        }

        let mut target = state.ball.pos.y - paddle.height / 2.0;
        if let Some(predicted_y) = forecast {
            target += if predicted_y < state.height / 2.0 {
                strategy_offset
            } else {
                -strategy_offset
            };
        }

        let noise = (rng.random::<f32>() - 0.5) * 2.0 * self.params.error_margin;
        target + noise
    }

    /// Compute this frame's target and hand the delayed one to the paddle
    pub fn steer<R: Rng>(
        &mut self,
        state: &mut GameState,
        forecast: Option<f32>,
        strategy_offset: f32,
        rng: &mut R,
    ) {
        let target = self.target(state, forecast, strategy_offset, rng);

        self.pending.push_back(target);
        while self.pending.len() > self.params.reaction_delay as usize + 1 {
            self.pending.pop_front();
        }

        let delayed = self.pending.front().copied().unwrap_or(target);
        state.opponent.speed = self.params.speed;
        state.opponent.set_target(delayed);
    }
}
