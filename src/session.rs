//! One game run
//!
//! [`Session`] owns every subsystem and drives them in a fixed order each
//! frame. Nothing here is global: dropping the session stops the forecast
//! worker and releases everything.

use std::time::Instant;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::affect::{AffectiveModulator, Emotion, EmotionSample};
use crate::difficulty::{DifficultyCoordinator, OpponentAi};
use crate::powerup::{ActiveEffect, Modifier, ModifierManager};
use crate::predict::{PredictionPipeline, extract_features};
use crate::rating::{JsonRatingStore, OpponentParameters, RatingStore, SkillRatingSystem};
use crate::settings::EngineSettings;
use crate::sim::{GameState, PointOutcome, TickInput, tick};

/// Everything the outside world reports for one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    /// Tracked fingertip height in screen pixels, if a hand is visible
    pub finger_y: Option<f32>,
    pub emotion: Option<EmotionSample>,
    /// Pause toggle
    pub pause: bool,
}

/// What happened this frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub outcome: Option<PointOutcome>,
    /// Signed rating change when a point ended
    pub rating_delta: Option<f64>,
    /// Forecast player position used for aiming (screen pixels)
    pub forecast: Option<f32>,
}

/// Values the UI displays
#[derive(Debug, Clone, Serialize)]
pub struct Hud {
    pub rating: f64,
    pub multiplier: f32,
    pub frustration: f32,
    pub loss_streak: u32,
    pub forecast: Option<f32>,
    #[serde(skip)]
    pub active_effects: Vec<ActiveEffect>,
    pub field_items: Vec<Modifier>,
}

/// Owns all engine state for one run
pub struct Session {
    settings: EngineSettings,
    state: GameState,
    rating: SkillRatingSystem<Box<dyn RatingStore + Send>>,
    affect: AffectiveModulator,
    modifiers: ModifierManager,
    pipeline: PredictionPipeline,
    ai: OpponentAi,
    /// Last reported emotion label; drives the power-up cadence
    emotion: Emotion,
    rng: Pcg32,
}

impl Session {
    pub fn new(
        settings: EngineSettings,
        store: Box<dyn RatingStore + Send>,
        pipeline: PredictionPipeline,
        seed: u64,
        now: Instant,
    ) -> Self {
        let state = GameState::new(&settings.arena);
        let rating = SkillRatingSystem::new(store, settings.difficulty.clone());
        let mut affect = AffectiveModulator::new(settings.affect.clone());
        let modifiers =
            ModifierManager::new(settings.arena.clone(), settings.modifiers.clone(), now);
        let ai = OpponentAi::new(DifficultyCoordinator::resolve(&rating, &mut affect));

        log::info!(
            "Session started (rating {:.0}, forecasting {}, seed {seed})",
            rating.rating(),
            if pipeline.is_enabled() { "on" } else { "off" }
        );

        Self {
            settings,
            state,
            rating,
            affect,
            modifiers,
            pipeline,
            ai,
            emotion: Emotion::default(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Session with the on-disk rating store and model artifact from `settings`
    pub fn open(settings: EngineSettings, now: Instant) -> Self {
        let store = Box::new(JsonRatingStore::new(settings.rating_path.clone()));
        log::debug!("Rating store: {}", store.path().display());
        let pipeline =
            PredictionPipeline::from_settings(&settings.prediction, settings.arena.height);
        Self::new(settings, store, pipeline, rand::random(), now)
    }

    /// Advance one frame
    pub fn frame(&mut self, input: &FrameInput, now: Instant) -> FrameReport {
        if let Some(finger_y) = input.finger_y {
            let half = self.state.player.height / 2.0;
            self.state.player.set_target(finger_y - half);
        }

        // Paused after this frame's toggle is applied
        let paused = self.state.paused != input.pause;
        if !paused {
            if let Some(sample) = input.emotion {
                if sample.label != self.emotion {
                    log::debug!("Mood now {}", sample.label.as_str());
                }
                self.emotion = sample.label;
                self.affect.on_emotion_sample(sample);
            }
            // Pickups are checked against the ball before it moves
            self.modifiers
                .update(now, self.emotion, &mut self.state, &mut self.rng);
        }

        let outcome = tick(&mut self.state, &TickInput { pause: input.pause });
        if self.state.paused {
            // The hand keeps moving the paddle; nothing else advances
            self.state.player.update(self.state.height);
            return FrameReport {
                forecast: self.pipeline.forecast(),
                ..FrameReport::default()
            };
        }

        let rating_delta = outcome.map(|outcome| self.resolve_point(outcome));

        self.pipeline
            .push(extract_features(&self.state, input.finger_y));
        let forecast = self.pipeline.forecast();

        self.ai.steer(
            &mut self.state,
            forecast,
            self.settings.prediction.strategy_offset,
            &mut self.rng,
        );

        FrameReport {
            outcome,
            rating_delta,
            forecast,
        }
    }

    /// Rating, mood and opponent updates for a finished point
    fn resolve_point(&mut self, outcome: PointOutcome) -> f64 {
        let won = outcome.player_won();
        let delta = self.rating.update(won);
        self.affect.on_outcome(won);

        log::info!(
            "{} ({}-{}), rating {:.0} ({delta:+.0})",
            if won { "Player scores" } else { "Opponent scores" },
            self.state.player_score,
            self.state.opponent_score,
            self.rating.rating()
        );

        let params = DifficultyCoordinator::resolve(&self.rating, &mut self.affect);
        self.ai.set_parameters(params);
        delta
    }

    pub fn hud(&self) -> Hud {
        Hud {
            rating: self.rating.rating(),
            multiplier: self.affect.multiplier(),
            frustration: self.affect.frustration(),
            loss_streak: self.affect.loss_streak(),
            forecast: self.pipeline.forecast(),
            active_effects: self.modifiers.active_effects().values().copied().collect(),
            field_items: self.modifiers.field_items().to_vec(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn modifiers(&self) -> &ModifierManager {
        &self.modifiers
    }

    pub fn modifiers_mut(&mut self) -> &mut ModifierManager {
        &mut self.modifiers
    }

    pub fn opponent_parameters(&self) -> OpponentParameters {
        self.ai.parameters()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Stop the forecast worker; the session keeps running without forecasts
    pub fn shutdown(&mut self) {
        self.pipeline.stop();
        log::info!("Session ended at rating {:.0}", self.rating.rating());
    }
}
