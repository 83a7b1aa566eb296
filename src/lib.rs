//! Adaptive Pong - difficulty and prediction engine
//!
//! Core modules:
//! - `rating`: Persistent skill rating and opponent parameter mapping
//! - `affect`: Loss-streak and frustration based difficulty override
//! - `powerup`: Timed, stackable gameplay modifiers
//! - `predict`: Asynchronous forecast of the player's next paddle position
//! - `difficulty`: Composition of the above into opponent behavior
//! - `session`: One game run, owning every subsystem
//! - `sim`: Minimal Pong state the engine tunes and mutates

pub mod affect;
pub mod difficulty;
pub mod error;
pub mod powerup;
pub mod predict;
pub mod rating;
pub mod session;
pub mod settings;
pub mod sim;

pub use affect::{AffectiveModulator, Emotion, EmotionSample, FrustrationState};
pub use difficulty::{DifficultyCoordinator, OpponentAi};
pub use error::{ModelError, SettingsError, StoreError};
pub use powerup::{ActiveEffect, Modifier, ModifierKind, ModifierManager};
pub use predict::{FeatureVector, FeatureWindow, Forecaster, PredictionPipeline, TcnModel};
pub use rating::{JsonRatingStore, MemoryRatingStore, OpponentParameters, RatingStore, SkillRatingSystem};
pub use session::{FrameInput, FrameReport, Hud, Session};
pub use settings::EngineSettings;

/// Fixed engine constants (tunables live in `settings`)
pub mod consts {
    /// Scalars per feature vector: ball x, y, vx, vy, paddle y, finger y
    pub const FEATURE_COUNT: usize = 6;
    /// Ball velocity normalization divisor for model features
    pub const VELOCITY_SCALE: f32 = 20.0;
    /// Horizontal ball speed cap as a multiple of serve speed
    pub const BALL_SPEED_CAP: f32 = 2.5;
}
