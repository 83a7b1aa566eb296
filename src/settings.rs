//! Engine settings and tuning
//!
//! Persisted as a JSON file next to the binary. Every field has a default, so
//! partial files are accepted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Playfield and physics dimensions (screen pixels, per-frame velocities)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    pub width: f32,
    pub height: f32,
    /// Target frame rate of the game loop
    pub fps: u32,
    pub ball_radius: f32,
    /// Initial per-axis ball speed (pixels/frame)
    pub ball_speed: f32,
    pub paddle_width: f32,
    /// Baseline paddle height; size modifiers revert to this
    pub paddle_height: f32,
    pub paddle_speed: f32,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            fps: 30,
            ball_radius: 10.0,
            ball_speed: 5.0,
            paddle_width: 15.0,
            paddle_height: 80.0,
            paddle_speed: 5.0,
        }
    }
}

impl ArenaSettings {
    /// Frame budget derived from the target frame rate
    pub fn frame_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

/// Skill rating and opponent parameter mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultySettings {
    /// Elo K-factor (rating volatility)
    pub k_factor: f64,
    pub default_rating: f64,
    pub min_rating: f64,
    pub max_rating: f64,
    /// Rating mapped to normalized 0.0
    pub reference_low: f64,
    /// Rating mapped to normalized 1.0 ("perfect" opponent)
    pub reference_high: f64,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Even a perfect opponent keeps some aim error
    pub min_error: f32,
    pub max_error: f32,
    /// Reaction delay at normalized 0.0 (frames)
    pub max_reaction_delay: u32,
}

impl Default for DifficultySettings {
    fn default() -> Self {
        Self {
            k_factor: 50.0,
            default_rating: 1000.0,
            min_rating: 100.0,
            max_rating: 3000.0,
            reference_low: 800.0,
            reference_high: 2000.0,
            min_speed: 2.0,
            max_speed: 10.0,
            min_error: 10.0,
            max_error: 150.0,
            max_reaction_delay: 15,
        }
    }
}

/// Frustration tracking and pity thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffectSettings {
    /// Loss streak that triggers pity mode
    pub pity_streak: u32,
    pub pity_multiplier: f32,
    /// Frustration level above which emotional support kicks in
    pub frustration_threshold: f32,
    pub support_multiplier: f32,
    /// Frustration removed on a player win
    pub win_relief: f32,
    /// Frustration added on a player loss
    pub loss_penalty: f32,
    /// Per-sample change for Happy / Frustrated labels
    pub emotion_step: f32,
    /// Extra frustration for a high-arousal, negative-valence sample
    pub stress_bonus: f32,
    pub stress_arousal: f32,
    pub stress_valence: f32,
}

impl Default for AffectSettings {
    fn default() -> Self {
        Self {
            pity_streak: 3,
            pity_multiplier: 0.2,
            frustration_threshold: 0.7,
            support_multiplier: 0.5,
            win_relief: 0.5,
            loss_penalty: 0.2,
            emotion_step: 0.05,
            stress_bonus: 0.02,
            stress_arousal: 0.6,
            stress_valence: -0.2,
        }
    }
}

/// Power-up spawning and effect tuning (seconds, pixels)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierSettings {
    pub spawn_interval: f32,
    /// Happy players get more power-ups
    pub happy_spawn_interval: f32,
    pub frustrated_spawn_interval: f32,
    pub effect_duration: f32,
    /// Keep-out band along every edge of the field
    pub spawn_margin: f32,
    pub item_radius: f32,
    /// Player paddle growth per stack
    pub paddle_growth: f32,
    /// Multiplier applied to the current ball velocity per pickup
    pub speed_boost: f32,
}

impl Default for ModifierSettings {
    fn default() -> Self {
        Self {
            spawn_interval: 5.0,
            happy_spawn_interval: 3.0,
            frustrated_spawn_interval: 6.0,
            effect_duration: 10.0,
            spawn_margin: 100.0,
            item_radius: 15.0,
            paddle_growth: 70.0,
            speed_boost: 1.5,
        }
    }
}

/// Forecasting pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionSettings {
    pub model_path: PathBuf,
    /// Frames per input window (1 second at 30 FPS)
    pub sequence_length: usize,
    /// Worker inbox wait before re-checking the stop flag
    pub poll_timeout_ms: u64,
    /// Vertical offset the opponent adds to aim away from the player
    pub strategy_offset: f32,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/tcn_gesture_model.json"),
            sequence_length: 30,
            poll_timeout_ms: 100,
            strategy_offset: 30.0,
        }
    }
}

/// All engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub arena: ArenaSettings,
    pub difficulty: DifficultySettings,
    pub affect: AffectSettings,
    pub modifiers: ModifierSettings,
    pub prediction: PredictionSettings,
    /// Where the persistent skill rating lives
    pub rating_path: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            arena: ArenaSettings::default(),
            difficulty: DifficultySettings::default(),
            affect: AffectSettings::default(),
            modifiers: ModifierSettings::default(),
            prediction: PredictionSettings::default(),
            rating_path: PathBuf::from("data/player_rating.json"),
        }
    }
}

impl EngineSettings {
    /// Default settings file location
    pub const DEFAULT_PATH: &'static str = "config/engine.json";

    /// Read settings, failing on IO or parse errors
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Read settings, falling back to defaults when the file is missing or bad
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::try_load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(err) => {
                log::warn!("Ignoring settings at {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
