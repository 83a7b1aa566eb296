//! Affective difficulty modulation
//!
//! Two independent signals, combined rather than replaced:
//! - a discrete loss streak (pity mode after repeated losses)
//! - a continuous frustration level fed by point outcomes and emotion samples
//!
//! State is session-scoped and never persisted.

use serde::{Deserialize, Serialize};

use crate::settings::AffectSettings;

/// Emotion labels reported by the face tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Focused,
    Surprised,
    Poggers,
    Frustrated,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "Neutral",
            Emotion::Happy => "Happy",
            Emotion::Focused => "Focused",
            Emotion::Surprised => "Surprised",
            Emotion::Poggers => "Poggers",
            Emotion::Frustrated => "Frustrated",
        }
    }
}

/// One emotion reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionSample {
    pub label: Emotion,
    /// Negative to positive affect, [-1, 1]
    pub valence: f32,
    /// Calm to excited, [0, 1]
    pub arousal: f32,
}

impl EmotionSample {
    pub fn new(label: Emotion, valence: f32, arousal: f32) -> Self {
        Self {
            label,
            valence,
            arousal,
        }
        .clamped()
    }

    /// Clamp to the declared ranges; NaN reads as neutral
    pub fn clamped(self) -> Self {
        let valence = if self.valence.is_nan() { 0.0 } else { self.valence.clamp(-1.0, 1.0) };
        let arousal = if self.arousal.is_nan() { 0.0 } else { self.arousal.clamp(0.0, 1.0) };
        Self {
            label: self.label,
            valence,
            arousal,
        }
    }
}

/// Snapshot of the modulator's state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrustrationState {
    pub loss_streak: u32,
    /// [0, 1]
    pub frustration_level: f32,
}

/// Tracks short-term distress and turns it into a difficulty multiplier
#[derive(Debug, Clone)]
pub struct AffectiveModulator {
    state: FrustrationState,
    settings: AffectSettings,
    /// Pity mode on the previous query (for edge-triggered logging)
    pity_logged: bool,
}

impl AffectiveModulator {
    pub fn new(settings: AffectSettings) -> Self {
        Self {
            state: FrustrationState::default(),
            settings,
            pity_logged: false,
        }
    }

    pub fn state(&self) -> FrustrationState {
        self.state
    }

    pub fn loss_streak(&self) -> u32 {
        self.state.loss_streak
    }

    pub fn frustration(&self) -> f32 {
        self.state.frustration_level
    }

    fn adjust(&mut self, delta: f32) {
        self.state.frustration_level = (self.state.frustration_level + delta).clamp(0.0, 1.0);
    }

    /// Point outcome: a win clears the streak and relieves frustration
    pub fn on_outcome(&mut self, player_won: bool) {
        if player_won {
            self.state.loss_streak = 0;
            self.adjust(-self.settings.win_relief);
        } else {
            self.state.loss_streak += 1;
            self.adjust(self.settings.loss_penalty);
        }
    }

    /// Per-frame emotion reading
    pub fn on_emotion_sample(&mut self, sample: EmotionSample) {
        let sample = sample.clamped();
        let s = &self.settings;
        let step = match sample.label {
            Emotion::Frustrated => s.emotion_step,
            Emotion::Happy => -s.emotion_step,
            _ => 0.0,
        };
        // High arousal with negative valence reads as stress
        let stress = if sample.arousal > s.stress_arousal && sample.valence < s.stress_valence {
            s.stress_bonus
        } else {
            0.0
        };
        self.adjust(step);
        self.adjust(stress);
    }

    /// Whether the loss streak has triggered pity mode
    pub fn pity_active(&self) -> bool {
        self.state.loss_streak >= self.settings.pity_streak
    }

    /// Multiplier for opponent difficulty; below 1.0 makes the opponent weaker
    ///
    /// Pity mode overrides everything, then frustration, else no change.
    pub fn multiplier(&self) -> f32 {
        if self.pity_active() {
            self.settings.pity_multiplier
        } else if self.state.frustration_level > self.settings.frustration_threshold {
            self.settings.support_multiplier
        } else {
            1.0
        }
    }

    /// `multiplier`, logging when pity mode switches on
    pub fn multiplier_logged(&mut self) -> f32 {
        let pity = self.pity_active();
        if pity && !self.pity_logged {
            log::info!("Pity mode active (streak: {})", self.state.loss_streak);
        }
        self.pity_logged = pity;
        self.multiplier()
    }
}
