//! Adaptive Pong headless demo
//!
//! Runs one frame-paced session against a synthetic player whose hand lags
//! behind the ball and whose mood drifts over time. Set `RUST_LOG=info` to
//! watch the rating, pity mode and power-ups react.
//!
//! Usage: `adaptive-pong [settings.json]`

use std::env;
use std::thread;
use std::time::Instant;

use adaptive_pong::affect::{Emotion, EmotionSample};
use adaptive_pong::session::{FrameInput, Session};
use adaptive_pong::settings::EngineSettings;
use adaptive_pong::sim::GameState;

/// One minute of play
const DEMO_FRAMES: u64 = 30 * 60;
/// Fraction of the gap to the ball the synthetic hand closes each frame
const HAND_LAG: f32 = 0.12;
/// Frames between mood changes
const MOOD_PERIOD: u64 = 150;

/// Stand-in for the hand and face trackers
struct SyntheticPlayer {
    finger_y: f32,
}

impl SyntheticPlayer {
    fn new(state: &GameState) -> Self {
        Self {
            finger_y: state.height / 2.0,
        }
    }

    fn observe(&mut self, state: &GameState, frame: u64) -> FrameInput {
        self.finger_y += (state.ball.pos.y - self.finger_y) * HAND_LAG;

        const MOODS: [(Emotion, f32, f32); 4] = [
            (Emotion::Neutral, 0.0, 0.3),
            (Emotion::Focused, 0.1, 0.5),
            (Emotion::Frustrated, -0.6, 0.8),
            (Emotion::Happy, 0.7, 0.6),
        ];
        let (label, valence, arousal) = MOODS[((frame / MOOD_PERIOD) % MOODS.len() as u64) as usize];

        FrameInput {
            finger_y: Some(self.finger_y),
            emotion: Some(EmotionSample::new(label, valence, arousal)),
            pause: false,
        }
    }
}

fn main() {
    env_logger::init();
    log::info!("Adaptive Pong (headless) starting...");

    let settings_path = env::args()
        .nth(1)
        .unwrap_or_else(|| EngineSettings::DEFAULT_PATH.to_string());
    let settings = EngineSettings::load(&settings_path);

    let mut session = Session::open(settings, Instant::now());
    let frame_duration = session.settings().arena.frame_duration();
    let mut player = SyntheticPlayer::new(session.state());

    for frame in 0..DEMO_FRAMES {
        let started = Instant::now();
        let input = player.observe(session.state(), frame);
        let report = session.frame(&input, started);

        if let Some(outcome) = report.outcome {
            let hud = session.hud();
            let mood = input.emotion.unwrap_or_default().label;
            let effects: Vec<String> = hud
                .active_effects
                .iter()
                .map(|effect| effect.badge(started))
                .collect();
            log::info!(
                "{:?}: rating {:.0}, multiplier {:.1}, frustration {:.2}, streak {}, mood {}, effects [{}]",
                outcome,
                hud.rating,
                hud.multiplier,
                hud.frustration,
                hud.loss_streak,
                mood.as_str(),
                effects.join(" ")
            );
        }

        if let Some(rest) = frame_duration.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    let state = session.state();
    log::info!(
        "Final score {} - {}",
        state.player_score,
        state.opponent_score
    );
    session.shutdown();
}
