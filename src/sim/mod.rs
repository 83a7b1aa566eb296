//! Minimal Pong simulation
//!
//! The engine tunes and mutates this state but does not own its physics:
//! - Pure per-frame tick, no rendering or platform dependencies
//! - Screen-space units so forecasts and aim targets share one frame

pub mod state;
pub mod tick;

pub use state::{Ball, GameState, Paddle, PaddleMotion, PointOutcome};
pub use tick::{TickInput, tick};
