//! Power-up modifiers
//!
//! Collectible items spawn on the field at an emotion-sensitive cadence. When
//! the ball touches one, its effect activates (or stacks) for a fixed
//! wall-clock duration. Items never despawn on their own.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::affect::Emotion;
use crate::settings::{ArenaSettings, ModifierSettings};
use crate::sim::GameState;

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Player paddle grows by a fixed step per stack
    EnlargePlayerPaddle,
    /// Current ball velocity is multiplied; never rolled back on expiry
    BoostBallSpeed,
    /// Opponent paddle shrinks to base / (1 + stack)
    ShrinkOpponentPaddle,
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 3] = [
        ModifierKind::EnlargePlayerPaddle,
        ModifierKind::BoostBallSpeed,
        ModifierKind::ShrinkOpponentPaddle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModifierKind::EnlargePlayerPaddle => "big_paddle",
            ModifierKind::BoostBallSpeed => "fast_ball",
            ModifierKind::ShrinkOpponentPaddle => "shrink_ai",
        }
    }

    /// HUD glyph
    pub fn symbol(&self) -> char {
        match self {
            ModifierKind::EnlargePlayerPaddle => '+',
            ModifierKind::BoostBallSpeed => 'F',
            ModifierKind::ShrinkOpponentPaddle => '-',
        }
    }

    /// Apply the effect for the given stack size
    ///
    /// Size effects are recomputed from the baseline, so applying the same
    /// stack twice is idempotent. The speed boost compounds on the current
    /// velocity to keep rally momentum.
    pub fn apply(
        self,
        stack: u32,
        state: &mut GameState,
        arena: &ArenaSettings,
        settings: &ModifierSettings,
    ) {
        match self {
            ModifierKind::EnlargePlayerPaddle => {
                state.player.height = arena.paddle_height + settings.paddle_growth * stack as f32;
            }
            ModifierKind::BoostBallSpeed => {
                state.ball.increase_speed(settings.speed_boost);
            }
            ModifierKind::ShrinkOpponentPaddle => {
                state.opponent.height = (arena.paddle_height / (1 + stack) as f32).floor();
            }
        }
    }

    /// Undo the effect on expiry
    pub fn revert(self, state: &mut GameState, arena: &ArenaSettings) {
        match self {
            ModifierKind::EnlargePlayerPaddle => state.player.height = arena.paddle_height,
            // Speed decays only through later pickups or the rally reset
            ModifierKind::BoostBallSpeed => {}
            ModifierKind::ShrinkOpponentPaddle => state.opponent.height = arena.paddle_height,
        }
    }
}

/// A collectible item on the field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modifier {
    pub id: u32,
    pub kind: ModifierKind,
    pub pos: Vec2,
    pub radius: f32,
    /// Seconds since the manager started
    pub spawned_at: f32,
}

impl Modifier {
    /// Circle-circle overlap with the ball
    pub fn touches(&self, ball_pos: Vec2, ball_radius: f32) -> bool {
        self.pos.distance(ball_pos) < self.radius + ball_radius
    }
}

/// A running effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEffect {
    pub kind: ModifierKind,
    pub expires_at: Instant,
    /// Pickups since the effect last started (>= 1)
    pub stack: u32,
}

impl ActiveEffect {
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// Short HUD label: glyph, stack and seconds left, e.g. `+x2 6.5s`
    pub fn badge(&self, now: Instant) -> String {
        format!(
            "{}x{} {:.1}s",
            self.kind.symbol(),
            self.stack,
            self.remaining(now).as_secs_f32()
        )
    }
}

/// Spawns, collects and times modifiers
#[derive(Debug, Clone)]
pub struct ModifierManager {
    items: Vec<Modifier>,
    active: BTreeMap<ModifierKind, ActiveEffect>,
    started_at: Instant,
    last_spawn: Instant,
    next_id: u32,
    arena: ArenaSettings,
    settings: ModifierSettings,
}

impl ModifierManager {
    pub fn new(arena: ArenaSettings, settings: ModifierSettings, now: Instant) -> Self {
        Self {
            items: Vec::new(),
            active: BTreeMap::new(),
            started_at: now,
            last_spawn: now,
            next_id: 1,
            arena,
            settings,
        }
    }

    /// Items waiting on the field
    pub fn field_items(&self) -> &[Modifier] {
        &self.items
    }

    /// Running effects, keyed by kind
    pub fn active_effects(&self) -> &BTreeMap<ModifierKind, ActiveEffect> {
        &self.active
    }

    pub fn stack(&self, kind: ModifierKind) -> u32 {
        self.active.get(&kind).map_or(0, |e| e.stack)
    }

    /// Spawn cadence for the player's current mood
    pub fn spawn_interval(&self, emotion: Emotion) -> Duration {
        let secs = match emotion {
            Emotion::Happy => self.settings.happy_spawn_interval,
            Emotion::Frustrated => self.settings.frustrated_spawn_interval,
            _ => self.settings.spawn_interval,
        };
        Duration::from_secs_f32(secs.max(0.0))
    }

    /// One frame: spawn, expire, collect
    pub fn update<R: Rng>(
        &mut self,
        now: Instant,
        emotion: Emotion,
        state: &mut GameState,
        rng: &mut R,
    ) {
        if now.saturating_duration_since(self.last_spawn) > self.spawn_interval(emotion) {
            self.spawn(now, rng);
            self.last_spawn = now;
        }

        self.expire(now, state);
        self.collect(now, state);
    }

    /// Place a random item inside the safe margin
    pub fn spawn<R: Rng>(&mut self, now: Instant, rng: &mut R) -> &Modifier {
        let margin = self.settings.spawn_margin;
        let x = random_coord(rng, margin, self.arena.width - margin);
        let y = random_coord(rng, margin, self.arena.height - margin);
        let kind = ModifierKind::ALL[rng.random_range(0..ModifierKind::ALL.len())];
        self.spawn_at(kind, Vec2::new(x, y), now)
    }

    /// Place a specific item
    pub fn spawn_at(&mut self, kind: ModifierKind, pos: Vec2, now: Instant) -> &Modifier {
        let id = self.next_id;
        self.next_id += 1;
        log::debug!("Spawned power-up {} at ({:.0}, {:.0})", kind.as_str(), pos.x, pos.y);

        self.items.push(Modifier {
            id,
            kind,
            pos,
            radius: self.settings.item_radius,
            spawned_at: now.saturating_duration_since(self.started_at).as_secs_f32(),
        });
        &self.items[self.items.len() - 1]
    }

    /// Remove items the ball touches and activate each exactly once
    fn collect(&mut self, now: Instant, state: &mut GameState) {
        let ball_pos = state.ball.pos;
        let ball_radius = state.ball.radius;
        let mut picked = Vec::new();
        self.items.retain(|item| {
            if item.touches(ball_pos, ball_radius) {
                picked.push(item.kind);
                false
            } else {
                true
            }
        });

        for kind in picked {
            self.activate(kind, now, state);
        }
    }

    /// Start or stack an effect and apply it at the new stack size
    ///
    /// An entry past its deadline is ended first, so the stack restarts at 1.
    pub fn activate(&mut self, kind: ModifierKind, now: Instant, state: &mut GameState) -> u32 {
        if self.active.get(&kind).is_some_and(|e| now > e.expires_at) {
            self.deactivate(kind, state);
        }

        let expires_at = now + Duration::from_secs_f32(self.settings.effect_duration.max(0.0));
        let effect = self
            .active
            .entry(kind)
            .and_modify(|e| {
                e.stack += 1;
                e.expires_at = expires_at;
            })
            .or_insert(ActiveEffect {
                kind,
                expires_at,
                stack: 1,
            });
        let stack = effect.stack;

        if stack > 1 {
            log::info!("Power-up stacked: {} x{stack}", kind.as_str());
        } else {
            log::info!("Power-up activated: {}", kind.as_str());
        }

        kind.apply(stack, state, &self.arena, &self.settings);
        stack
    }

    /// Deactivate and drop every effect whose expiry has passed
    fn expire(&mut self, now: Instant, state: &mut GameState) {
        let expired: Vec<ModifierKind> = self
            .active
            .values()
            .filter(|e| now > e.expires_at)
            .map(|e| e.kind)
            .collect();

        for kind in expired {
            self.deactivate(kind, state);
        }
    }

    fn deactivate(&mut self, kind: ModifierKind, state: &mut GameState) {
        if self.active.remove(&kind).is_some() {
            log::info!("Power-up ended: {}", kind.as_str());
            kind.revert(state, &self.arena);
        }
    }
}

/// Uniform draw in [lo, hi], collapsing to the midpoint if the range is empty
fn random_coord<R: Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        (lo + hi) / 2.0
    }
}
