//! Persistent skill rating
//!
//! A single Elo-style rating tracks how good the player is across sessions.
//! The rating is updated once per point against a hypothetical evenly matched
//! opponent and mapped onto the computer opponent's motion parameters.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::settings::DifficultySettings;

/// On-disk rating record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub rating: f64,
}

/// Durable home for the player's rating
pub trait RatingStore {
    /// Read the stored rating; `Ok(None)` on first run
    fn load(&self) -> Result<Option<f64>, StoreError>;

    /// Persist the rating
    fn save(&mut self, rating: f64) -> Result<(), StoreError>;
}

/// JSON file store: `{"rating": 1000.0}`
#[derive(Debug, Clone)]
pub struct JsonRatingStore {
    path: PathBuf,
}

impl JsonRatingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RatingStore for JsonRatingStore {
    fn load(&self) -> Result<Option<f64>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        let record: RatingRecord = serde_json::from_str(&json)?;
        Ok(Some(record.rating))
    }

    fn save(&mut self, rating: f64) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(&RatingRecord { rating })?)?;
        Ok(())
    }
}

/// In-memory store for tests and sessions that should not touch disk
#[derive(Debug, Clone, Default)]
pub struct MemoryRatingStore {
    pub rating: Option<f64>,
    /// Number of successful saves
    pub saves: usize,
}

impl MemoryRatingStore {
    pub fn with_rating(rating: f64) -> Self {
        Self {
            rating: Some(rating),
            saves: 0,
        }
    }
}

impl RatingStore for MemoryRatingStore {
    fn load(&self) -> Result<Option<f64>, StoreError> {
        Ok(self.rating)
    }

    fn save(&mut self, rating: f64) -> Result<(), StoreError> {
        self.rating = Some(rating);
        self.saves += 1;
        Ok(())
    }
}

impl<S: RatingStore + ?Sized> RatingStore for Box<S> {
    fn load(&self) -> Result<Option<f64>, StoreError> {
        (**self).load()
    }

    fn save(&mut self, rating: f64) -> Result<(), StoreError> {
        (**self).save(rating)
    }
}

/// Opponent motion parameters derived from the rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpponentParameters {
    /// Maximum paddle travel per frame (pixels)
    pub speed: f32,
    /// Half-width of the uniform aim noise (pixels)
    pub error_margin: f32,
    /// Frames between observing the ball and acting on it
    pub reaction_delay: u32,
}

/// Rating owner: update per point, persist, map to opponent parameters
#[derive(Debug)]
pub struct SkillRatingSystem<S: RatingStore> {
    rating: f64,
    store: S,
    settings: DifficultySettings,
}

impl<S: RatingStore> SkillRatingSystem<S> {
    /// Load the rating from the store, falling back to the default
    pub fn new(store: S, settings: DifficultySettings) -> Self {
        let rating = match store.load() {
            Ok(Some(rating)) if rating.is_finite() => {
                log::info!("Loaded player rating: {rating:.0}");
                rating.clamp(settings.min_rating, settings.max_rating)
            }
            Ok(Some(rating)) => {
                log::warn!("Stored rating {rating} is not finite, using default");
                settings.default_rating
            }
            Ok(None) => {
                log::info!("No stored rating, starting at {:.0}", settings.default_rating);
                settings.default_rating
            }
            Err(err) => {
                log::warn!("Error loading rating: {err}");
                settings.default_rating
            }
        };
        Self {
            rating,
            store,
            settings,
        }
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply one point's result and persist; returns the signed change
    ///
    /// The expected score is fixed at 0.5 rather than derived from a rating
    /// difference: the opponent is assumed to always be matched to the player.
    /// Difficulty curves are tuned against this, so a win is always +K/2 and
    /// a loss -K/2 before clamping.
    pub fn update(&mut self, player_won: bool) -> f64 {
        const EXPECTED_SCORE: f64 = 0.5;
        let actual = if player_won { 1.0 } else { 0.0 };
        let delta = self.settings.k_factor * (actual - EXPECTED_SCORE);

        self.rating =
            (self.rating + delta).clamp(self.settings.min_rating, self.settings.max_rating);

        if let Err(err) = self.store.save(self.rating) {
            log::warn!("Error saving rating: {err}");
        }
        delta
    }

    /// Rating mapped onto [0, 1] over the reference window
    pub fn normalized(&self) -> f64 {
        let s = &self.settings;
        ((self.rating - s.reference_low) / (s.reference_high - s.reference_low)).clamp(0.0, 1.0)
    }

    /// Opponent parameters for the current rating
    ///
    /// Higher rating: faster paddle, smaller aim error, shorter reaction delay.
    pub fn parameters(&self) -> OpponentParameters {
        let s = &self.settings;
        let t = self.normalized() as f32;
        let max_delay = s.max_reaction_delay as f32;

        OpponentParameters {
            speed: s.min_speed + (s.max_speed - s.min_speed) * t,
            error_margin: s.max_error - (s.max_error - s.min_error) * t,
            reaction_delay: (max_delay - (t * max_delay).floor()).max(0.0) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// A store whose every operation fails
    struct BrokenStore;

    impl RatingStore for BrokenStore {
        fn load(&self) -> Result<Option<f64>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }

        fn save(&mut self, _rating: f64) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }
    }

    fn system_at(rating: f64) -> SkillRatingSystem<MemoryRatingStore> {
        SkillRatingSystem::new(
            MemoryRatingStore::with_rating(rating),
            DifficultySettings::default(),
        )
    }

    #[test]
    fn test_first_run_defaults_to_1000() {
        let system = SkillRatingSystem::new(MemoryRatingStore::default(), DifficultySettings::default());
        assert_eq!(system.rating(), 1000.0);
    }

    #[test]
    fn test_win_and_loss_move_by_half_k() {
        let mut system = system_at(1000.0);
        assert_eq!(system.update(true), 25.0);
        assert_eq!(system.rating(), 1025.0);
        assert_eq!(system.update(false), -25.0);
        assert_eq!(system.rating(), 1000.0);
        assert_eq!(system.store().saves, 2);
        assert_eq!(system.store().rating, Some(1000.0));
    }

    #[test]
    fn test_rating_clamps_at_bounds() {
        let mut system = system_at(110.0);
        let delta = system.update(false);
        assert_eq!(delta, -25.0, "delta is reported before clamping");
        assert_eq!(system.rating(), 100.0);

        let mut system = system_at(2990.0);
        system.update(true);
        assert_eq!(system.rating(), 3000.0);
    }

    #[test]
    fn test_out_of_range_stored_rating_is_clamped() {
        assert_eq!(system_at(5000.0).rating(), 3000.0);
        assert_eq!(system_at(f64::NAN).rating(), 1000.0);
    }

    #[test]
    fn test_store_failures_are_not_fatal() {
        let mut system = SkillRatingSystem::new(BrokenStore, DifficultySettings::default());
        assert_eq!(system.rating(), 1000.0);
        assert_eq!(system.update(true), 25.0);
        assert_eq!(system.rating(), 1025.0, "in-memory rating still advances");
    }

    #[test]
    fn test_parameters_at_reference_window_edges() {
        let low = system_at(800.0).parameters();
        assert_eq!(low.speed, 2.0);
        assert_eq!(low.error_margin, 150.0);
        assert_eq!(low.reaction_delay, 15);

        let high = system_at(2000.0).parameters();
        assert_eq!(high.speed, 10.0);
        assert_eq!(high.error_margin, 10.0);
        assert_eq!(high.reaction_delay, 0);

        // Outside the window clamps to the edges
        assert_eq!(system_at(300.0).parameters(), low);
        assert_eq!(system_at(2900.0).parameters(), high);
    }

    #[test]
    fn test_parameters_midpoint() {
        let mid = system_at(1400.0).parameters();
        assert!((mid.speed - 6.0).abs() < 1e-5);
        assert!((mid.error_margin - 80.0).abs() < 1e-4);
        assert_eq!(mid.reaction_delay, 8);
    }

    #[test]
    fn test_json_store_first_run_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("player_rating.json");

        let mut store = JsonRatingStore::new(&path);
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.load().unwrap(), None);

        store.save(1075.0).unwrap();
        assert_eq!(JsonRatingStore::new(&path).load().unwrap(), Some(1075.0));

        let system = SkillRatingSystem::new(JsonRatingStore::new(&path), DifficultySettings::default());
        assert_eq!(system.rating(), 1075.0);
    }

    #[test]
    fn test_json_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player_rating.json");
        fs::write(&path, "garbage").unwrap();

        assert!(matches!(JsonRatingStore::new(&path).load(), Err(StoreError::Json(_))));
        let system = SkillRatingSystem::new(JsonRatingStore::new(&path), DifficultySettings::default());
        assert_eq!(system.rating(), 1000.0);
    }

    proptest! {
        #[test]
        fn prop_rating_stays_in_bounds(start in 100.0f64..3000.0, outcomes in prop::collection::vec(any::<bool>(), 0..200)) {
            let mut system = system_at(start);
            for won in outcomes {
                let delta = system.update(won);
                prop_assert_eq!(delta, if won { 25.0 } else { -25.0 });
                prop_assert!((100.0..=3000.0).contains(&system.rating()));
            }
        }

        #[test]
        fn prop_parameters_monotonic(a in 800.0f64..2000.0, b in 800.0f64..2000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let p_lo = system_at(lo).parameters();
            let p_hi = system_at(hi).parameters();
            prop_assert!(p_lo.speed <= p_hi.speed);
            prop_assert!(p_lo.error_margin >= p_hi.error_margin);
            prop_assert!(p_lo.reaction_delay >= p_hi.reaction_delay);
        }
    }
}
