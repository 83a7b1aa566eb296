//! Rolling feature window
//!
//! Holds the most recent `capacity` frames in chronological order; pushing a
//! frame into a full window evicts the oldest one.

use std::collections::VecDeque;

use crate::consts::FEATURE_COUNT;

/// One frame of normalized game-state scalars
pub type FeatureVector = [f32; FEATURE_COUNT];

/// Sliding window of feature vectors, oldest first
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    frames: VecDeque<FeatureVector>,
    capacity: usize,
}

impl FeatureWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest once full
    pub fn push(&mut self, features: FeatureVector) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(features);
    }

    /// Whether the window holds a full sequence
    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy in chronological order, for handing to the worker
    pub fn snapshot(&self) -> Vec<FeatureVector> {
        self.frames.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(v: f32) -> FeatureVector {
        [v; FEATURE_COUNT]
    }

    #[test]
    fn test_fills_then_slides() {
        let mut window = FeatureWindow::new(3);
        window.push(frame(1.0));
        window.push(frame(2.0));
        assert!(!window.is_full());

        window.push(frame(3.0));
        assert!(window.is_full());
        window.push(frame(4.0));
        assert_eq!(window.len(), 3);
        assert_eq!(window.snapshot(), vec![frame(2.0), frame(3.0), frame(4.0)]);
    }

    #[test]
    fn test_clear() {
        let mut window = FeatureWindow::new(2);
        window.push(frame(1.0));
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 2);
    }
}
