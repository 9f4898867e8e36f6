//! Spawn point rotation.
//!
//! A random draw without replacement from the available pool. The pool is
//! refilled from the defaults once it runs dry, so over a long run every
//! point is used equally often.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;

/// World position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Random spawn point selector for one team.
#[derive(Clone, Debug)]
pub struct SpawnSelector<P> {
    defaults: Vec<P>,
    available: Vec<P>,
    rng: DeterministicRng,
}

impl<P: Clone> SpawnSelector<P> {
    /// Create from the spawn set's points.
    pub fn new(points: Vec<P>, seed: u64) -> Self {
        Self {
            available: points.clone(),
            defaults: points,
            rng: DeterministicRng::new(seed),
        }
    }

    /// Total points in rotation.
    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    /// No points at all.
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }

    /// Points left before the next refill.
    pub fn remaining(&self) -> usize {
        self.available.len()
    }

    /// Remove and return a random point from the available pool.
    pub fn get_spawn_point(&mut self) -> Option<P> {
        if self.available.is_empty() {
            self.available = self.defaults.clone();
        }
        if self.available.is_empty() {
            return None;
        }

        let index = self.rng.next_index(self.available.len());
        Some(self.available.swap_remove(index))
    }

    /// Permanently take a point out of rotation (objective locations).
    pub fn reserve_spawn_point(&mut self, index: usize) -> Option<P> {
        if index >= self.defaults.len() {
            return None;
        }

        let point = self.defaults.remove(index);
        self.available = self.defaults.clone();
        Some(point)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_empty_selector() {
        let mut s: SpawnSelector<u32> = SpawnSelector::new(Vec::new(), 1);
        assert!(s.get_spawn_point().is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn test_single_point_repeats() {
        let mut s = SpawnSelector::new(vec![Position::new(1.0, 2.0, 3.0)], 9);
        for _ in 0..5 {
            assert_eq!(s.get_spawn_point(), Some(Position::new(1.0, 2.0, 3.0)));
        }
    }

    #[test]
    fn test_reserve_removes_from_rotation() {
        let mut s = SpawnSelector::new(vec![10, 20, 30], 4);
        assert_eq!(s.reserve_spawn_point(1), Some(20));
        assert_eq!(s.len(), 2);
        assert_eq!(s.remaining(), 2);

        for _ in 0..20 {
            assert_ne!(s.get_spawn_point(), Some(20));
        }
        assert_eq!(s.reserve_spawn_point(5), None);
    }

    #[test]
    fn test_same_seed_same_rotation() {
        let points: Vec<u32> = (0..8).collect();
        let mut a = SpawnSelector::new(points.clone(), 77);
        let mut b = SpawnSelector::new(points, 77);
        for _ in 0..24 {
            assert_eq!(a.get_spawn_point(), b.get_spawn_point());
        }
    }

    proptest! {
        #[test]
        fn prop_every_point_once_before_repeat(n in 1usize..40, seed in any::<u64>(), rounds in 1usize..4) {
            let points: Vec<usize> = (0..n).collect();
            let mut s = SpawnSelector::new(points, seed);

            for _ in 0..rounds {
                let drawn: BTreeSet<usize> = (0..n)
                    .map(|_| s.get_spawn_point().unwrap())
                    .collect();
                prop_assert_eq!(drawn.len(), n);
            }
        }
    }
}
