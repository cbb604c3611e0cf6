//! Live lane occupancy
//!
//! Per-lane busy-until timestamps, updated as captions are actually spawned.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Busy-until timestamp per lane (wall-clock ms)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneState {
    busy_until: Vec<u64>,
}

impl LaneState {
    /// All lanes free; at least one lane is always kept
    #[must_use]
    pub fn new(lane_count: usize) -> Self {
        Self {
            busy_until: vec![0; lane_count.max(1)],
        }
    }

    /// Number of lanes
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.busy_until.len()
    }

    /// Busy-until of a lane
    #[must_use]
    pub fn busy_until(&self, lane: usize) -> Option<u64> {
        self.busy_until.get(lane).copied()
    }

    /// First lane whose reservation has passed
    #[must_use]
    pub fn first_free(&self, now_ms: u64) -> Option<usize> {
        self.busy_until.iter().position(|until| now_ms > *until)
    }

    /// Reserve a lane until `until_ms`; out-of-range lanes are ignored
    pub fn reserve(&mut self, lane: usize, until_ms: u64) {
        if let Some(slot) = self.busy_until.get_mut(lane) {
            *slot = until_ms;
        }
    }

    /// Resize to `lane_count` lanes, all free
    pub fn reset(&mut self, lane_count: usize) {
        *self = Self::new(lane_count);
    }
}

/// Live heuristic: first free lane, otherwise a uniformly random one
///
/// Overlap is preferred over blocking, so this always returns a lane.
#[derive(Debug)]
pub struct LiveLanes {
    rng: StdRng,
}

impl LiveLanes {
    /// Seeded from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence for tests
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick a lane at `now_ms`
    pub fn choose(&mut self, state: &LaneState, now_ms: u64) -> usize {
        state
            .first_free(now_ms)
            .unwrap_or_else(|| self.rng.gen_range(0..state.lane_count()))
    }
}

impl Default for LiveLanes {
    fn default() -> Self {
        Self::new()
    }
}
