//! Lane Scheduling
//!
//! Keeps concurrently visible scrolling captions from overlapping by spreading
//! them across horizontal lanes. Two independent strategies sit behind the
//! [`LaneStrategy`] capability:
//!
//! - [`PrecomputedLanes`]: suggestions planned ahead of time for the whole
//!   pending batch, normally by the background [`LaneWorker`]
//! - [`LiveLanes`]: first lane whose busy window has passed, else random
//!
//! [`LaneScheduler`] consults them in that order. The two approximations may
//! disagree about which lane is free; the precomputed one simply wins when it
//! has an answer.

mod live;
mod planner;
mod tier;
mod worker;

pub use live::{LaneState, LiveLanes};
pub use planner::{
    estimate_width, plan_lanes, planner_lane_count, respond, LanePosition, PlannerError,
    WorkerItem, WorkerRequest, WorkerResponse,
};
pub use tier::{lane_count, DeviceProfile, PerformanceTier, DEFAULT_CORES, DEFAULT_MEMORY_GB};
pub use worker::{LaneWorker, WorkerError};

/// What a strategy knows when asked for a lane
#[derive(Clone, Copy, Debug)]
pub struct LaneQuery<'a> {
    /// Index of the caption in the full pending list, if it has one
    pub pending_index: Option<usize>,
    /// Current wall-clock time, ms
    pub now_ms: u64,
    /// Live occupancy
    pub state: &'a LaneState,
}

/// The "assign lane" capability
pub trait LaneStrategy {
    /// A lane in `[0, state.lane_count())`, or `None` to defer to the next strategy
    fn assign(&mut self, query: &LaneQuery<'_>) -> Option<usize>;
}

impl LaneStrategy for LiveLanes {
    fn assign(&mut self, query: &LaneQuery<'_>) -> Option<usize> {
        Some(self.choose(query.state, query.now_ms))
    }
}

/// Index-aligned lane suggestions for the pending list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrecomputedLanes {
    positions: Vec<LanePosition>,
}

impl PrecomputedLanes {
    /// Wrap planner output
    #[must_use]
    pub fn new(positions: Vec<LanePosition>) -> Self {
        Self { positions }
    }

    /// Whether any suggestion is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of suggestions
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Drop every suggestion
    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

impl LaneStrategy for PrecomputedLanes {
    fn assign(&mut self, query: &LaneQuery<'_>) -> Option<usize> {
        let index = query.pending_index?;
        let lane = self.positions.get(index)?.lane;
        // The planner sizes its own lane table from the viewport height, so
        // suggestions beyond the overlay's lanes are discarded.
        (lane < query.state.lane_count()).then_some(lane)
    }
}

/// Which strategy produced a lane
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneOrigin {
    /// From the precomputed plan
    Precomputed,
    /// From the live heuristic
    Live,
}

/// Chosen lane and where it came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaneChoice {
    /// Lane index
    pub lane: usize,
    /// Strategy that chose it
    pub origin: LaneOrigin,
}

/// Owns lane occupancy and both strategies for one overlay
#[derive(Debug)]
pub struct LaneScheduler {
    tier: PerformanceTier,
    state: LaneState,
    precomputed: PrecomputedLanes,
    live: LiveLanes,
}

impl LaneScheduler {
    /// Scheduler for a lane area on a device tier
    #[must_use]
    pub fn new(area: f64, tier: PerformanceTier, live: LiveLanes) -> Self {
        Self {
            tier,
            state: LaneState::new(lane_count(area, tier)),
            precomputed: PrecomputedLanes::default(),
            live,
        }
    }

    /// Device tier
    #[must_use]
    pub fn tier(&self) -> PerformanceTier {
        self.tier
    }

    /// Number of lanes
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.state.lane_count()
    }

    /// Live occupancy
    #[must_use]
    pub fn state(&self) -> &LaneState {
        &self.state
    }

    /// Recompute the lane count for a new area; all lanes become free
    pub fn set_area(&mut self, area: f64) {
        self.state.reset(lane_count(area, self.tier));
    }

    /// Replace the precomputed suggestions
    pub fn set_precomputed(&mut self, precomputed: PrecomputedLanes) {
        self.precomputed = precomputed;
    }

    /// Forget precomputed suggestions (the live heuristic takes over)
    pub fn clear_precomputed(&mut self) {
        self.precomputed.clear();
    }

    /// Whether precomputed suggestions are held
    #[must_use]
    pub fn has_precomputed(&self) -> bool {
        !self.precomputed.is_empty()
    }

    /// Pick a lane for the pending item at `pending_index`
    pub fn assign(&mut self, pending_index: Option<usize>, now_ms: u64) -> LaneChoice {
        let query = LaneQuery {
            pending_index,
            now_ms,
            state: &self.state,
        };
        if let Some(lane) = self.precomputed.assign(&query) {
            return LaneChoice {
                lane,
                origin: LaneOrigin::Precomputed,
            };
        }
        LaneChoice {
            lane: self.live.assign(&query).unwrap_or(0),
            origin: LaneOrigin::Live,
        }
    }

    /// Mark a lane busy until `until_ms`
    pub fn reserve(&mut self, lane: usize, until_ms: u64) {
        self.state.reserve(lane, until_ms);
    }
}
