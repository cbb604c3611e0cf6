//! Device performance tiers
//!
//! A coarse classification of the host that scales both the number of lanes
//! and how long captions take to cross the overlay.

use serde::{Deserialize, Serialize};

/// Memory assumed when the host does not report it, in GB
pub const DEFAULT_MEMORY_GB: f64 = 4.0;

/// Cores assumed when parallelism cannot be queried
pub const DEFAULT_CORES: usize = 4;

/// Coarse device capability class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    /// Under 4 GB or under 4 cores
    Low,
    /// At least 4 GB and 4 cores
    Mid,
    /// At least 8 GB and 8 cores
    High,
}

impl PerformanceTier {
    /// Classify from memory (GB) and logical core count
    #[must_use]
    pub fn classify(memory_gb: f64, cores: usize) -> Self {
        if memory_gb >= 8.0 && cores >= 8 {
            Self::High
        } else if memory_gb >= 4.0 && cores >= 4 {
            Self::Mid
        } else {
            Self::Low
        }
    }

    /// Classify the current host
    #[must_use]
    pub fn detect() -> Self {
        let profile = DeviceProfile::detect();
        Self::classify(profile.memory_gb, profile.cores)
    }

    /// Multiplier on the lane count
    #[must_use]
    pub fn lane_multiplier(self) -> f64 {
        match self {
            Self::High => 1.5,
            Self::Mid => 1.0,
            Self::Low => 0.7,
        }
    }

    /// Multiplier on animation duration (faster devices scroll faster)
    #[must_use]
    pub fn duration_multiplier(self) -> f64 {
        match self {
            Self::High => 0.8,
            Self::Mid => 1.0,
            Self::Low => 1.2,
        }
    }
}

impl std::fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Mid => write!(f, "mid"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Host capabilities used for tier detection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceProfile {
    /// Memory in GB
    pub memory_gb: f64,
    /// Logical cores
    pub cores: usize,
}

impl DeviceProfile {
    /// Probe the host
    ///
    /// Cores come from `available_parallelism`; memory is not probed and
    /// defaults to 4 GB. `DANMU_DEVICE_MEMORY_GB` and `DANMU_DEVICE_CORES`
    /// override either value.
    #[must_use]
    pub fn detect() -> Self {
        let cores = std::env::var("DANMU_DEVICE_CORES")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
            .unwrap_or(DEFAULT_CORES);
        let memory_gb = std::env::var("DANMU_DEVICE_MEMORY_GB")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_MEMORY_GB);

        Self { memory_gb, cores }
    }
}

/// Number of lanes for a lane area and tier: `max(3, floor(area × 8 × multiplier))`
#[must_use]
pub fn lane_count(area: f64, tier: PerformanceTier) -> usize {
    let raw = (area * 8.0 * tier.lane_multiplier()).floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lanes = if raw.is_finite() && raw > 0.0 {
        raw as usize
    } else {
        0
    };
    lanes.max(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(PerformanceTier::classify(16.0, 12), PerformanceTier::High);
        assert_eq!(PerformanceTier::classify(8.0, 4), PerformanceTier::Mid);
        assert_eq!(PerformanceTier::classify(4.0, 8), PerformanceTier::Mid);
        assert_eq!(PerformanceTier::classify(2.0, 16), PerformanceTier::Low);
        assert_eq!(PerformanceTier::classify(8.0, 2), PerformanceTier::Low);
    }

    #[test]
    fn test_lane_count() {
        assert_eq!(lane_count(0.8, PerformanceTier::Mid), 6);
        assert_eq!(lane_count(0.8, PerformanceTier::High), 9);
        assert_eq!(lane_count(1.0, PerformanceTier::Low), 5);
        assert_eq!(lane_count(0.0, PerformanceTier::High), 3);
        assert_eq!(lane_count(0.2, PerformanceTier::Mid), 3);
    }

    #[test]
    fn test_multipliers() {
        assert!((PerformanceTier::High.duration_multiplier() - 0.8).abs() < f64::EPSILON);
        assert!((PerformanceTier::Low.duration_multiplier() - 1.2).abs() < f64::EPSILON);
        assert!((PerformanceTier::Low.lane_multiplier() - 0.7).abs() < f64::EPSILON);
    }
}
