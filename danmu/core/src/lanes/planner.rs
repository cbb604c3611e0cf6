//! Batch lane planner
//!
//! The algorithm the background worker runs over a whole pending batch. It
//! walks the items in input order and keeps a per-lane "busy credit", a rough
//! count of frames the lane stays occupied:
//!
//! ```text
//! for each item:
//!     lane   = first lane with credit <= 0, else lane 0
//!     est_w  = clamp(chars * 12, 80, 0.6 * width)
//!     dur    = (width + est_w) / max(50, speed)
//!     credit[lane] = dur * 60
//!     every credit -= 30 (floored at 0)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Estimated width per character, px
const CHAR_WIDTH_PX: f64 = 12.0;
/// Narrowest estimated caption, px
const MIN_ESTIMATED_WIDTH_PX: f64 = 80.0;
/// Widest estimated caption as a fraction of the viewport
const MAX_ESTIMATED_WIDTH_FRACTION: f64 = 0.6;
/// Slowest speed the planner assumes, px/s
const MIN_PLANNER_SPEED: f64 = 50.0;
/// Frames per second used to turn a duration into credit
const CREDIT_FPS: f64 = 60.0;
/// Credit removed from every lane after each item
const CREDIT_DECAY: f64 = 30.0;
/// Vertical pixels per planner lane
const PLANNER_LANE_HEIGHT_PX: f64 = 32.0;

/// One item of a planning batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerItem {
    /// Caption time, seconds
    pub time: f64,
    /// Caption text
    pub text: String,
    /// Scroll speed, px/s
    pub speed: f64,
}

/// Planning batch sent to the worker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Viewport width, px
    pub width: f64,
    /// Viewport height, px
    pub height: f64,
    /// Items in pending order
    pub items: Vec<WorkerItem>,
}

/// Suggested lane for the item at the same index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanePosition {
    /// Lane index
    pub lane: usize,
}

/// Worker reply: `{ok: true, positions}` or `{ok: false, error}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Whether planning succeeded
    pub ok: bool,
    /// Index-aligned suggestions (empty on failure)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<LanePosition>,
    /// Failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    /// Successful reply
    #[must_use]
    pub fn success(positions: Vec<LanePosition>) -> Self {
        Self {
            ok: true,
            positions,
            error: None,
        }
    }

    /// Failed reply
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            positions: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Why a batch could not be planned
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PlannerError {
    /// Viewport size is negative or not finite
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport {
        /// Requested width, px
        width: f64,
        /// Requested height, px
        height: f64,
    },
}

/// Estimated on-screen width of a caption, px
#[must_use]
pub fn estimate_width(text: &str, viewport_width: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let by_length = text.chars().count() as f64 * CHAR_WIDTH_PX;
    by_length
        .max(MIN_ESTIMATED_WIDTH_PX)
        .min(viewport_width * MAX_ESTIMATED_WIDTH_FRACTION)
}

/// Lanes the planner spreads a batch over: `max(3, floor(height / 32))`
#[must_use]
pub fn planner_lane_count(height: f64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lanes = (height / PLANNER_LANE_HEIGHT_PX).floor() as usize;
    lanes.max(3)
}

/// Plan lanes for a batch
///
/// Fails only on a viewport that is not a finite, non-negative size.
pub fn plan_lanes(request: &WorkerRequest) -> Result<Vec<LanePosition>, PlannerError> {
    let WorkerRequest {
        width,
        height,
        items,
    } = request;
    if !width.is_finite() || !height.is_finite() || *width < 0.0 || *height < 0.0 {
        return Err(PlannerError::InvalidViewport {
            width: *width,
            height: *height,
        });
    }

    let lane_count = planner_lane_count(*height);
    let mut credits = vec![0.0_f64; lane_count];
    let mut positions = Vec::with_capacity(items.len());

    for item in items {
        let chosen = credits.iter().position(|c| *c <= 0.0).unwrap_or(0);
        positions.push(LanePosition { lane: chosen });

        let estimated = estimate_width(&item.text, *width);
        let speed = if item.speed.is_finite() {
            item.speed.max(MIN_PLANNER_SPEED)
        } else {
            MIN_PLANNER_SPEED
        };
        let duration = (width + estimated) / speed;
        credits[chosen] = duration * CREDIT_FPS;

        for credit in &mut credits {
            *credit = (*credit - CREDIT_DECAY).max(0.0);
        }
    }

    Ok(positions)
}

/// Run the planner and wrap the outcome in a protocol reply
#[must_use]
pub fn respond(request: &WorkerRequest) -> WorkerResponse {
    match plan_lanes(request) {
        Ok(positions) => WorkerResponse::success(positions),
        Err(error) => WorkerResponse::failure(error.to_string()),
    }
}
