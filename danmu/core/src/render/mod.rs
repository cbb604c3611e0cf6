//! Render Loop
//!
//! Turns a pending caption list into moving overlay elements, one mounted
//! overlay at a time.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────┐  mount()  ┌────────┐  teardown()  ┌──────────┐
//! │ Idle │ ────────▶ │ Active │ ───────────▶ │ TornDown │
//! └──────┘           └────────┘              └──────────┘
//!                     │    ▲
//!              tick() │    │ frame()
//!         (every 300ms)    (every paint)
//! ```
//!
//! `tick` polls elapsed time since mount, drains lane worker replies and spawns
//! due captions. `frame` advances every element and drops those that finished
//! crossing. Once torn down nothing is spawned, animated or written again.
//!
//! The loop is driven by its owner (a terminal UI, a test, a GPU surface); it
//! never schedules itself.

mod element;
mod surface;

pub use element::{ElementHandle, ElementPosition, OverlayElement};
pub use surface::{FixedSurface, OverlaySurface};

use std::time::Duration;

use tracing::{debug, warn};

use crate::caption::{CaptionItem, CaptionMode, ACCENT_COLOR};
use crate::clock::SharedClock;
use crate::lanes::{
    LaneOrigin, LaneScheduler, LaneWorker, LiveLanes, PerformanceTier, PrecomputedLanes,
    WorkerItem, WorkerRequest,
};
use crate::settings::DisplaySettings;

/// How often due captions are polled
pub const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// A caption is due when `|time - elapsed|` is below this, seconds
pub const SPAWN_TOLERANCE_SECS: f64 = 0.5;

/// Scroll speed at `speed = 1`, px/s
pub const BASE_SPEED_PX_PER_SEC: f64 = 120.0;

/// Vertical gap between lanes, px
pub const LANE_GAP_PX: f64 = 8.0;

/// Offset past the right edge where elements start, px
pub const START_OFFSET_PX: f64 = 10.0;

/// Extra travel beyond container plus element width, px
pub const TRAVEL_PADDING_PX: f64 = 20.0;

/// Delay applied to user-submitted captions, seconds
pub const USER_CAPTION_DELAY_SECS: f64 = 0.2;

/// Color for captions that carry none
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";

/// Lifecycle phase of a mounted overlay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayPhase {
    /// Created, not yet mounted
    Idle,
    /// Mounted; polling and animating
    Active,
    /// Torn down; terminal
    TornDown,
}

/// What happened when a caption was spawned
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRecord {
    /// Element created
    pub handle: ElementHandle,
    /// Index in the pending list
    pub pending_index: usize,
    /// Lane used
    pub lane: usize,
    /// Strategy that chose the lane
    pub origin: LaneOrigin,
    /// Crossing time, ms
    pub duration_ms: f64,
    /// Lane reservation end, ms
    pub busy_until_ms: u64,
}

#[derive(Clone, Debug)]
struct PendingCaption {
    item: CaptionItem,
    spawned: bool,
}

/// Per-overlay render loop
#[derive(Debug)]
pub struct RenderLoop {
    phase: OverlayPhase,
    settings: DisplaySettings,
    scheduler: LaneScheduler,
    worker: Option<LaneWorker>,
    /// Generation of the last worker reply applied
    applied_generation: u64,
    pending: Vec<PendingCaption>,
    elements: Vec<OverlayElement>,
    next_handle: u64,
    viewport: (f64, f64),
    clock: SharedClock,
    mounted_at_ms: u64,
}

impl RenderLoop {
    /// Create an idle loop
    #[must_use]
    pub fn new(
        settings: DisplaySettings,
        tier: PerformanceTier,
        live: LiveLanes,
        clock: SharedClock,
    ) -> Self {
        let settings = settings.sanitized();
        Self {
            phase: OverlayPhase::Idle,
            scheduler: LaneScheduler::new(settings.area, tier, live),
            settings,
            worker: None,
            applied_generation: 0,
            pending: Vec::new(),
            elements: Vec::new(),
            next_handle: 1,
            viewport: (0.0, 0.0),
            clock,
            mounted_at_ms: 0,
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    /// Current display settings
    #[must_use]
    pub fn settings(&self) -> DisplaySettings {
        self.settings
    }

    /// Lane scheduler state
    #[must_use]
    pub fn scheduler(&self) -> &LaneScheduler {
        &self.scheduler
    }

    /// Elements currently on screen
    #[must_use]
    pub fn elements(&self) -> &[OverlayElement] {
        &self.elements
    }

    /// Pending captions, in order
    pub fn pending(&self) -> impl Iterator<Item = &CaptionItem> {
        self.pending.iter().map(|p| &p.item)
    }

    /// Pending captions not spawned yet
    #[must_use]
    pub fn queued(&self) -> usize {
        self.pending.iter().filter(|p| !p.spawned).count()
    }

    /// Whether a background lane worker is attached
    #[must_use]
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Seconds since mount (0 unless active)
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        if self.phase != OverlayPhase::Active {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let elapsed_ms = self.clock.now_ms().saturating_sub(self.mounted_at_ms) as f64;
        elapsed_ms / 1000.0
    }

    /// Mount onto a surface and start the lane worker
    ///
    /// Without an async runtime the worker is skipped and the live heuristic
    /// assigns every lane.
    pub fn mount(&mut self, surface: &dyn OverlaySurface) {
        if self.phase != OverlayPhase::Idle {
            return;
        }
        self.phase = OverlayPhase::Active;
        self.mounted_at_ms = self.clock.now_ms();
        self.viewport = (surface.width(), surface.height());

        match LaneWorker::spawn() {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => warn!(error = %e, "Lane worker unavailable, using live lanes"),
        }
        debug!(
            lanes = self.scheduler.lane_count(),
            tier = %self.scheduler.tier(),
            "Overlay mounted"
        );
        self.request_plan();
    }

    /// Replace the pending caption list
    pub fn set_items(&mut self, items: Vec<CaptionItem>) {
        if self.phase == OverlayPhase::TornDown {
            return;
        }
        self.pending = items
            .into_iter()
            .filter(CaptionItem::is_renderable)
            .map(|item| PendingCaption {
                item,
                spawned: false,
            })
            .collect();
        // Old suggestions are indexed against the previous list
        self.scheduler.clear_precomputed();
        self.request_plan();
    }

    /// Apply new display settings
    ///
    /// An area change recomputes the lane count; a speed change replans.
    pub fn set_settings(&mut self, settings: DisplaySettings) {
        if self.phase == OverlayPhase::TornDown {
            return;
        }
        let settings = settings.sanitized();
        let previous = std::mem::replace(&mut self.settings, settings);
        if (previous.area - settings.area).abs() > f64::EPSILON {
            self.scheduler.set_area(settings.area);
            debug!(lanes = self.scheduler.lane_count(), "Lane count recomputed");
        }
        if (previous.speed - settings.speed).abs() > f64::EPSILON {
            self.request_plan();
        }
    }

    /// Append a viewer caption at `elapsed + 0.2s`
    ///
    /// Returns the queued caption, or `None` for blank text or an inactive loop.
    pub fn submit_caption(&mut self, text: &str) -> Option<CaptionItem> {
        if self.phase != OverlayPhase::Active {
            return None;
        }
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let item = CaptionItem::new(self.elapsed_secs() + USER_CAPTION_DELAY_SECS, text)
            .with_color(ACCENT_COLOR)
            .with_mode(CaptionMode::Scroll);
        self.pending.push(PendingCaption {
            item: item.clone(),
            spawned: false,
        });
        self.request_plan();
        Some(item)
    }

    /// Poll step: take worker replies, then spawn every due caption
    pub fn tick(&mut self, surface: &dyn OverlaySurface) -> Vec<SpawnRecord> {
        if self.phase != OverlayPhase::Active {
            return Vec::new();
        }
        self.viewport = (surface.width(), surface.height());
        self.drain_worker();

        let elapsed = self.elapsed_secs();
        let due: Vec<usize> = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.spawned && (p.item.time - elapsed).abs() < SPAWN_TOLERANCE_SECS)
            .map(|(i, _)| i)
            .collect();

        due.into_iter()
            .map(|index| self.spawn(index, surface))
            .collect()
    }

    /// Frame step: drop elements that finished crossing
    ///
    /// Returns the positions of the elements still on screen.
    pub fn frame(&mut self) -> Vec<(ElementHandle, ElementPosition)> {
        if self.phase != OverlayPhase::Active {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        self.elements.retain(|el| !el.is_finished(now));
        self.elements
            .iter()
            .map(|el| (el.handle, el.position(now)))
            .collect()
    }

    /// Wait until the worker answers the latest batch
    ///
    /// Returns whether precomputed suggestions are now held.
    pub async fn await_plan(&mut self) -> bool {
        let Some(worker) = self.worker.as_mut() else {
            return false;
        };
        let latest = worker.latest_generation();
        if latest == 0 {
            return false;
        }
        if self.applied_generation >= latest {
            return self.scheduler.has_precomputed();
        }
        let outcome = loop {
            match worker.recv().await {
                Ok((generation, reply)) if generation == latest => break Ok(reply),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
        };
        match outcome {
            Ok(reply) => {
                self.apply_reply(latest, reply);
                self.scheduler.has_precomputed()
            }
            Err(e) => {
                self.disable_worker(&e.to_string());
                false
            }
        }
    }

    /// Stop the worker and remove every element; terminal
    pub fn teardown(&mut self) {
        if self.phase == OverlayPhase::TornDown {
            return;
        }
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
        self.elements.clear();
        self.pending.clear();
        self.scheduler.clear_precomputed();
        self.phase = OverlayPhase::TornDown;
        debug!("Overlay torn down");
    }

    fn spawn(&mut self, index: usize, surface: &dyn OverlaySurface) -> SpawnRecord {
        let now = self.clock.now_ms();
        let choice = self.scheduler.assign(Some(index), now);
        let settings = self.settings;

        let pending = &mut self.pending[index];
        pending.spawned = true;
        let item = &pending.item;

        let container_width = surface.width();
        let width = surface.measure_text(&item.text, settings.font_size);
        let distance = container_width + width + TRAVEL_PADDING_PX;
        let duration_secs = distance / (BASE_SPEED_PX_PER_SEC * settings.speed)
            * self.scheduler.tier().duration_multiplier();
        let duration_ms = duration_secs * 1000.0;
        let busy_until_ms = reservation_end(now, duration_ms, settings.anti_overlap);
        self.scheduler.reserve(choice.lane, busy_until_ms);

        let handle = ElementHandle::new(self.next_handle);
        self.next_handle += 1;

        #[allow(clippy::cast_precision_loss)]
        let top = choice.lane as f64 * (settings.font_size + LANE_GAP_PX);
        self.elements.push(OverlayElement {
            handle,
            text: item.text.clone(),
            color: item
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
            mode: item.mode,
            font_size: settings.font_size,
            opacity: settings.opacity,
            lane: choice.lane,
            top,
            width,
            start_x: container_width + START_OFFSET_PX,
            distance,
            duration_ms,
            started_at_ms: now,
        });

        debug!(
            %handle,
            lane = choice.lane,
            origin = ?choice.origin,
            duration_ms,
            "Spawned caption"
        );

        SpawnRecord {
            handle,
            pending_index: index,
            lane: choice.lane,
            origin: choice.origin,
            duration_ms,
            busy_until_ms,
        }
    }

    fn request_plan(&mut self) {
        if self.phase != OverlayPhase::Active || self.pending.is_empty() {
            return;
        }
        let Some(worker) = self.worker.as_mut() else {
            return;
        };
        let speed = BASE_SPEED_PX_PER_SEC * self.settings.speed;
        let request = WorkerRequest {
            width: self.viewport.0,
            height: self.viewport.1,
            items: self
                .pending
                .iter()
                .map(|p| WorkerItem {
                    time: p.item.time,
                    text: p.item.text.clone(),
                    speed,
                })
                .collect(),
        };
        if let Err(e) = worker.submit(request) {
            self.disable_worker(&e.to_string());
        }
    }

    fn drain_worker(&mut self) {
        loop {
            let Some(worker) = self.worker.as_mut() else {
                return;
            };
            let latest = worker.latest_generation();
            match worker.poll() {
                Ok(Some((generation, reply))) if generation == latest => {
                    self.apply_reply(generation, reply);
                }
                Ok(Some((generation, _))) => {
                    debug!(generation, latest, "Discarded stale lane plan");
                }
                Ok(None) => return,
                Err(e) => {
                    self.disable_worker(&e.to_string());
                    return;
                }
            }
        }
    }

    fn apply_reply(&mut self, generation: u64, reply: crate::lanes::WorkerResponse) {
        self.applied_generation = generation;
        if reply.ok {
            self.scheduler
                .set_precomputed(PrecomputedLanes::new(reply.positions));
        } else {
            debug!(
                error = reply.error.as_deref().unwrap_or("unknown"),
                "Lane plan failed, using live lanes"
            );
            self.scheduler.clear_precomputed();
        }
    }

    fn disable_worker(&mut self, reason: &str) {
        warn!(reason, "Lane worker lost, using live lanes");
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
        self.scheduler.clear_precomputed();
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// End of a lane reservation; halved when anti-overlap is off
#[must_use]
pub fn reservation_end(now_ms: u64, duration_ms: f64, anti_overlap: bool) -> u64 {
    let factor = if anti_overlap { 1.0 } else { 0.5 };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let span = (duration_ms * factor).max(0.0).round() as u64;
    now_ms.saturating_add(span)
}
