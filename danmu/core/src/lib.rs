//! Danmu Core - Headless Caption Overlay Engine
//!
//! Everything a danmu overlay needs short of painting pixels: resolving the
//! caption set for a video, caching it on both sides of the wire, spreading
//! captions across lanes, and timing their crossing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── caption server ─────────────────────────┐
//! │                                                                  │
//! │  GET /api/danmu ──▶ CaptionAggregator ──▶ CaptionUpstream        │
//! │                       │  TtlCache         (aggregator, optional) │
//! │                       │  fallback + banned-text filter           │
//! └───────────────────────┼──────────────────────────────────────────┘
//!                         │ { items }
//! ┌───────────────────────┼──────────── overlay ────────────────────┐
//! │                       ▼                                          │
//! │  OverlayCache (LocalStore, 30 min) ──▶ RenderLoop                │
//! │                                          │  tick / frame         │
//! │  SettingsStore ──▶ DisplaySettings ──────┤                       │
//! │                                          ▼                       │
//! │                                    LaneScheduler                 │
//! │                          PrecomputedLanes ◀── LaneWorker (task)  │
//! │                          LiveLanes (busy-until, random)          │
//! │                                          │                       │
//! │                                          ▼                       │
//! │                          OverlayElement ──▶ OverlaySurface       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Overview
//!
//! - [`caption`]: Caption items, banned-text filter, fallback generator, range/limit window
//! - [`cache`]: TTL cache keyed by caption identity
//! - [`upstream`]: Upstream aggregator abstraction and HTTP client
//! - [`aggregator`]: Server-side caption resolution
//! - [`store`]: Best-effort key/value storage (files or memory)
//! - [`overlay_cache`]: Client-side caption cache over a [`store::LocalStore`]
//! - [`settings`]: Display preferences and their persistence
//! - [`lanes`]: Lane count, worker planning and the live heuristic
//! - [`render`]: The per-overlay render loop
//! - [`clock`]: Injectable wall clock
//! - [`config`]: TOML / environment / CLI configuration
//!
//! # No UI Dependencies
//!
//! This crate has no dependency on ratatui, crossterm or any web framework.
//! Surfaces implement [`render::OverlaySurface`] and paint
//! [`render::OverlayElement`]s however they like.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregator;
pub mod cache;
pub mod caption;
pub mod clock;
pub mod config;
pub mod lanes;
pub mod overlay_cache;
pub mod render;
pub mod settings;
pub mod store;
pub mod upstream;

pub use aggregator::{CaptionAggregator, CaptionRequest, DEFAULT_PROVIDER};
pub use cache::{identity_key, CacheEntry, TtlCache, DEFAULT_TTL};
pub use caption::{
    fallback_captions, filter_banned, CaptionItem, CaptionMode, CaptionWindow, ACCENT_COLOR,
    BANNED_SUBSTRINGS, DEFAULT_LIMIT,
};
pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use lanes::{
    LaneChoice, LaneOrigin, LaneScheduler, LaneState, LaneStrategy, LaneWorker, LiveLanes,
    PerformanceTier, PlannerError, PrecomputedLanes, WorkerError, WorkerRequest, WorkerResponse,
};
pub use overlay_cache::{overlay_key, CaptionFetcher, HttpCaptionClient, OverlayCache};
pub use render::{
    ElementHandle, FixedSurface, OverlayElement, OverlayPhase, OverlaySurface, RenderLoop,
    SpawnRecord,
};
pub use settings::{DisplaySettings, SettingsStore, SETTINGS_KEY};
pub use store::{FileStore, LocalStore, MemoryStore, StorageError};
pub use upstream::{CaptionUpstream, HttpAggregator, UpstreamError, UpstreamQuery};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, DanmuConfig, DanmuToml,
};
