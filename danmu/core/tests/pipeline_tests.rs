//! Integration tests for the caption pipeline
//!
//! These tests drive several components together the way the server and the
//! overlay use them:
//! - Aggregator request parsing, caching and fallback
//! - Overlay cache in front of an in-process aggregator
//! - Render loop lane assignment with and without worker plans
//! - Anti-overlap lane reservation

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use danmu_core::caption::{CaptionItem, BANNED_SUBSTRINGS, DEFAULT_LIMIT};
use danmu_core::clock::ManualClock;
use danmu_core::lanes::{LaneOrigin, LiveLanes, PerformanceTier};
use danmu_core::overlay_cache::{CaptionFetcher, OverlayCache};
use danmu_core::render::{FixedSurface, RenderLoop};
use danmu_core::settings::{DisplaySettings, SettingsStore};
use danmu_core::store::{FileStore, MemoryStore};
use danmu_core::upstream::{CaptionUpstream, UpstreamError, UpstreamQuery};
use danmu_core::{CaptionAggregator, CaptionRequest, TtlCache, DEFAULT_PROVIDER, DEFAULT_TTL};

// =============================================================================
// Helpers
// =============================================================================

/// Upstream returning a fixed set and counting calls
struct CountingUpstream {
    items: Vec<CaptionItem>,
    calls: AtomicUsize,
    fail: bool,
}

impl CountingUpstream {
    fn new(items: Vec<CaptionItem>) -> Arc<Self> {
        Arc::new(Self {
            items,
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            items: Vec::new(),
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptionUpstream for CountingUpstream {
    fn name(&self) -> &str {
        "counting"
    }

    async fn fetch(&self, _query: &UpstreamQuery) -> Result<Vec<CaptionItem>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(UpstreamError::Status(502));
        }
        Ok(self.items.clone())
    }
}

/// Overlay fetcher calling an aggregator in-process
struct InProcessFetcher {
    aggregator: Arc<CaptionAggregator>,
}

#[async_trait]
impl CaptionFetcher for InProcessFetcher {
    async fn fetch_captions(
        &self,
        source: &str,
        id: &str,
        title: &str,
    ) -> Result<Vec<CaptionItem>, UpstreamError> {
        Ok(self
            .aggregator
            .resolve(&CaptionRequest::new(source, id, title))
            .await)
    }
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn upstream_set() -> Vec<CaptionItem> {
    let mut items: Vec<CaptionItem> = (0..40)
        .map(|i| CaptionItem::new(f64::from(i) * 1.5, format!("第{i}条")))
        .collect();
    for (i, word) in BANNED_SUBSTRINGS.iter().enumerate() {
        items.push(CaptionItem::new(f64::from(u8::try_from(i).unwrap()), format!("看{word}")));
    }
    items
}

fn aggregator(clock: &ManualClock, upstream: Option<Arc<CountingUpstream>>) -> CaptionAggregator {
    CaptionAggregator::new(
        TtlCache::new(DEFAULT_TTL, Arc::new(clock.clone())),
        upstream.map(|u| u as Arc<dyn CaptionUpstream>),
    )
}

// =============================================================================
// Aggregator
// =============================================================================

#[tokio::test]
async fn test_demo_request_without_upstream() {
    let clock = ManualClock::new(1_000);
    let aggregator = aggregator(&clock, None);

    let request = CaptionRequest::from_params(
        &params(&[
            ("source", "demo"),
            ("id", "1"),
            ("title", "Foo"),
            ("to", "20"),
            ("limit", "3"),
        ]),
        DEFAULT_PROVIDER,
        DEFAULT_LIMIT,
    );
    let items = aggregator.resolve(&request).await;

    assert!(items.len() <= 3);
    assert!(!items.is_empty());
    assert!(items.iter().all(|item| item.time <= 20.0));
    assert_eq!(items[0].text, "Foo 开场");
}

#[tokio::test]
async fn test_second_request_within_ttl_skips_upstream() {
    let clock = ManualClock::new(0);
    let upstream = CountingUpstream::new(upstream_set());
    let aggregator = aggregator(&clock, Some(upstream.clone()));
    let request = CaptionRequest::new("demo", "1", "Foo");

    let first = aggregator.resolve(&request).await;
    clock.advance_ms(29 * 60 * 1000);
    let second = aggregator.resolve(&request).await;

    assert_eq!(upstream.calls(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_entry_triggers_exactly_one_fetch() {
    let clock = ManualClock::new(0);
    let upstream = CountingUpstream::new(upstream_set());
    let aggregator = aggregator(&clock, Some(upstream.clone()));
    let request = CaptionRequest::new("demo", "1", "Foo");

    aggregator.resolve(&request).await;
    clock.advance_ms(31 * 60 * 1000);
    aggregator.resolve(&request).await;
    aggregator.resolve(&request).await;

    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_cached_base_set_reapplies_window() {
    let clock = ManualClock::new(0);
    let upstream = CountingUpstream::new(upstream_set());
    let aggregator = aggregator(&clock, Some(upstream.clone()));

    let narrow = CaptionRequest::from_params(
        &params(&[("source", "s"), ("id", "9"), ("to", "6"), ("limit", "2")]),
        DEFAULT_PROVIDER,
        DEFAULT_LIMIT,
    );
    let wide = CaptionRequest::from_params(
        &params(&[("source", "s"), ("id", "9")]),
        DEFAULT_PROVIDER,
        DEFAULT_LIMIT,
    );

    assert_eq!(aggregator.resolve(&narrow).await.len(), 2);
    // Same identity, so served from cache with the full base set
    assert_eq!(aggregator.resolve(&wide).await.len(), 40);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_window_and_filter_properties() {
    let clock = ManualClock::new(0);
    let upstream = CountingUpstream::new(upstream_set());
    let aggregator = aggregator(&clock, Some(upstream));

    for (from, to, limit) in [
        ("0", "0", "300"),
        ("3", "12", "300"),
        ("10", "30", "4"),
        ("0", "5", "0"),
        ("abc", "-1", "x"),
    ] {
        let request = CaptionRequest::from_params(
            &params(&[
                ("source", "s"),
                ("id", "1"),
                ("from", from),
                ("to", to),
                ("limit", limit),
            ]),
            DEFAULT_PROVIDER,
            DEFAULT_LIMIT,
        );
        let items = aggregator.resolve(&request).await;

        assert!(items.len() <= request.window.limit);
        if request.window.to > 0.0 {
            assert!(items
                .iter()
                .all(|i| i.time >= request.window.from && i.time <= request.window.to));
        }
        assert!(items
            .iter()
            .all(|i| BANNED_SUBSTRINGS.iter().all(|w| !i.text.contains(w))));
    }
}

#[tokio::test]
async fn test_upstream_failure_degrades_to_fallback() {
    let clock = ManualClock::new(0);
    let upstream = CountingUpstream::failing();
    let aggregator = aggregator(&clock, Some(upstream.clone()));

    let items = aggregator
        .resolve(&CaptionRequest::new("demo", "2", "Bar"))
        .await;

    assert_eq!(upstream.calls(), 1);
    assert_eq!(items.len(), 7);
    assert_eq!(items[1].text, "Bar 名场面");
}

// =============================================================================
// Overlay cache in front of the aggregator
// =============================================================================

#[tokio::test]
async fn test_overlay_cache_skips_network_within_ttl() {
    let clock = ManualClock::new(0);
    let upstream = CountingUpstream::new(upstream_set());
    let server = Arc::new(aggregator(&clock, Some(upstream.clone())));
    let store = Arc::new(MemoryStore::new());
    let overlay = OverlayCache::new(
        store.clone(),
        Arc::new(InProcessFetcher {
            aggregator: server.clone(),
        }),
        Arc::new(clock.clone()),
    );

    let first = overlay.load("demo", "1", "Foo").await;
    assert_eq!(first.len(), 40);
    assert_eq!(store.len(), 1);

    // Clear the server cache; a local hit must not reach it
    server.cache().clear();
    clock.advance_ms(10 * 60 * 1000);
    let second = overlay.load("demo", "1", "Foo").await;

    assert_eq!(first, second);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_overlay_cache_survives_disabled_storage() {
    let clock = ManualClock::new(0);
    let upstream = CountingUpstream::new(upstream_set());
    let server = Arc::new(aggregator(&clock, Some(upstream.clone())));
    let store = Arc::new(MemoryStore::new());
    store.set_disabled(true);
    let overlay = OverlayCache::new(
        store,
        Arc::new(InProcessFetcher { aggregator: server }),
        Arc::new(clock.clone()),
    )
    .with_ttl(Duration::from_secs(60));

    assert_eq!(overlay.load("demo", "1", "Foo").await.len(), 40);
    assert_eq!(overlay.load("demo", "1", "Foo").await.len(), 40);
}

// =============================================================================
// Render loop and lanes
// =============================================================================

fn render_loop(clock: &ManualClock, settings: DisplaySettings, seed: u64) -> RenderLoop {
    RenderLoop::new(
        settings,
        PerformanceTier::Mid,
        LiveLanes::seeded(seed),
        Arc::new(clock.clone()),
    )
}

#[tokio::test]
async fn test_failed_worker_plan_still_yields_valid_lanes() {
    let clock = ManualClock::new(50_000);
    // Negative height makes the planner reply ok: false
    let surface = FixedSurface::new(800.0, -1.0);
    let mut overlay = render_loop(&clock, DisplaySettings::default(), 11);
    overlay.mount(&surface);
    assert!(overlay.has_worker());

    overlay.set_items(
        (0..30)
            .map(|i| CaptionItem::new(f64::from(i) * 0.1, format!("弹幕{i}")))
            .collect(),
    );
    assert!(!overlay.await_plan().await);

    let lane_count = overlay.scheduler().lane_count();
    let mut spawned = 0;
    for _ in 0..12 {
        for record in overlay.tick(&surface) {
            assert!(record.lane < lane_count);
            assert_eq!(record.origin, LaneOrigin::Live);
            spawned += 1;
        }
        clock.advance_ms(300);
    }
    assert_eq!(spawned, 30);
}

#[tokio::test]
async fn test_worker_plan_lanes_in_range() {
    let clock = ManualClock::new(50_000);
    // Tall viewport: the planner has more lanes than the overlay
    let surface = FixedSurface::new(640.0, 2_000.0);
    let mut overlay = render_loop(&clock, DisplaySettings::default().with_area(0.3), 5);
    overlay.mount(&surface);

    overlay.set_items(
        (0..40)
            .map(|i| CaptionItem::new(0.0, format!("{i}")))
            .collect(),
    );
    assert!(overlay.await_plan().await);

    let lane_count = overlay.scheduler().lane_count();
    let records = overlay.tick(&surface);
    assert_eq!(records.len(), 40);
    assert!(records.iter().all(|r| r.lane < lane_count));
    assert!(records.iter().any(|r| r.origin == LaneOrigin::Live));
}

#[test]
fn test_anti_overlap_off_halves_reservation() {
    let surface = FixedSurface::new(800.0, 450.0);
    let items = vec![CaptionItem::new(0.2, "同一条弹幕")];

    let reservation = |anti_overlap: bool| {
        let clock = ManualClock::new(100_000);
        let mut overlay = render_loop(
            &clock,
            DisplaySettings::default().with_anti_overlap(anti_overlap),
            1,
        );
        overlay.mount(&surface);
        overlay.set_items(items.clone());
        let record = overlay.tick(&surface)[0];
        (record.duration_ms, record.busy_until_ms - 100_000)
    };

    let (duration_on, span_on) = reservation(true);
    let (duration_off, span_off) = reservation(false);

    assert!((duration_on - duration_off).abs() < f64::EPSILON);
    assert!(span_on.abs_diff(2 * span_off) <= 1);
}

#[test]
fn test_user_caption_flows_through_pipeline() {
    let clock = ManualClock::new(0);
    let surface = FixedSurface::new(800.0, 450.0);
    let mut overlay = render_loop(&clock, DisplaySettings::default(), 2);
    overlay.mount(&surface);
    overlay.set_items(vec![CaptionItem::new(30.0, "later")]);

    clock.set_ms(5_000);
    let item = overlay.submit_caption("前方高能").unwrap();
    assert!((item.time - 5.2).abs() < 1e-9);

    clock.set_ms(5_300);
    let records = overlay.tick(&surface);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pending_index, 1);
    assert_eq!(overlay.elements()[0].text, "前方高能");
}

// =============================================================================
// Settings persistence
// =============================================================================

#[tokio::test]
async fn test_settings_persist_across_stores() {
    let dir = tempfile::tempdir().unwrap();
    let settings = DisplaySettings::default()
        .with_font_size(24.0)
        .with_speed(1.5)
        .with_anti_overlap(false);

    SettingsStore::new(Arc::new(FileStore::new(dir.path())))
        .save(&settings)
        .await;
    let loaded = SettingsStore::new(Arc::new(FileStore::new(dir.path())))
        .load()
        .await;

    assert_eq!(loaded, settings);
}
