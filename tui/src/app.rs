//! Application State and Event Loop
//!
//! One overlay per run. The loop multiplexes three sources:
//!
//! - terminal events (keys, resize), highest priority
//! - the 300 ms caption poll, which spawns due captions
//! - the frame clock, which advances elements and repaints
//!
//! Captions load in a background task and land in the overlay whenever they
//! arrive; until then the overlay is mounted but empty.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use danmu_core::render::POLL_INTERVAL;
use danmu_core::{
    fallback_captions, CaptionItem, FileStore, HttpCaptionClient, LiveLanes, LocalStore,
    MemoryStore, OverlayCache, PerformanceTier, RenderLoop, SettingsStore, SharedClock,
};

use crate::controls::Control;
use crate::surface::TerminalSurface;
use crate::ui::{self, View};

/// Repaint interval (~30 FPS)
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// What to play and where to get captions for it
#[derive(Clone, Debug)]
pub struct AppOptions {
    pub source: String,
    pub id: String,
    pub title: String,
    /// Caption server base URL
    pub server_url: String,
    /// Directory for cached captions and settings; `None` keeps them in memory
    pub store_dir: Option<PathBuf>,
    pub tier: PerformanceTier,
}

/// Main application state
pub struct App {
    running: bool,
    overlay: RenderLoop,
    surface: TerminalSurface,
    settings_store: SettingsStore,
    captions: Option<oneshot::Receiver<Vec<CaptionItem>>>,
    loading: bool,
    /// Caption being typed, when the input is open
    input: Option<String>,
    title: String,
    clock: SharedClock,
}

impl App {
    /// Load settings, mount the overlay on `terminal_area` and start fetching captions
    pub async fn new(options: AppOptions, terminal_area: Rect, clock: SharedClock) -> Self {
        let store: Arc<dyn LocalStore> = match &options.store_dir {
            Some(dir) => Arc::new(FileStore::new(dir.clone())),
            None => {
                warn!("No data directory, captions and settings will not persist");
                Arc::new(MemoryStore::new())
            }
        };

        let settings_store = SettingsStore::new(store.clone());
        let settings = settings_store.load().await;
        debug!(?settings, "Display settings loaded");

        let surface = TerminalSurface::new(ui::overlay_area(terminal_area));
        let mut overlay = RenderLoop::new(settings, options.tier, LiveLanes::new(), clock.clone());
        overlay.mount(&surface);
        info!(
            tier = %options.tier,
            lanes = overlay.scheduler().lane_count(),
            worker = overlay.has_worker(),
            "Overlay mounted"
        );

        let captions = spawn_caption_load(store, clock.clone(), &options);

        Self {
            running: true,
            overlay,
            surface,
            settings_store,
            captions: Some(captions),
            loading: true,
            input: None,
            title: options.title,
            clock,
        }
    }

    /// Run the main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();

        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frame = tokio::time::interval(FRAME_INTERVAL);
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut captions = self.captions.take();

        self.render(terminal)?;

        while self.running {
            tokio::select! {
                biased;

                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => match event {
                            // Only handle Press events (not Release or Repeat)
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key(key).await;
                            }
                            Event::Resize(w, h) => self.handle_resize(w, h),
                            _ => {}
                        },
                        Some(Err(e)) => warn!(error = %e, "Terminal event error"),
                        None => self.running = false,
                    }
                }

                loaded = next_captions(&mut captions) => {
                    captions = None;
                    self.loading = false;
                    match loaded {
                        Some(items) => {
                            info!(count = items.len(), "Captions loaded");
                            self.overlay.set_items(items);
                        }
                        None => warn!("Caption loader exited without a result"),
                    }
                }

                _ = poll.tick() => {
                    let spawned = self.overlay.tick(&self.surface);
                    if !spawned.is_empty() {
                        debug!(count = spawned.len(), "Spawned captions");
                    }
                }

                _ = frame.tick() => {
                    self.overlay.frame();
                    self.render(terminal)?;
                }
            }
        }

        self.overlay.teardown();
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if let Some(buffer) = self.input.as_mut() {
            match key.code {
                KeyCode::Enter => {
                    let text = std::mem::take(buffer);
                    self.input = None;
                    if let Some(item) = self.overlay.submit_caption(&text) {
                        debug!(time = item.time, "Caption submitted");
                    }
                }
                KeyCode::Esc => self.input = None,
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            }
            return;
        }

        let Some(control) = Control::from_key(key) else {
            return;
        };
        match control {
            Control::Quit => self.running = false,
            Control::OpenInput => self.input = Some(String::new()),
            other => {
                if let Some(settings) = other.apply(self.overlay.settings()) {
                    self.overlay.set_settings(settings);
                    self.settings_store.save(&settings).await;
                }
            }
        }
    }

    fn handle_resize(&mut self, width: u16, height: u16) {
        self.surface
            .resize(ui::overlay_area(Rect::new(0, 0, width, height)));
    }

    fn render(
        &self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let view = View {
            title: &self.title,
            elapsed_secs: self.overlay.elapsed_secs(),
            now_ms: self.clock.now_ms(),
            elements: self.overlay.elements(),
            surface: &self.surface,
            settings: self.overlay.settings(),
            lane_count: self.overlay.scheduler().lane_count(),
            queued: self.overlay.queued(),
            loading: self.loading,
            input: self.input.as_deref(),
        };
        terminal.draw(|frame| ui::draw(frame, &view))?;
        Ok(())
    }
}

fn spawn_caption_load(
    store: Arc<dyn LocalStore>,
    clock: SharedClock,
    options: &AppOptions,
) -> oneshot::Receiver<Vec<CaptionItem>> {
    let (tx, rx) = oneshot::channel();
    let AppOptions {
        source,
        id,
        title,
        server_url,
        ..
    } = options.clone();

    tokio::spawn(async move {
        let items = match HttpCaptionClient::new(&server_url) {
            Ok(client) => {
                OverlayCache::new(store, Arc::new(client), clock)
                    .load(&source, &id, &title)
                    .await
            }
            Err(e) => {
                warn!(error = %e, "Failed to build caption client, using fallback captions");
                fallback_captions(&title)
            }
        };
        // Receiver is gone if the app already quit
        let _ = tx.send(items);
    });

    rx
}

async fn next_captions(
    captions: &mut Option<oneshot::Receiver<Vec<CaptionItem>>>,
) -> Option<Vec<CaptionItem>> {
    match captions {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}
