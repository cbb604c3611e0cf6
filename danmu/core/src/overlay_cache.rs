//! Client-side overlay cache
//!
//! Mirrors the server's TTL semantics in a local store so a viewer reopening
//! the same video within the TTL does not hit the network at all.
//!
//! Entries live under `danmu:{source}+{id}` as `{"items": [...], "exp": ms}`.
//! Every storage failure is treated as a miss, and a failed fetch falls back
//! to the locally generated caption set, so loading always yields something to
//! render.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::DEFAULT_TTL;
use crate::caption::{fallback_captions, CaptionItem};
use crate::clock::SharedClock;
use crate::store::LocalStore;
use crate::upstream::UpstreamError;

/// Local store key for a video's caption set
#[must_use]
pub fn overlay_key(source: &str, id: &str) -> String {
    format!("danmu:{source}+{id}")
}

/// Persisted caption set with absolute expiry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredCaptions {
    /// Cached captions
    pub items: Vec<CaptionItem>,
    /// Expiry, wall-clock ms
    pub exp: u64,
}

/// Network source of caption sets (the caption HTTP endpoint)
#[async_trait]
pub trait CaptionFetcher: Send + Sync {
    /// Fetch captions for a video
    async fn fetch_captions(
        &self,
        source: &str,
        id: &str,
        title: &str,
    ) -> Result<Vec<CaptionItem>, UpstreamError>;
}

/// Response body of the caption endpoint
#[derive(Debug, Deserialize)]
struct EndpointResponse {
    #[serde(default)]
    items: Vec<CaptionItem>,
}

/// Client for the `/api/danmu` endpoint served by `danmu-daemon`
#[derive(Clone, Debug)]
pub struct HttpCaptionClient {
    /// Server base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpCaptionClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str) -> Result<Self, UpstreamError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder().build()?,
        })
    }

    fn endpoint_url(&self) -> String {
        format!("{}/api/danmu", self.base_url)
    }
}

#[async_trait]
impl CaptionFetcher for HttpCaptionClient {
    async fn fetch_captions(
        &self,
        source: &str,
        id: &str,
        title: &str,
    ) -> Result<Vec<CaptionItem>, UpstreamError> {
        let response = self
            .http_client
            .get(self.endpoint_url())
            .query(&[("source", source), ("id", id), ("title", title)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let parsed: EndpointResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        Ok(parsed.items)
    }
}

/// Locally persisted caption cache in front of a [`CaptionFetcher`]
pub struct OverlayCache {
    store: Arc<dyn LocalStore>,
    fetcher: Arc<dyn CaptionFetcher>,
    clock: SharedClock,
    ttl: Duration,
}

impl OverlayCache {
    /// Create a cache with the default 30 minute TTL
    #[must_use]
    pub fn new(
        store: Arc<dyn LocalStore>,
        fetcher: Arc<dyn CaptionFetcher>,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock,
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the TTL
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Load captions for a video, preferring an unexpired local entry
    pub async fn load(&self, source: &str, id: &str, title: &str) -> Vec<CaptionItem> {
        let key = overlay_key(source, id);
        let now = self.clock.now_ms();

        if let Some(stored) = self.read_entry(&key).await {
            if stored.exp > now {
                debug!(key = %key, count = stored.items.len(), "Overlay cache hit");
                return stored.items;
            }
            debug!(key = %key, "Overlay cache entry expired");
        }

        match self.fetcher.fetch_captions(source, id, title).await {
            Ok(items) => {
                let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
                let entry = StoredCaptions {
                    items,
                    exp: now.saturating_add(ttl_ms),
                };
                self.write_entry(&key, &entry).await;
                entry.items
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Caption fetch failed, rendering fallback set");
                fallback_captions(title)
            }
        }
    }

    async fn read_entry(&self, key: &str) -> Option<StoredCaptions> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(key = %key, error = %e, "Ignoring unreadable overlay cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(key = %key, error = %e, "Overlay cache read failed");
                None
            }
        }
    }

    async fn write_entry(&self, key: &str, entry: &StoredCaptions) {
        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(key = %key, error = %e, "Failed to encode overlay cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set(key, &raw).await {
            debug!(key = %key, error = %e, "Overlay cache write failed");
        }
    }
}
