//! Caption Aggregator
//!
//! Resolves the caption set for a `(provider, source, id, title)` identity:
//!
//! ```text
//! request ─→ TtlCache ──hit──────────────────────────────┐
//!               │ miss                                   │
//!               ▼                                        │
//!          CaptionUpstream ──empty / error─→ fallback    │
//!               │                               │        │
//!               └──────────┬────────────────────┘        │
//!                          ▼                             │
//!                   banned-text filter ─→ cache write    │
//!                          │                             │
//!                          ▼                             ▼
//!                     CaptionWindow (range + limit, per request)
//! ```
//!
//! The aggregator never fails. Upstream errors are logged and replaced by the
//! deterministic fallback set.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{identity_key, TtlCache};
use crate::caption::{fallback_captions, filter_banned, CaptionItem, CaptionWindow};
use crate::upstream::{CaptionUpstream, UpstreamQuery};

/// Provider used when the request names none
pub const DEFAULT_PROVIDER: &str = "caiji";

/// A caption request as received by the HTTP endpoint
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionRequest {
    /// Identity of the caption set
    pub query: UpstreamQuery,
    /// Per-request range and limit
    pub window: CaptionWindow,
}

impl CaptionRequest {
    /// Create a request with the default provider and window
    pub fn new(source: impl Into<String>, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            query: UpstreamQuery::new(DEFAULT_PROVIDER, source, id, title),
            window: CaptionWindow::default(),
        }
    }

    /// Set the provider (lower-cased)
    #[must_use]
    pub fn with_provider(mut self, provider: &str) -> Self {
        self.query.provider = normalize_provider(provider, DEFAULT_PROVIDER);
        self
    }

    /// Set the window
    #[must_use]
    pub fn with_window(mut self, window: CaptionWindow) -> Self {
        self.window = window;
        self
    }

    /// Build a request from raw query parameters
    ///
    /// Missing strings become empty, a missing provider becomes
    /// `default_provider`, and missing or unparsable numbers fall back to
    /// `from = 0`, `to = 0`, `limit = default_limit`.
    #[must_use]
    pub fn from_params(
        params: &HashMap<String, String>,
        default_provider: &str,
        default_limit: usize,
    ) -> Self {
        let text = |name: &str| params.get(name).cloned().unwrap_or_default();
        let number = |name: &str| {
            params
                .get(name)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        let provider = params
            .get("provider")
            .map_or_else(|| default_provider.to_string(), |p| {
                normalize_provider(p, default_provider)
            });

        let limit = number("limit").map_or(default_limit, |v| {
            if v <= 0.0 {
                0
            } else {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let limit = v.floor() as usize;
                limit
            }
        });

        Self {
            query: UpstreamQuery::new(provider, text("source"), text("id"), text("title")),
            window: CaptionWindow {
                from: number("from").unwrap_or(0.0),
                to: number("to").unwrap_or(0.0),
                limit,
            },
        }
    }

    /// Cache key for this request's identity
    #[must_use]
    pub fn cache_key(&self) -> String {
        identity_key(
            &self.query.provider,
            &self.query.source,
            &self.query.id,
            &self.query.title,
        )
    }
}

fn normalize_provider(raw: &str, default_provider: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default_provider.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Resolves caption sets through cache, upstream and fallback
pub struct CaptionAggregator {
    cache: TtlCache,
    upstream: Option<Arc<dyn CaptionUpstream>>,
}

impl CaptionAggregator {
    /// Create an aggregator
    ///
    /// With no upstream every miss resolves to the fallback set.
    #[must_use]
    pub fn new(cache: TtlCache, upstream: Option<Arc<dyn CaptionUpstream>>) -> Self {
        Self { cache, upstream }
    }

    /// The underlying cache
    #[must_use]
    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Whether an upstream is configured
    #[must_use]
    pub fn has_upstream(&self) -> bool {
        self.upstream.is_some()
    }

    /// Resolve captions for a request
    pub async fn resolve(&self, request: &CaptionRequest) -> Vec<CaptionItem> {
        let key = request.cache_key();

        if let Some(cached) = self.cache.get_fresh(&key) {
            debug!(key = %key, count = cached.len(), "Caption cache hit");
            return request.window.apply(&cached);
        }

        let mut items = self.fetch_upstream(&request.query).await;
        if items.is_empty() {
            debug!(key = %key, "No upstream captions, using fallback set");
            items = fallback_captions(&request.query.title);
        }

        let base = filter_banned(items);
        let response = request.window.apply(&base);
        self.cache.insert(key.clone(), base);
        debug!(
            key = %key,
            returned = response.len(),
            cached_entries = self.cache.len(),
            "Caption set cached"
        );

        response
    }

    async fn fetch_upstream(&self, query: &UpstreamQuery) -> Vec<CaptionItem> {
        let Some(upstream) = &self.upstream else {
            return Vec::new();
        };

        match upstream.fetch(query).await {
            Ok(items) => {
                debug!(
                    upstream = upstream.name(),
                    count = items.len(),
                    "Fetched upstream captions"
                );
                items
            }
            Err(e) => {
                warn!(upstream = upstream.name(), error = %e, "Upstream caption fetch failed");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for CaptionAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionAggregator")
            .field("cache", &self.cache)
            .field(
                "upstream",
                &self.upstream.as_ref().map(|u| u.name().to_string()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::DEFAULT_LIMIT;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_from_params_defaults() {
        let req = CaptionRequest::from_params(&params(&[]), DEFAULT_PROVIDER, DEFAULT_LIMIT);
        assert_eq!(req.query.provider, "caiji");
        assert_eq!(req.query.source, "");
        assert_eq!(req.window, CaptionWindow::default());
    }

    #[test]
    fn test_from_params_parses_and_lowercases() {
        let req = CaptionRequest::from_params(
            &params(&[
                ("source", "demo"),
                ("id", "1"),
                ("title", "Foo"),
                ("provider", "BiliBili"),
                ("from", "5"),
                ("to", "20"),
                ("limit", "3"),
            ]),
            DEFAULT_PROVIDER,
            DEFAULT_LIMIT,
        );
        assert_eq!(req.query.provider, "bilibili");
        assert_eq!(req.cache_key(), "bilibili|demo|1|Foo");
        assert_eq!(
            req.window,
            CaptionWindow {
                from: 5.0,
                to: 20.0,
                limit: 3
            }
        );
    }

    #[test]
    fn test_from_params_lenient_numbers() {
        let req = CaptionRequest::from_params(
            &params(&[("to", "abc"), ("limit", "-4"), ("from", "")]),
            DEFAULT_PROVIDER,
            DEFAULT_LIMIT,
        );
        assert!(req.window.to.abs() < f64::EPSILON);
        assert!(req.window.from.abs() < f64::EPSILON);
        assert_eq!(req.window.limit, 0);
    }

    #[test]
    fn test_builder_provider_blank_keeps_default() {
        let req = CaptionRequest::new("s", "i", "t").with_provider("  ");
        assert_eq!(req.query.provider, DEFAULT_PROVIDER);
    }
}
