//! Upstream Source Traits
//!
//! Abstraction over third-party caption aggregators, so the
//! [`CaptionAggregator`](crate::aggregator::CaptionAggregator) can work with
//! the HTTP aggregator in production and with scripted sources in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::caption::CaptionItem;

/// Identity of the caption set being requested
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UpstreamQuery {
    /// Caption provider (lower-cased)
    pub provider: String,
    /// Video source site
    pub source: String,
    /// Video id within the source
    pub id: String,
    /// Video title
    pub title: String,
}

impl UpstreamQuery {
    /// Create a query
    pub fn new(
        provider: impl Into<String>,
        source: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            source: source.into(),
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Reasons an upstream fetch produced no data
///
/// The aggregator never surfaces these; every variant degrades to the
/// fallback caption set.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, TLS or body transfer failure
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// Body was not the expected JSON shape
    #[error("malformed upstream body: {0}")]
    Malformed(String),
}

/// A third-party caption source
#[async_trait]
pub trait CaptionUpstream: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch the raw caption set for a query
    ///
    /// Returned items are already normalized (non-empty text, non-negative
    /// time) but not yet content filtered.
    async fn fetch(&self, query: &UpstreamQuery) -> Result<Vec<CaptionItem>, UpstreamError>;
}
