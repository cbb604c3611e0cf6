//! HTTP Aggregator Upstream
//!
//! Talks to a third-party caption aggregator over HTTP.
//!
//! # Aggregator API
//!
//! `GET {base}/danmu?provider=&source=&id=&title=` answers with either
//! `{"items": [...]}` or `{"data": [...]}`. Each element may spell its fields
//! `time`/`t` and `text`/`content`, with optional `color` and `mode`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{CaptionUpstream, UpstreamError, UpstreamQuery};
use crate::caption::{CaptionItem, CaptionMode};

/// Upstream backed by an HTTP caption aggregator
#[derive(Clone, Debug)]
pub struct HttpAggregator {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpAggregator {
    /// Create a client for `base_url`
    ///
    /// `timeout` of `None` leaves the request unbounded, which is the default
    /// behavior of the caption endpoint.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: builder.build()?,
        })
    }

    /// Base URL in use
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Caption endpoint URL
    fn danmu_url(&self) -> String {
        format!("{}/danmu", self.base_url)
    }
}

#[async_trait]
impl CaptionUpstream for HttpAggregator {
    fn name(&self) -> &'static str {
        "http-aggregator"
    }

    async fn fetch(&self, query: &UpstreamQuery) -> Result<Vec<CaptionItem>, UpstreamError> {
        let response = self
            .http_client
            .get(self.danmu_url())
            .query(&[
                ("provider", query.provider.as_str()),
                ("source", query.source.as_str()),
                ("id", query.id.as_str()),
                ("title", query.title.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let json: Value =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        Ok(parse_aggregator_body(&json))
    }
}

/// Extract captions from an aggregator response body
///
/// A body without an `items` or `data` array yields no captions. Elements with
/// empty text or a missing, negative or non-numeric time are skipped.
#[must_use]
pub fn parse_aggregator_body(json: &Value) -> Vec<CaptionItem> {
    let raw = json
        .get("items")
        .and_then(Value::as_array)
        .or_else(|| json.get("data").and_then(Value::as_array));

    raw.map(|arr| arr.iter().filter_map(parse_element).collect())
        .unwrap_or_default()
}

fn parse_element(raw: &Value) -> Option<CaptionItem> {
    let time = raw
        .get("time")
        .or_else(|| raw.get("t"))
        .map_or(Some(0.0), number_lenient)?;
    let text = raw
        .get("text")
        .or_else(|| raw.get("content"))
        .and_then(text_lenient)
        .unwrap_or_default();

    let item = CaptionItem {
        time,
        text,
        color: raw
            .get("color")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(String::from),
        mode: raw
            .get("mode")
            .and_then(Value::as_str)
            .map_or(CaptionMode::Scroll, CaptionMode::parse_lenient),
    };

    item.is_renderable().then_some(item)
}

fn number_lenient(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => Some(0.0),
        _ => None,
    }
}

fn text_lenient(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
