//! Third-party caption sources
//!
//! - **HTTP aggregator**: the configured `DANMU_AGGREGATOR_BASE` service
//!
//! # Usage
//!
//! ```ignore
//! use danmu_core::upstream::{CaptionUpstream, HttpAggregator, UpstreamQuery};
//!
//! let upstream = HttpAggregator::new("http://aggregator.local", None)?;
//! let items = upstream.fetch(&UpstreamQuery::new("caiji", "demo", "1", "Foo")).await?;
//! ```

mod http;
mod traits;

pub use http::{parse_aggregator_body, HttpAggregator};
pub use traits::{CaptionUpstream, UpstreamError, UpstreamQuery};
