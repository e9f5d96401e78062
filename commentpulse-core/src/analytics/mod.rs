//! Analytics module for commentpulse
//!
//! Summaries are derived data: a summary is a pure function of the events
//! whose authoritative timestamps fall inside one calendar window. The
//! aggregator computes them on demand; the cache keeps the most recent
//! computation per (platform, period, window) key.
//!
//! ## Data flow
//!
//! ```text
//! ┌────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Event log  │ ──► │  Aggregator  │ ──► │ Summary cache │
//! │ (events)   │     │ (pure scan)  │     │ (summaries)   │
//! └────────────┘     └──────────────┘     └───────────────┘
//! ```
//!
//! There is no incremental maintenance: a cached summary is recomputed only
//! when its key misses, never patched in place.

pub mod aggregator;
pub mod cache;

pub use aggregator::compute_summary;
pub use cache::{get_or_compute, CacheOutcome};
