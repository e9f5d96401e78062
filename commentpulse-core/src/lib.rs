//! # commentpulse-core
//!
//! Core library for commentpulse - an analytics service for AI-assisted
//! comment generation.
//!
//! This library provides:
//! - Domain types for events and summaries
//! - The event recorder (validation, normalization, idempotent ingestion)
//! - SQLite event store with a dedup constraint on `eventId`
//! - On-demand window aggregation with a recompute-on-miss summary cache
//! - A producer-side submit client with bounded retry
//! - Configuration and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Ingestion:** producers submit event payloads; the recorder validates
//!   and writes exactly one row per distinct `eventId`
//! - **Storage:** an append-only event log, queryable by post, platform, and
//!   time window
//! - **Derivation:** summaries computed lazily per calendar window and cached
//!
//! ## Example
//!
//! ```rust,no_run
//! use commentpulse_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&config.database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::{Database, InsertOutcome};
pub use error::{Error, Result, ValidationErrorKind};
pub use recorder::{record_event, RecordOutcome};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod recorder;
pub mod submit;
pub mod types;
