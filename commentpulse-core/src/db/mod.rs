//! Database layer for commentpulse
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - A uniqueness constraint on `event_id` that makes ingestion idempotent

pub mod repo;
pub mod schema;

pub use repo::{Database, InsertOutcome};
