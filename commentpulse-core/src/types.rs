//! Core domain types for commentpulse
//!
//! These types form the canonical event model shared by the recorder, the
//! store, the aggregator, and the HTTP surface. Wire shapes are camelCase to
//! match the JSON emitted by the browser-side producers.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | Immutable record of one generation or selection action |
//! | **Generation event** | N comment suggestions were produced for a post |
//! | **Selection event** | The user chose one suggested comment |
//! | **Post** | The content item the action relates to; many events per post |
//! | **Platform** | The site the producer was running on (LinkedIn, Breakcold) |
//! | **Summary** | Derived aggregate over events in one calendar window |
//! | **Window** | Half-open `[start, end)` interval in UTC |

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Upper bound on stored keyword lists; longer lists are truncated on ingest.
pub const MAX_KEYWORDS: usize = 5;

// ============================================
// Event discriminants
// ============================================

/// The two kinds of recorded action.
///
/// The event `type` is the dispatch discriminant for per-type required
/// fields: a generation event must carry generated comments, a selection
/// event must carry the selected comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Generation,
    Selection,
}

impl EventType {
    /// Returns the identifier used in database storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Generation => "generation",
            EventType::Selection => "selection",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generation" => Ok(EventType::Generation),
            "selection" => Ok(EventType::Selection),
            _ => Err(format!("unknown event type: {}", s)),
        }
    }
}

/// Supported social platforms (producers, not consumers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    Breakcold,
}

impl Platform {
    /// Returns the display name for this platform
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Linkedin => "LinkedIn",
            Platform::Breakcold => "Breakcold",
        }
    }

    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linkedin => "linkedin",
            Platform::Breakcold => "breakcold",
        }
    }

    /// All known platforms, for "all"-scoped scans and validation messages.
    pub fn all() -> &'static [Platform] {
        &[Platform::Linkedin, Platform::Breakcold]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linkedin" => Ok(Platform::Linkedin),
            "breakcold" => Ok(Platform::Breakcold),
            _ => Err(format!("unknown platform: {}", s)),
        }
    }
}

/// Platform scope for queries and summaries: one platform, or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFilter {
    All,
    Only(Platform),
}

impl PlatformFilter {
    /// Returns the identifier used in database storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformFilter::All => "all",
            PlatformFilter::Only(p) => p.as_str(),
        }
    }
}

impl std::fmt::Display for PlatformFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlatformFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(PlatformFilter::All),
            other => Platform::from_str(other).map(PlatformFilter::Only),
        }
    }
}

impl Serialize for PlatformFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PlatformFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PlatformFilter::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Coarse sentiment classification produced by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// How the interaction concluded from the producer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionType {
    /// The user picked one of the suggestions
    Selection,
    /// The suggestions were dismissed without a pick
    NoSelection,
}

impl CompletionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionType::Selection => "selection",
            CompletionType::NoSelection => "no_selection",
        }
    }
}

impl FromStr for CompletionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "selection" => Ok(CompletionType::Selection),
            "no_selection" => Ok(CompletionType::NoSelection),
            _ => Err(format!("unknown completion type: {}", s)),
        }
    }
}

// ============================================
// Event payload
// ============================================

/// The post the producer scraped before asking for comment suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePost {
    /// Scraped post text
    pub text: String,
    /// Character length as measured by the producer
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub sentiment: Sentiment,
    /// Extracted keywords, truncated to [`MAX_KEYWORDS`] on ingest
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Per-comment metrics attached by the producer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentMetrics {
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One suggested comment from a generation round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedComment {
    pub id: String,
    pub text: String,
    /// Free-form tone label ("friendly", "professional", ...)
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default)]
    pub metrics: CommentMetrics,
}

fn default_tone() -> String {
    "professional".to_string()
}

/// The comment the user picked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedComment {
    pub id: String,
    pub text: String,
    /// Position of the pick within the suggestion list
    pub index: u32,
    /// True when the pick came from a regeneration round
    #[serde(default)]
    pub is_regenerated: bool,
}

/// Client-measured timings. All values are validated non-negative; a missing
/// value contributes 0 to window averages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    #[serde(default)]
    pub generation_time_ms: Option<f64>,
    #[serde(default)]
    pub selection_time_ms: Option<f64>,
    #[serde(default)]
    pub total_time_ms: Option<f64>,
}

/// Event envelope metadata.
///
/// `timestamp` is the authoritative event time: window placement uses it
/// exclusively, never arrival order. Producers that retry a submission must
/// resend the original timestamp along with the original `eventId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_type: Option<CompletionType>,
    /// Free-form client context (browser info, user agent, ...)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub context: serde_json::Value,
}

/// An immutable fact about one generation or selection action.
///
/// `event_id` is producer-generated and globally unique; it is the primary
/// dedup key and the only identity an event has. Events are created once on
/// ingest and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub post_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub platform: Platform,
    pub source_post: SourcePost,
    /// Required non-empty when `type=generation`
    #[serde(default)]
    pub generated_comments: Vec<GeneratedComment>,
    /// Required when `type=selection`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_comment: Option<SelectedComment>,
    #[serde(default)]
    pub performance: Performance,
    pub metadata: EventMetadata,
}

impl Event {
    /// Authoritative event time (shorthand for `metadata.timestamp`).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }
}

// ============================================
// Summary windows
// ============================================

/// Calendar aggregation period.
///
/// Window boundaries are calendar boundaries in UTC; this is the fixed
/// reference timezone for the whole store. Daily windows run midnight to
/// midnight, weekly windows are ISO weeks starting Monday, monthly windows
/// run from the first of the month. All windows are half-open `[start, end)`:
/// an event stamped exactly at `end` belongs to the next window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    /// Returns the identifier used in database storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }

    /// Truncate an arbitrary date to the start date of its window.
    ///
    /// This is the canonical cache-key date: two dates inside the same
    /// window truncate to the same value.
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Daily => date,
            Period::Weekly => {
                let back = date.weekday().num_days_from_monday() as u64;
                date - Days::new(back)
            }
            // Day 1 always exists
            Period::Monthly => date.with_day(1).unwrap(),
        }
    }

    /// The half-open UTC interval `[start, end)` covering `date`.
    pub fn window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start_date = self.truncate(date);
        let end_date = match self {
            Period::Daily => start_date + Days::new(1),
            Period::Weekly => start_date + Days::new(7),
            Period::Monthly => {
                let (year, month) = if start_date.month() == 12 {
                    (start_date.year() + 1, 1)
                } else {
                    (start_date.year(), start_date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap()
            }
        };
        (
            Utc.from_utc_datetime(&start_date.and_hms_opt(0, 0, 0).unwrap()),
            Utc.from_utc_datetime(&end_date.and_hms_opt(0, 0, 0).unwrap()),
        )
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            _ => Err(format!("unknown period: {}", s)),
        }
    }
}

// ============================================
// Summary
// ============================================

/// A derived, cacheable aggregate over one (platform, period, window) key.
///
/// Summaries are a pure function of the events in the window: recomputing
/// against an unchanged store yields an identical value. The tone
/// distribution uses a `BTreeMap` so serialization is deterministic too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub platform: PlatformFilter,
    pub period: Period,
    /// Start date of the window, truncated to the period
    pub window_start: NaiveDate,
    pub total_generations: u64,
    pub total_selections: u64,
    /// Mean generation time over generation events; 0.0 when there are none
    pub average_generation_time_ms: f64,
    /// Mean selection time over selection events; 0.0 when there are none
    pub average_selection_time_ms: f64,
    /// Number of distinct posts touched in the window
    pub unique_post_count: u64,
    /// Tone label -> occurrence count across all generated comments in window
    pub tone_distribution: BTreeMap<String, u64>,
}

impl Summary {
    /// A well-formed all-zero summary for a window with no events.
    pub fn empty(platform: PlatformFilter, period: Period, window_start: NaiveDate) -> Self {
        Self {
            platform,
            period,
            window_start,
            total_generations: 0,
            total_selections: 0,
            average_generation_time_ms: 0.0,
            average_selection_time_ms: 0.0,
            unique_post_count: 0,
            tone_distribution: BTreeMap::new(),
        }
    }
}
