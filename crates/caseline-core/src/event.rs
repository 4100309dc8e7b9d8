//! Core event model for caseline timelines.
//!
//! A [`TimelineEvent`] is the fundamental data unit flowing through the
//! pipeline: one normalized activity record with full provenance. Events
//! are created once per raw input record, annotated at most once by the
//! deduplicator, and never mutated downstream of that.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::citation::Citation;

/// Fallback actor when no candidate field yields a usable identity.
pub const DEFAULT_ACTOR: &str = "system";

/// Fallback description when no raw field produces readable text.
pub const DEFAULT_DESCRIPTION: &str = "Activity detected";

/// Event category taxonomy. Ordering matters: it is the classifier's
/// evaluation priority and the partition order during deduplication.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Authentication,
    Network,
    File,
    Process,
    Security,
    Unknown,
}

impl EventType {
    /// Lowercase label, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Authentication => "authentication",
            EventType::Network => "network",
            EventType::File => "file",
            EventType::Process => "process",
            EventType::Security => "security",
            EventType::Unknown => "unknown",
        }
    }
}

/// Severity level for an event. Ascending order, so `max` comparisons and
/// `>= High` filters read naturally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine activity, the default when nothing indicates otherwise.
    Low,
    /// Worth reviewing.
    Medium,
    /// Likely requires analyst attention.
    High,
    /// Immediate attention recommended.
    Critical,
}

impl Severity {
    /// Lowercase label, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Record of how normalization decided each derived field, kept for audit
/// traceability alongside the residual raw data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationMeta {
    /// Raw field that supplied the timestamp.
    pub timestamp_field: String,
    /// Raw field that supplied the actor, if any candidate matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_field: Option<String>,
    /// Event type the classifier settled on.
    pub event_type: EventType,
    /// Severity the classifier settled on.
    pub severity: Severity,
}

/// Cluster statistics attached to a deduplication representative.
///
/// Set once by the deduplicator and frozen afterwards; no downstream
/// component mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupInfo {
    /// Number of events folded into the representative (cluster size - 1).
    pub duplicate_count: usize,
    /// Total cluster size including the representative.
    pub total_occurrences: usize,
    /// Occurrences per originating source.
    pub source_breakdown: BTreeMap<String, usize>,
    /// Whole-second span between the first and last occurrence.
    pub time_range_seconds: i64,
    pub first_occurrence: DateTime<Utc>,
    pub last_occurrence: DateTime<Utc>,
}

/// Residual raw data plus normalization and deduplication metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Upstream fields not consumed by normalization. The common timestamp
    /// keys (`timestamp`, `@timestamp`, `time`) are removed.
    pub raw_fields: Map<String, Value>,
    pub normalization: NormalizationMeta,
    /// Present only on a deduplication representative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplication: Option<DedupInfo>,
}

/// One normalized activity record on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Canonical UTC instant; comparisons are always well-defined.
    pub timestamp: DateTime<Utc>,
    /// Acting identity; never empty, falls back to [`DEFAULT_ACTOR`].
    pub actor: String,
    /// Readable text; never empty, falls back to [`DEFAULT_DESCRIPTION`].
    pub description: String,
    /// Originating system label.
    pub source: String,
    pub event_type: EventType,
    pub severity: Severity,
    pub details: EventDetails,
    /// Provenance record with the integrity hash.
    pub citation: Citation,
    /// Original unmodified source record, retained for audit traceability.
    pub raw_event: Value,
}
