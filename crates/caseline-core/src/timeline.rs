//! Timeline assembly: the orchestration pipeline.
//!
//! [`TimelineBuilder`] runs raw query-result batches through timestamp
//! normalization, classification, actor/description extraction, and
//! citation stamping, merges externally supplied events, deduplicates,
//! and returns a chronologically ordered timeline. A malformed record
//! never aborts a batch; every failure degrades to fewer output events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::citation::{Citation, UNKNOWN_DETECTION};
use crate::classify::{classify_event_type, classify_severity};
use crate::config::TimelineConfig;
use crate::dedup::Deduplicator;
use crate::event::{EventDetails, NormalizationMeta, TimelineEvent};
use crate::extract::{extract_actor, field_text, synthesize_description};
use crate::summary::{summarize, TimelineSummary};
use crate::timestamp::{find_timestamp_field, normalize_timestamp};

/// Common timestamp keys removed from residual raw fields.
const RAW_FIELD_EXCLUDES: &[&str] = &["timestamp", "@timestamp", "time"];

/// One query-result batch from the query-execution collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryBatch {
    /// Identifier of the upstream query, if the executor assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    /// Detections that motivated the query; the first one is cited.
    #[serde(default)]
    pub source_detections: Vec<String>,
    /// Raw result records; schema varies by upstream source.
    #[serde(default)]
    pub events: Vec<Map<String, Value>>,
}

/// Orchestrates the full timeline construction pipeline.
///
/// A builder holds only configuration: each build is a pure transform
/// with no cross-invocation state, so independent timelines may be built
/// concurrently from clones of one builder.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    config: TimelineConfig,
}

impl TimelineBuilder {
    pub fn new(config: TimelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Build a timeline, stamping citations with the current instant.
    pub fn build(
        &self,
        batches: &[QueryBatch],
        case_id: &str,
        additional_events: Vec<TimelineEvent>,
    ) -> Vec<TimelineEvent> {
        self.build_at(batches, case_id, additional_events, Utc::now())
    }

    /// Build a timeline with a pinned extraction instant.
    ///
    /// Repeated runs over identical input produce identical citation
    /// hashes, which keeps any downstream tamper-evident audit chain
    /// stable.
    pub fn build_at(
        &self,
        batches: &[QueryBatch],
        case_id: &str,
        additional_events: Vec<TimelineEvent>,
        extracted_at: DateTime<Utc>,
    ) -> Vec<TimelineEvent> {
        info!(case_id, batches = batches.len(), "building timeline");

        let mut events = self.normalize_batches(batches, case_id, extracted_at);
        // Externally supplied events join before deduplication so that
        // duplicates spanning sources are still caught.
        events.extend(additional_events);

        let deduplicator = Deduplicator::new(
            self.config.dedup_window_seconds,
            self.config.similarity_prefix_chars,
        );
        let mut timeline = deduplicator.deduplicate(events);
        timeline.sort_by_key(|event| event.timestamp);

        info!(case_id, events = timeline.len(), "timeline built");
        timeline
    }

    /// Build a timeline from a bare list of raw records, treated as a
    /// single batch with no query or detection provenance.
    pub fn build_from_events(
        &self,
        events: Vec<Map<String, Value>>,
        case_id: &str,
    ) -> Vec<TimelineEvent> {
        let batch = QueryBatch {
            query_id: None,
            source_detections: Vec::new(),
            events,
        };
        self.build(std::slice::from_ref(&batch), case_id, Vec::new())
    }

    /// Normalize raw batch records into timeline events.
    ///
    /// Records without a usable timestamp are skipped with a warning;
    /// nothing here is fatal.
    pub fn normalize_batches(
        &self,
        batches: &[QueryBatch],
        case_id: &str,
        extracted_at: DateTime<Utc>,
    ) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        for batch in batches {
            let detection_id = batch
                .source_detections
                .first()
                .map(String::as_str)
                .unwrap_or(UNKNOWN_DETECTION);
            for raw in &batch.events {
                if let Some(event) = self.normalize_record(
                    raw,
                    case_id,
                    detection_id,
                    batch.query_id.clone(),
                    extracted_at,
                ) {
                    events.push(event);
                }
            }
        }
        info!(case_id, normalized = events.len(), "normalized query results");
        events
    }

    fn normalize_record(
        &self,
        raw: &Map<String, Value>,
        case_id: &str,
        detection_id: &str,
        query_id: Option<String>,
        extracted_at: DateTime<Utc>,
    ) -> Option<TimelineEvent> {
        let Some((timestamp_field, timestamp_value)) = find_timestamp_field(raw) else {
            warn!(case_id, "record carries no recognized timestamp field, skipping");
            return None;
        };
        let timestamp = match normalize_timestamp(timestamp_value) {
            Ok(timestamp) => timestamp,
            Err(err) => {
                warn!(
                    case_id,
                    field = timestamp_field,
                    error = %err,
                    "unusable timestamp, skipping record"
                );
                return None;
            }
        };

        let (actor, actor_field) = extract_actor(raw);
        let description = synthesize_description(raw);
        let event_type = classify_event_type(&description, raw);
        let severity = classify_severity(&description, raw);
        let source = field_text(raw, "log_source")
            .or_else(|| field_text(raw, "source"))
            .unwrap_or_else(|| self.config.default_source.clone());

        let raw_fields: Map<String, Value> = raw
            .iter()
            .filter(|(key, _)| !RAW_FIELD_EXCLUDES.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Some(TimelineEvent {
            timestamp,
            actor,
            description,
            source,
            event_type,
            severity,
            details: EventDetails {
                raw_fields,
                normalization: NormalizationMeta {
                    timestamp_field: timestamp_field.to_string(),
                    actor_field: actor_field.map(str::to_string),
                    event_type,
                    severity,
                },
                deduplication: None,
            },
            citation: Citation::new(case_id, detection_id, query_id, None, extracted_at),
            raw_event: Value::Object(raw.clone()),
        })
    }

    /// Summary statistics for a finished timeline.
    pub fn summarize(&self, timeline: &[TimelineEvent]) -> TimelineSummary {
        summarize(
            timeline,
            self.config.top_actor_limit,
            self.config.key_event_limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventType, Severity};
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn batch(events: Vec<Value>) -> QueryBatch {
        QueryBatch {
            query_id: Some("q-1".to_string()),
            source_detections: vec!["det-1".to_string(), "det-2".to_string()],
            events: events
                .into_iter()
                .map(|v| v.as_object().unwrap().clone())
                .collect(),
        }
    }

    #[test]
    fn record_becomes_fully_annotated_event() {
        let batches = vec![batch(vec![json!({
            "timestamp": "2024-03-01T10:00:00Z",
            "user": "alice",
            "message": "Failed password for alice from 10.0.0.8",
            "log_source": "AD",
            "severity": "high"
        })])];
        let builder = TimelineBuilder::default();
        let timeline = builder.build_at(&batches, "CASE-7", Vec::new(), fixed_instant());

        assert_eq!(timeline.len(), 1);
        let event = &timeline[0];
        assert_eq!(event.actor, "alice");
        assert_eq!(event.source, "AD");
        assert_eq!(event.event_type, EventType::Authentication);
        assert_eq!(event.severity, Severity::High);
        assert_eq!(event.citation.case_id, "CASE-7");
        assert_eq!(event.citation.detection_id, "det-1");
        assert_eq!(event.citation.query_id.as_deref(), Some("q-1"));
        assert_eq!(
            event.details.normalization.timestamp_field,
            "timestamp"
        );
        assert_eq!(
            event.details.normalization.actor_field.as_deref(),
            Some("user")
        );
        // Residual fields keep everything except the common timestamp keys.
        assert!(!event.details.raw_fields.contains_key("timestamp"));
        assert!(event.details.raw_fields.contains_key("message"));
    }

    #[test]
    fn missing_timestamp_drops_exactly_that_record() {
        let batches = vec![batch(vec![
            json!({"timestamp": "2024-03-01T10:00:00Z", "message": "interactive logon session opened"}),
            json!({"message": "no clock on this record at all"}),
            json!({"timestamp": "2024-03-01T11:00:00Z", "message": "interactive logoff session closed"}),
        ])];
        let builder = TimelineBuilder::default();
        let timeline = builder.build_at(&batches, "CASE-7", Vec::new(), fixed_instant());
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn unparseable_timestamp_drops_exactly_that_record() {
        let batches = vec![batch(vec![
            json!({"timestamp": "yesterday-ish", "message": "broken clock upstream here"}),
            json!({"timestamp": 1_700_000_000_i64, "message": "sane epoch clock upstream"}),
        ])];
        let builder = TimelineBuilder::default();
        let timeline = builder.build_at(&batches, "CASE-7", Vec::new(), fixed_instant());
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn empty_input_builds_empty_timeline() {
        let builder = TimelineBuilder::default();
        let timeline = builder.build_at(&[], "CASE-7", Vec::new(), fixed_instant());
        assert!(timeline.is_empty());
        assert_eq!(builder.summarize(&timeline).total_events, 0);
    }

    #[test]
    fn output_is_time_sorted_across_batches() {
        let batches = vec![
            batch(vec![json!({
                "timestamp": "2024-03-01T11:00:00Z",
                "message": "second interactive logon recorded"
            })]),
            batch(vec![json!({
                "timestamp": "2024-03-01T10:00:00Z",
                "message": "first interactive logon recorded"
            })]),
        ];
        let builder = TimelineBuilder::default();
        let timeline = builder.build_at(&batches, "CASE-7", Vec::new(), fixed_instant());
        assert_eq!(timeline.len(), 2);
        assert!(timeline[0].timestamp < timeline[1].timestamp);
    }

    #[test]
    fn additional_events_merge_before_deduplication() {
        let batches = vec![batch(vec![json!({
            "timestamp": "2024-03-01T10:00:00Z",
            "user": "alice",
            "message": "Failed password for alice from 10.0.0.8",
            "log_source": "AD"
        })])];
        let builder = TimelineBuilder::default();

        // A near-identical event from another pipeline stage, two seconds
        // later and from a different source.
        let mut external = builder
            .build_at(&batches, "CASE-7", Vec::new(), fixed_instant())
            .remove(0);
        external.timestamp += chrono::Duration::seconds(2);
        external.source = "VPN".to_string();

        let timeline = builder.build_at(&batches, "CASE-7", vec![external], fixed_instant());
        assert_eq!(timeline.len(), 1);
        let info = timeline[0].details.deduplication.as_ref().unwrap();
        assert_eq!(info.total_occurrences, 2);
        assert_eq!(info.source_breakdown["AD"], 1);
        assert_eq!(info.source_breakdown["VPN"], 1);
    }

    #[test]
    fn pinned_instant_makes_output_reproducible() {
        let batches = vec![batch(vec![json!({
            "timestamp": 1_700_000_000_i64,
            "user": "alice",
            "message": "Failed password for alice from 10.0.0.8"
        })])];
        let builder = TimelineBuilder::default();
        let first = builder.build_at(&batches, "CASE-7", Vec::new(), fixed_instant());
        let second = builder.build_at(&batches, "CASE-7", Vec::new(), fixed_instant());
        assert_eq!(first, second);
        assert_eq!(
            first[0].citation.audit_hash,
            second[0].citation.audit_hash
        );
    }

    #[test]
    fn bare_event_list_cites_unknown_detection() {
        let events = vec![json!({
            "timestamp": "2024-03-01T10:00:00Z",
            "message": "interactive logon session opened"
        })
        .as_object()
        .unwrap()
        .clone()];
        let builder = TimelineBuilder::default();
        let timeline = builder.build_from_events(events, "CASE-7");
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].citation.detection_id, UNKNOWN_DETECTION);
        assert!(timeline[0].citation.query_id.is_none());
    }

    #[test]
    fn source_falls_back_to_configured_default() {
        let batches = vec![batch(vec![json!({
            "timestamp": "2024-03-01T10:00:00Z",
            "message": "record with no source labeling"
        })])];
        let builder = TimelineBuilder::default();
        let timeline = builder.build_at(&batches, "CASE-7", Vec::new(), fixed_instant());
        assert_eq!(timeline[0].source, "SIEM");
    }
}
