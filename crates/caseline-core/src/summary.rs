//! Summary statistics over a finished timeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventType, Severity, TimelineEvent};

/// Overall span of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: i64,
}

/// A high-severity event surfaced for quick review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub description: String,
    pub severity: Severity,
}

/// Aggregate statistics for a finished timeline, consumed by the report
/// and audit collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineSummary {
    pub total_events: usize,
    /// Absent for an empty timeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    pub event_type_breakdown: BTreeMap<EventType, usize>,
    pub severity_breakdown: BTreeMap<Severity, usize>,
    /// Busiest actors, count-descending (name-ascending on ties), capped.
    pub top_actors: Vec<(String, usize)>,
    pub source_breakdown: BTreeMap<String, usize>,
    /// Events of severity high or above, in timeline order, capped.
    pub key_events: Vec<KeyEvent>,
}

/// Compute summary statistics for a timeline.
pub fn summarize(
    timeline: &[TimelineEvent],
    top_actor_limit: usize,
    key_event_limit: usize,
) -> TimelineSummary {
    let mut summary = TimelineSummary {
        total_events: timeline.len(),
        ..Default::default()
    };
    if timeline.is_empty() {
        return summary;
    }

    let mut actors: BTreeMap<String, usize> = BTreeMap::new();
    for event in timeline {
        *summary
            .event_type_breakdown
            .entry(event.event_type)
            .or_default() += 1;
        *summary
            .severity_breakdown
            .entry(event.severity)
            .or_default() += 1;
        *summary
            .source_breakdown
            .entry(event.source.clone())
            .or_default() += 1;
        *actors.entry(event.actor.clone()).or_default() += 1;
    }

    let start = timeline.iter().map(|e| e.timestamp).min();
    let end = timeline.iter().map(|e| e.timestamp).max();
    if let (Some(start), Some(end)) = (start, end) {
        summary.time_range = Some(TimeRange {
            start,
            end,
            duration_seconds: (end - start).num_seconds(),
        });
    }

    // BTreeMap iteration is name-ascending, and the sort is stable, so
    // ties break alphabetically.
    let mut top: Vec<(String, usize)> = actors.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1));
    top.truncate(top_actor_limit);
    summary.top_actors = top;

    summary.key_events = timeline
        .iter()
        .filter(|event| event.severity >= Severity::High)
        .take(key_event_limit)
        .map(|event| KeyEvent {
            timestamp: event.timestamp,
            actor: event.actor.clone(),
            description: event.description.clone(),
            severity: event.severity,
        })
        .collect();

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::Citation;
    use crate::event::{EventDetails, NormalizationMeta};
    use chrono::{Duration, TimeZone};
    use serde_json::Map;

    fn base_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn make_event(
        actor: &str,
        event_type: EventType,
        severity: Severity,
        source: &str,
        offset_secs: i64,
    ) -> TimelineEvent {
        TimelineEvent {
            timestamp: base_instant() + Duration::seconds(offset_secs),
            actor: actor.to_string(),
            description: format!("{actor} activity"),
            source: source.to_string(),
            event_type,
            severity,
            details: EventDetails {
                raw_fields: Map::new(),
                normalization: NormalizationMeta {
                    timestamp_field: "timestamp".to_string(),
                    actor_field: None,
                    event_type,
                    severity,
                },
                deduplication: None,
            },
            citation: Citation::new("CASE-1", "det-1", None, None, base_instant()),
            raw_event: serde_json::Value::Null,
        }
    }

    #[test]
    fn empty_timeline_reports_zero_events() {
        let summary = summarize(&[], 5, 10);
        assert_eq!(summary.total_events, 0);
        assert!(summary.time_range.is_none());
        assert!(summary.event_type_breakdown.is_empty());
        assert!(summary.key_events.is_empty());
    }

    #[test]
    fn breakdowns_count_every_event() {
        let timeline = vec![
            make_event("alice", EventType::Authentication, Severity::High, "AD", 0),
            make_event("alice", EventType::Authentication, Severity::Low, "AD", 10),
            make_event("bob", EventType::Network, Severity::Low, "FW", 20),
        ];
        let summary = summarize(&timeline, 5, 10);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.event_type_breakdown[&EventType::Authentication], 2);
        assert_eq!(summary.event_type_breakdown[&EventType::Network], 1);
        assert_eq!(summary.severity_breakdown[&Severity::Low], 2);
        assert_eq!(summary.source_breakdown["AD"], 2);
        assert_eq!(summary.source_breakdown["FW"], 1);
    }

    #[test]
    fn time_range_spans_first_to_last() {
        let timeline = vec![
            make_event("alice", EventType::Unknown, Severity::Low, "AD", 0),
            make_event("bob", EventType::Unknown, Severity::Low, "AD", 90),
        ];
        let range = summarize(&timeline, 5, 10).time_range.unwrap();
        assert_eq!(range.start, base_instant());
        assert_eq!(range.end, base_instant() + Duration::seconds(90));
        assert_eq!(range.duration_seconds, 90);
    }

    #[test]
    fn top_actors_capped_and_tie_broken_by_name() {
        let timeline = vec![
            make_event("carol", EventType::Unknown, Severity::Low, "AD", 0),
            make_event("alice", EventType::Unknown, Severity::Low, "AD", 1),
            make_event("alice", EventType::Unknown, Severity::Low, "AD", 2),
            make_event("bob", EventType::Unknown, Severity::Low, "AD", 3),
        ];
        let summary = summarize(&timeline, 2, 10);
        assert_eq!(summary.top_actors.len(), 2);
        assert_eq!(summary.top_actors[0], ("alice".to_string(), 2));
        // bob and carol both have one event; bob sorts first.
        assert_eq!(summary.top_actors[1], ("bob".to_string(), 1));
    }

    #[test]
    fn key_events_filter_by_severity_and_cap() {
        let mut timeline = vec![
            make_event("alice", EventType::Security, Severity::Critical, "EDR", 0),
            make_event("bob", EventType::Unknown, Severity::Low, "AD", 1),
        ];
        for i in 0..15 {
            timeline.push(make_event(
                "mallory",
                EventType::Security,
                Severity::High,
                "EDR",
                2 + i,
            ));
        }
        let summary = summarize(&timeline, 5, 10);
        assert_eq!(summary.key_events.len(), 10);
        assert_eq!(summary.key_events[0].severity, Severity::Critical);
        assert!(summary
            .key_events
            .iter()
            .all(|k| k.severity >= Severity::High));
    }
}
