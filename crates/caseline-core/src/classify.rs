//! Heuristic event classification.
//!
//! Two independent static taxonomies assign an event type and a severity
//! to every record. Each is an immutable ordered table of
//! (category, keyword set) pairs evaluated top-to-bottom; the first
//! category whose pattern set matches wins. The tables are configuration
//! data, compiled once into case-insensitive regex sets on first use.

use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};
use serde_json::{Map, Value};

use crate::event::{EventType, Severity};
use crate::extract::field_text;

/// Raw fields mixed into the event-type text blob alongside the
/// description.
const TYPE_CONTEXT_FIELDS: &[&str] = &["event_type", "category", "action", "log_source"];

/// Explicit metadata fields checked for severity before any text scan,
/// in priority order. Sources that populate these are more reliable than
/// keyword heuristics on free text.
const SEVERITY_FIELDS: &[&str] = &["severity", "priority", "level", "risk_score"];

/// Event-type taxonomy, highest priority first.
const EVENT_TYPE_PATTERNS: &[(EventType, &[&str])] = &[
    (
        EventType::Authentication,
        &["login", "logon", "auth", "signin", "sso", "password", "credential", "token"],
    ),
    (
        EventType::Network,
        &["connect", "tcp", "udp", "http", "https", "dns", "traffic", "packet", "socket"],
    ),
    (
        EventType::File,
        &["file", "download", "upload", "write", "read", "create", "delete", "modify", "copy"],
    ),
    (
        EventType::Process,
        &["process", "exe", "cmd", "command", "spawn", "execute", "run", "start", "kill"],
    ),
    (
        EventType::Security,
        &["alert", "block", "deny", "malware", "virus", "threat", "suspicious", "anomaly", "breach"],
    ),
];

/// Severity taxonomy, highest priority first.
const SEVERITY_PATTERNS: &[(Severity, &[&str])] = &[
    (Severity::Critical, &["critical", "emergency", "fatal", "severe"]),
    (Severity::High, &["high", "warning", "alert", "error", "fail"]),
    (Severity::Medium, &["medium", "notice", "unusual", "anomaly"]),
    (Severity::Low, &["low", "info", "debug", "trace"]),
];

fn compile(keywords: &[&str]) -> RegexSet {
    RegexSetBuilder::new(keywords)
        .case_insensitive(true)
        .build()
        .expect("static classifier keyword tables must compile")
}

static TYPE_SETS: LazyLock<Vec<(EventType, RegexSet)>> = LazyLock::new(|| {
    EVENT_TYPE_PATTERNS
        .iter()
        .map(|(event_type, keywords)| (*event_type, compile(keywords)))
        .collect()
});

static SEVERITY_SETS: LazyLock<Vec<(Severity, RegexSet)>> = LazyLock::new(|| {
    SEVERITY_PATTERNS
        .iter()
        .map(|(severity, keywords)| (*severity, compile(keywords)))
        .collect()
});

/// Classify the event type from the description plus selected raw
/// context fields. Defaults to [`EventType::Unknown`].
pub fn classify_event_type(description: &str, raw: &Map<String, Value>) -> EventType {
    let mut blob = description.to_string();
    for &field in TYPE_CONTEXT_FIELDS {
        if let Some(text) = field_text(raw, field) {
            blob.push(' ');
            blob.push_str(&text);
        }
    }

    for (event_type, set) in TYPE_SETS.iter() {
        if set.is_match(&blob) {
            return *event_type;
        }
    }
    EventType::Unknown
}

/// Classify severity, trusting explicit metadata fields over keyword
/// matches on free text. Defaults to [`Severity::Low`].
pub fn classify_severity(description: &str, raw: &Map<String, Value>) -> Severity {
    for &field in SEVERITY_FIELDS {
        if let Some(text) = field_text(raw, field) {
            for (severity, set) in SEVERITY_SETS.iter() {
                if set.is_match(&text) {
                    return *severity;
                }
            }
        }
    }

    for (severity, set) in SEVERITY_SETS.iter() {
        if set.is_match(description) {
            return *severity;
        }
    }
    Severity::Low
}
