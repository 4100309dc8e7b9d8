//! Actor extraction and description synthesis from raw event fields.
//!
//! Upstream schemas drift, so both operations are static priority-ordered
//! lookups over candidate field lists, evaluated top-to-bottom. The first
//! usable value wins; sentinel fallbacks guarantee neither field is ever
//! empty.

use serde_json::{Map, Value};

use crate::event::{DEFAULT_ACTOR, DEFAULT_DESCRIPTION};

/// Candidate actor fields: identity first, then process, then
/// network/host identity.
pub const ACTOR_FIELDS: &[&str] = &[
    "user",
    "username",
    "user_name",
    "subject",
    "src_user",
    "source_user",
    "actor",
    "process_name",
    "exe",
    "executable",
    "src_ip",
    "source_ip",
    "client_ip",
    "hostname",
    "host",
    "computer_name",
];

/// Placeholder values that disqualify an actor candidate, compared
/// case-insensitively.
const ACTOR_SENTINELS: &[&str] = &["null", "none", "-", "unknown"];

/// Existing descriptive fields preferred over synthesized text.
const DESCRIPTION_FIELDS: &[&str] = &[
    "description",
    "message",
    "summary",
    "event_desc",
    "log_message",
    "raw_message",
    "details",
];

/// An existing description shorter than this is not meaningful enough to
/// use as-is.
const MIN_DESCRIPTION_CHARS: usize = 10;

const ACTION_FIELDS: &[&str] = &["action", "event_type", "category"];
const TARGET_FIELDS: &[&str] = &["target", "object", "file_name", "url", "dest_ip"];
const OUTCOME_FIELDS: &[&str] = &["result", "status", "outcome"];

/// Render a raw field as trimmed text, honoring upstream truthiness:
/// null, `false`, numeric zero, blank strings, and empty containers all
/// count as absent.
pub fn field_text(raw: &Map<String, Value>, field: &str) -> Option<String> {
    match raw.get(field)? {
        Value::Null => None,
        Value::Bool(b) => b.then(|| "true".to_string()),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                None
            } else {
                Some(n.to_string())
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Array(a) => (!a.is_empty()).then(|| Value::Array(a.clone()).to_string()),
        Value::Object(o) => (!o.is_empty()).then(|| Value::Object(o.clone()).to_string()),
    }
}

/// Extract the acting identity from a raw record.
///
/// Returns the value and the field that supplied it, or the `system`
/// fallback when every candidate is absent or a sentinel placeholder.
pub fn extract_actor(raw: &Map<String, Value>) -> (String, Option<&'static str>) {
    for &field in ACTOR_FIELDS {
        if let Some(value) = field_text(raw, field) {
            if !ACTOR_SENTINELS.contains(&value.to_lowercase().as_str()) {
                return (value, Some(field));
            }
        }
    }
    (DEFAULT_ACTOR.to_string(), None)
}

/// Produce readable text for an event.
///
/// Prefers an existing descriptive field when it is long enough to be
/// meaningful; otherwise assembles an action, an optional
/// `involving <target>` clause, and an optional `(<outcome>)` clause.
pub fn synthesize_description(raw: &Map<String, Value>) -> String {
    for &field in DESCRIPTION_FIELDS {
        if let Some(text) = field_text(raw, field) {
            if text.chars().count() > MIN_DESCRIPTION_CHARS {
                return text;
            }
        }
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(action) = first_text(raw, ACTION_FIELDS) {
        parts.push(action);
    }
    if let Some(target) = first_text(raw, TARGET_FIELDS) {
        parts.push(format!("involving {target}"));
    }
    if let Some(outcome) = first_text(raw, OUTCOME_FIELDS) {
        parts.push(format!("({outcome})"));
    }

    if parts.is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        parts.join(" ")
    }
}

fn first_text(raw: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| field_text(raw, field))
}
