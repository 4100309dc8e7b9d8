//! Provenance citations with a deterministic integrity hash.
//!
//! Every timeline event carries a citation tying it back to the case,
//! detection, and query that produced it. The audit hash is a provenance
//! fingerprint for downstream audit chaining, not a security boundary,
//! so truncation to a short fixed length is acceptable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Detection identifier used when a batch names no source detections.
pub const UNKNOWN_DETECTION: &str = "unknown";

/// Length of the truncated hex audit hash.
pub const AUDIT_HASH_CHARS: usize = 16;

/// Provenance record for one timeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Case under investigation.
    pub case_id: String,
    /// Detection that motivated the originating query.
    pub detection_id: String,
    /// Upstream query identifier, when the executor assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    /// Direct URI to the event in the upstream system, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_uri: Option<String>,
    /// Instant the event was extracted from upstream results.
    pub extracted_at: DateTime<Utc>,
    /// Truncated SHA-256 over the sorted-key serialization of every
    /// other field. Computed once at creation, never recomputed.
    pub audit_hash: String,
}

impl Citation {
    /// Build a citation and stamp its integrity hash.
    pub fn new(
        case_id: impl Into<String>,
        detection_id: impl Into<String>,
        query_id: Option<String>,
        direct_uri: Option<String>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        let mut citation = Self {
            case_id: case_id.into(),
            detection_id: detection_id.into(),
            query_id,
            direct_uri,
            extracted_at,
            audit_hash: String::new(),
        };
        citation.audit_hash = citation.compute_hash();
        citation
    }

    /// Hash the sorted-key JSON serialization of all fields except the
    /// hash itself. `serde_json` maps are key-ordered, which makes the
    /// serialization canonical.
    fn compute_hash(&self) -> String {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.remove("audit_hash");
        }
        let digest = Sha256::digest(value.to_string().as_bytes());
        let mut hash = hex::encode(digest);
        hash.truncate(AUDIT_HASH_CHARS);
        hash
    }
}
