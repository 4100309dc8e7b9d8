//! Timeline construction settings, loadable from TOML.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables for timeline construction. Every field has a default, so a
/// partial (or absent) config file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Clustering window for temporal deduplication, in seconds.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_seconds: i64,

    /// Description prefix length used in the similarity key.
    #[serde(default = "default_prefix_chars")]
    pub similarity_prefix_chars: usize,

    /// Maximum high-severity events surfaced in the summary.
    #[serde(default = "default_key_event_limit")]
    pub key_event_limit: usize,

    /// Maximum actors surfaced in the summary.
    #[serde(default = "default_top_actor_limit")]
    pub top_actor_limit: usize,

    /// Source label for records that carry no source field.
    #[serde(default = "default_source")]
    pub default_source: String,
}

fn default_dedup_window() -> i64 {
    5
}

fn default_prefix_chars() -> usize {
    100
}

fn default_key_event_limit() -> usize {
    10
}

fn default_top_actor_limit() -> usize {
    5
}

fn default_source() -> String {
    "SIEM".to_string()
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            dedup_window_seconds: default_dedup_window(),
            similarity_prefix_chars: default_prefix_chars(),
            key_event_limit: default_key_event_limit(),
            top_actor_limit: default_top_actor_limit(),
            default_source: default_source(),
        }
    }
}

impl TimelineConfig {
    /// Load settings from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}
