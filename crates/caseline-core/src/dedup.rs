//! Similarity-based temporal deduplication.
//!
//! Bursts of near-identical events (a brute-force loop, a retrying
//! agent) are collapsed to a single representative carrying cluster
//! statistics. Correct cluster boundaries need full visibility of a
//! similarity partition in time order, so this operates on complete
//! batches, never incrementally.

use std::collections::BTreeMap;

use tracing::info;

use crate::event::{DedupInfo, EventType, TimelineEvent};

/// Default clustering window, in seconds.
pub const DEFAULT_WINDOW_SECONDS: i64 = 5;

/// Default description prefix length used in the similarity key.
pub const DEFAULT_PREFIX_CHARS: usize = 100;

/// Similarity key: events differing in any component are never merged,
/// regardless of timing. The source label is deliberately absent so that
/// duplicates spanning sources still collapse and the per-source
/// breakdown stays meaningful.
type SimilarityKey = (String, EventType, String);

/// Batch deduplicator over a fixed time window.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    window_seconds: i64,
    prefix_chars: usize,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            prefix_chars: DEFAULT_PREFIX_CHARS,
        }
    }
}

impl Deduplicator {
    pub fn new(window_seconds: i64, prefix_chars: usize) -> Self {
        Self {
            window_seconds,
            prefix_chars,
        }
    }

    /// Collapse near-identical bursts, returning representatives sorted
    /// by timestamp.
    ///
    /// Within a similarity partition an event joins the open cluster when
    /// its gap from the most recently added member is at most the window;
    /// a steady burst can therefore span more than one window. Idempotent:
    /// representatives of one partition always sit farther apart than the
    /// window.
    pub fn deduplicate(&self, events: Vec<TimelineEvent>) -> Vec<TimelineEvent> {
        if events.is_empty() {
            return events;
        }
        let original = events.len();
        let window_millis = self.window_seconds.saturating_mul(1000);

        // BTreeMap keeps partition order deterministic across runs.
        let mut partitions: BTreeMap<SimilarityKey, Vec<TimelineEvent>> = BTreeMap::new();
        for event in events {
            partitions
                .entry(self.similarity_key(&event))
                .or_default()
                .push(event);
        }

        let mut representatives = Vec::new();
        for (_, mut group) in partitions {
            group.sort_by_key(|event| event.timestamp);

            let mut cluster: Vec<TimelineEvent> = Vec::new();
            for event in group {
                let joins = match cluster.last() {
                    Some(last) => {
                        (event.timestamp - last.timestamp)
                            .num_milliseconds()
                            .abs()
                            <= window_millis
                    }
                    None => true,
                };
                if !joins {
                    representatives.push(collapse(std::mem::take(&mut cluster)));
                }
                cluster.push(event);
            }
            if !cluster.is_empty() {
                representatives.push(collapse(cluster));
            }
        }

        // Emission order is per-partition, so the global re-sort is
        // mandatory for a valid timeline.
        representatives.sort_by_key(|event| event.timestamp);

        info!(
            original,
            deduplicated = representatives.len(),
            removed = original - representatives.len(),
            "collapsed near-duplicate events"
        );
        representatives
    }

    fn similarity_key(&self, event: &TimelineEvent) -> SimilarityKey {
        let prefix: String = event.description.chars().take(self.prefix_chars).collect();
        (event.actor.clone(), event.event_type, prefix)
    }
}

/// Reduce a closed cluster to its representative: the earliest event,
/// annotated with cluster statistics and an occurrence-count suffix.
/// Size-one clusters pass through untouched.
fn collapse(mut cluster: Vec<TimelineEvent>) -> TimelineEvent {
    if cluster.len() == 1 {
        return cluster.remove(0);
    }

    let size = cluster.len();
    let mut source_breakdown: BTreeMap<String, usize> = BTreeMap::new();
    for event in &cluster {
        *source_breakdown.entry(event.source.clone()).or_default() += 1;
    }

    // The cluster arrives time-sorted.
    let first_occurrence = cluster[0].timestamp;
    let last_occurrence = cluster[size - 1].timestamp;

    let mut representative = cluster.remove(0);
    representative.details.deduplication = Some(DedupInfo {
        duplicate_count: size - 1,
        total_occurrences: size,
        source_breakdown,
        time_range_seconds: (last_occurrence - first_occurrence).num_seconds(),
        first_occurrence,
        last_occurrence,
    });
    representative
        .description
        .push_str(&format!(" ({size} occurrences)"));
    representative
}
