//! Multi-part ordering for recordings of the same logical broadcast.
//!
//! When a stream crashes and restarts, the recorder produces multiple
//! files for what viewers consider one broadcast. Each channel keeps a
//! rolling window of recent broadcast-start events; a recording's part
//! number is its 1-based position in that window.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Entries older than this fall out of the window. Pure time-based
/// eviction, independent of session lifecycle.
const RETENTION_HOURS: i64 = 16;

/// A second start signal for the same broadcast id inside this window is
/// a redelivery, not a new part.
const DUPLICATE_WINDOW_MS: i64 = 60 * 1000;

#[derive(Debug, Clone)]
struct PartEntry {
    broadcast_id: String,
    start_time: DateTime<Utc>,
}

/// Per-channel rolling windows of broadcast starts.
#[derive(Debug, Default)]
pub struct PartSequencer {
    windows: DashMap<String, Vec<PartEntry>>,
}

impl PartSequencer {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Record a broadcast start at `at`.
    ///
    /// The window is re-sorted by start time and purged after insertion,
    /// so ordinals handed out later reflect chronological order.
    pub fn record_start(&self, channel_id: &str, broadcast_id: &str, at: DateTime<Utc>) {
        let mut window = self.windows.entry(channel_id.to_string()).or_default();
        let duplicate = window.iter().any(|e| {
            e.broadcast_id == broadcast_id
                && (at - e.start_time).num_milliseconds().abs() <= DUPLICATE_WINDOW_MS
        });
        if duplicate {
            tracing::debug!(channel_id, broadcast_id, "duplicate broadcast start suppressed");
        } else {
            tracing::info!(channel_id, broadcast_id, "broadcast start tracked");
            window.push(PartEntry {
                broadcast_id: broadcast_id.to_string(),
                start_time: at,
            });
        }
        window.sort_by_key(|e| e.start_time);
        purge(&mut window, at);
    }

    /// Resolve the 1-based part number for `broadcast_id`.
    pub fn resolve_part_number(&self, channel_id: &str, broadcast_id: &str) -> usize {
        self.resolve_part_number_at(channel_id, broadcast_id, Utc::now())
    }

    /// Same as [`Self::resolve_part_number`] with an explicit clock; the
    /// retention horizon is measured against `now`.
    ///
    /// A broadcast whose start signal was missed is inserted at `now`
    /// and takes whatever position that yields - likely the end of the
    /// window. If the true first part already aged past the horizon the
    /// ordinal can be wrong; accepted approximation, not corrected here.
    pub fn resolve_part_number_at(
        &self,
        channel_id: &str,
        broadcast_id: &str,
        now: DateTime<Utc>,
    ) -> usize {
        let mut window = self.windows.entry(channel_id.to_string()).or_default();
        purge(&mut window, now);

        if let Some(idx) = window.iter().position(|e| e.broadcast_id == broadcast_id) {
            return idx + 1;
        }

        tracing::warn!(
            channel_id,
            broadcast_id,
            "broadcast was never tracked, inserting at current time"
        );
        window.push(PartEntry {
            broadcast_id: broadcast_id.to_string(),
            start_time: now,
        });
        window.sort_by_key(|e| e.start_time);
        window
            .iter()
            .position(|e| e.broadcast_id == broadcast_id)
            .map(|idx| idx + 1)
            .unwrap_or(window.len())
    }
}

fn purge(window: &mut Vec<PartEntry>, now: DateTime<Utc>) {
    let horizon = now - Duration::hours(RETENTION_HOURS);
    window.retain(|e| e.start_time >= horizon);
}
