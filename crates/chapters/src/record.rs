//! Category-change records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (game, title) state of a broadcast, starting at a timestamp.
///
/// `start_timestamp` is `None` when the upstream event carried a
/// timestamp that failed to parse. The merger decides whether that is
/// fatal (first record) or droppable (interior record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub game: String,
    pub title: String,
    pub start_timestamp: Option<DateTime<Utc>>,
}

impl CategoryRecord {
    pub fn new(game: impl Into<String>, title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            game: game.into(),
            title: title.into(),
            start_timestamp: Some(at),
        }
    }

    /// Build a record from wire values, parsing an RFC 3339 timestamp.
    ///
    /// A malformed timestamp yields a record with `start_timestamp: None`
    /// rather than an error, so the merger's drop/fail rules apply.
    pub fn from_wire(game: impl Into<String>, title: impl Into<String>, timestamp: &str) -> Self {
        let parsed = DateTime::parse_from_rfc3339(timestamp)
            .map(|t| t.with_timezone(&Utc))
            .ok();
        if parsed.is_none() {
            tracing::warn!(timestamp, "unparseable category-change timestamp");
        }
        Self {
            game: game.into(),
            title: title.into(),
            start_timestamp: parsed,
        }
    }

    /// Whether this record differs from the given labels in game or title.
    pub fn labels_differ(&self, game: &str, title: &str) -> bool {
        self.game != game || self.title != title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_wire_parses_rfc3339() {
        let rec = CategoryRecord::from_wire("Factorio", "launch day", "2026-01-05T18:00:00Z");
        assert!(rec.start_timestamp.is_some());
    }

    #[test]
    fn from_wire_keeps_labels_on_bad_timestamp() {
        let rec = CategoryRecord::from_wire("Factorio", "launch day", "not-a-date");
        assert!(rec.start_timestamp.is_none());
        assert_eq!(rec.game, "Factorio");
        assert_eq!(rec.title, "launch day");
    }

    #[test]
    fn labels_differ_checks_both_fields() {
        let rec = CategoryRecord::from_wire("A", "B", "2026-01-05T18:00:00Z");
        assert!(!rec.labels_differ("A", "B"));
        assert!(rec.labels_differ("A", "C"));
        assert!(rec.labels_differ("C", "B"));
    }
}
