//! Timestamp merging: collapse noisy near-duplicate category changes
//! into a clean chapter timeline.
//!
//! Twitch delivers a burst of channel.update events when a streamer
//! fiddles with their title or category. Two consecutive records that
//! are close in time and still share a game or title describe one
//! chapter, not two; the later event's labels win but the earlier
//! timestamp is kept.

use crate::record::CategoryRecord;

/// Consecutive records closer together than this are merge candidates.
const CLOSE_THRESHOLD_MS: i64 = 60 * 1000;

/// Render an ordered record sequence into chapter text.
///
/// Each merged entry becomes one line, `HH:MM:SS game - title\n`, with
/// the offset measured from the *original* first record's timestamp so
/// the output always reads as time since stream start no matter how many
/// merges happened.
///
/// Returns `None` for an empty sequence, or when the first record has no
/// usable timestamp - that timestamp is the reference point for every
/// offset, so nothing can be rendered without it. Interior records with
/// unusable timestamps are dropped.
pub fn generate_chapter_text(records: &[CategoryRecord]) -> Option<String> {
    let first = records.first()?;
    let Some(reference) = first.start_timestamp else {
        tracing::error!(
            game = %first.game,
            title = %first.title,
            "invalid reference timestamp in first record"
        );
        return None;
    };

    let merged = merge_records(records);

    let mut text = String::new();
    for entry in &merged {
        let Some(at) = entry.start_timestamp else {
            continue;
        };
        let ms = (at - reference).num_milliseconds();
        let secs = if ms <= 0 { 0 } else { (ms / 1000) as u64 };
        text.push_str(&format!(
            "{} {} - {}\n",
            to_hhmmss(secs),
            entry.game,
            entry.title
        ));
    }
    Some(text)
}

/// Collapse the raw sequence into merged chapter entries.
///
/// The merge decision is local: `delta` is measured against the *last
/// merged* entry, not the sequence start, so a run of rapid edits
/// collapses step by step. `delta` is signed - an out-of-order earlier
/// event inside the window still merges and pulls the timestamp back.
fn merge_records(records: &[CategoryRecord]) -> Vec<CategoryRecord> {
    let mut merged: Vec<CategoryRecord> = Vec::new();
    let Some(first) = records.first() else {
        return merged;
    };
    merged.push(first.clone());

    for current in &records[1..] {
        let Some(current_at) = current.start_timestamp else {
            tracing::warn!(
                game = %current.game,
                title = %current.title,
                "dropping record with invalid timestamp"
            );
            continue;
        };

        // merged is never empty past the first push
        let last_idx = merged.len() - 1;
        let last = &mut merged[last_idx];
        let Some(last_at) = last.start_timestamp else {
            merged.push(current.clone());
            continue;
        };

        let delta_ms = (current_at - last_at).num_milliseconds();
        if delta_ms <= CLOSE_THRESHOLD_MS
            && (current.game == last.game || current.title == last.title)
        {
            last.start_timestamp = Some(last_at.min(current_at));
            last.game = current.game.clone();
            last.title = current.title.clone();
        } else {
            merged.push(current.clone());
        }
    }

    merged
}

fn to_hhmmss(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap()
    }

    fn rec(game: &str, title: &str, offset_secs: i64) -> CategoryRecord {
        CategoryRecord::new(game, title, t0() + Duration::seconds(offset_secs))
    }

    fn invalid(game: &str, title: &str) -> CategoryRecord {
        CategoryRecord {
            game: game.into(),
            title: title.into(),
            start_timestamp: None,
        }
    }

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(generate_chapter_text(&[]), None);
    }

    #[test]
    fn invalid_first_timestamp_yields_none() {
        let records = vec![invalid("A", "B"), rec("C", "D", 90)];
        assert_eq!(generate_chapter_text(&records), None);
    }

    #[test]
    fn single_record_renders_at_zero() {
        let records = vec![rec("A", "B", 0)];
        assert_eq!(
            generate_chapter_text(&records).unwrap(),
            "00:00:00 A - B\n"
        );
    }

    #[test]
    fn distinct_games_past_threshold_stay_separate() {
        let records = vec![rec("A", "t", 0), rec("B", "t2", 90), rec("C", "t3", 180)];
        assert_eq!(
            generate_chapter_text(&records).unwrap(),
            "00:00:00 A - t\n00:01:30 B - t2\n00:03:00 C - t3\n"
        );
    }

    #[test]
    fn close_entries_sharing_a_label_collapse() {
        // +90s, +105s, +180s, +239s: the middle run shares a label with
        // the running last-merged entry and collapses onto it.
        let records = vec![
            rec("A", "start", 0),
            rec("B", "mid", 90),
            rec("B", "mid edited", 105),
            rec("C", "mid edited", 180),
            rec("C", "final", 239),
        ];
        let text = generate_chapter_text(&records).unwrap();
        assert_eq!(
            text,
            "00:00:00 A - start\n00:01:30 B - mid edited\n00:03:00 C - final\n"
        );
    }

    #[test]
    fn merge_keeps_earlier_timestamp_but_later_labels() {
        // Offsets stay anchored to the original first record even when
        // the chain of merges rewrites labels.
        let records = vec![
            rec("A", "start", 0),
            rec("B", "two", 90),
            rec("B", "two fixed", 100),
            rec("C", "three", 180),
        ];
        let text = generate_chapter_text(&records).unwrap();
        assert_eq!(
            text,
            "00:00:00 A - start\n00:01:30 B - two fixed\n00:03:00 C - three\n"
        );
    }

    #[test]
    fn five_records_collapse_to_three_lines() {
        let records = vec![
            rec("A", "one", 0),
            rec("B", "two", 90),
            rec("B", "two again", 105),
            rec("B", "two final", 150),
            rec("C", "three", 239),
        ];
        let text = generate_chapter_text(&records).unwrap();
        assert_eq!(
            text,
            "00:00:00 A - one\n00:01:30 B - two final\n00:03:59 C - three\n"
        );
    }

    #[test]
    fn interior_invalid_record_is_dropped() {
        let records = vec![rec("A", "one", 0), invalid("X", "ghost"), rec("B", "two", 180)];
        let text = generate_chapter_text(&records).unwrap();
        assert_eq!(text, "00:00:00 A - one\n00:03:00 B - two\n");
    }

    #[test]
    fn distinct_labels_within_threshold_do_not_merge() {
        let records = vec![rec("A", "one", 0), rec("B", "two", 30)];
        let text = generate_chapter_text(&records).unwrap();
        assert_eq!(text, "00:00:00 A - one\n00:00:30 B - two\n");
    }

    #[test]
    fn out_of_order_event_within_window_pulls_timestamp_back() {
        // An earlier event arriving late still merges; the displayed
        // offset uses the earlier of the two timestamps.
        let records = vec![rec("A", "one", 0), rec("B", "two", 120), rec("B", "late", 100)];
        let text = generate_chapter_text(&records).unwrap();
        assert_eq!(text, "00:00:00 A - one\n00:01:40 B - late\n");
    }

    #[test]
    fn negative_offsets_clamp_to_zero() {
        let records = vec![rec("A", "one", 0), rec("B", "early", -200)];
        let text = generate_chapter_text(&records).unwrap();
        assert_eq!(text, "00:00:00 A - one\n00:00:00 B - early\n");
    }

    #[test]
    fn hours_are_unbounded() {
        let records = vec![rec("A", "one", 0), rec("B", "marathon", 100 * 3600 + 61)];
        let text = generate_chapter_text(&records).unwrap();
        assert_eq!(text, "00:00:00 A - one\n100:01:01 B - marathon\n");
    }

    #[test]
    fn offsets_are_non_decreasing_for_ordered_input() {
        let records = vec![
            rec("A", "a", 0),
            rec("B", "b", 45),
            rec("C", "c", 200),
            rec("D", "d", 1000),
        ];
        let text = generate_chapter_text(&records).unwrap();
        let stamps: Vec<&str> = text.lines().map(|l| &l[..8]).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn merging_already_merged_output_is_idempotent() {
        let records = vec![rec("A", "a", 0), rec("B", "b", 90), rec("C", "c", 300)];
        let once = generate_chapter_text(&records).unwrap();
        // No two entries are within 60s with matching labels, so a second
        // pass over the same records changes nothing.
        let twice = generate_chapter_text(&merge_records(&records)).unwrap();
        assert_eq!(once, twice);
    }
}
