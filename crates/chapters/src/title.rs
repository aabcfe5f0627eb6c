//! Bounded-length display titles for uploaded recordings.
//!
//! Budgets are measured in grapheme clusters, not bytes or code points,
//! so emoji and combining-character titles truncate where a human would
//! expect.

use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_MAX_LENGTH: usize = 100;

const ELLIPSIS: char = '…';

/// Build `[<date>] [PART <n> - ]<title> [<CHANNEL> TWITCH VOD]`.
///
/// The stream title gets whatever budget the fixed pieces leave out of
/// `max_length`; on overflow it keeps `budget - 1` clusters plus one
/// ellipsis, so the result never exceeds `max_length` grapheme clusters.
/// The part prefix only appears from part 2 onward.
///
/// The fixed pieces themselves are never truncated: a `max_length`
/// smaller than their combined length drops the title body entirely and
/// the result is the fixed pieces alone, exceeding the bound. Channel
/// logins are capped at 25 characters upstream, so the default bound of
/// 100 always leaves the body a positive budget.
pub fn render_title(
    date: &str,
    channel_name: &str,
    title: &str,
    part_number: Option<u32>,
    max_length: usize,
) -> String {
    let prefix = format!("[{date}] ");
    let part_prefix = match part_number {
        Some(n) if n > 1 => format!("PART {n} - "),
        _ => String::new(),
    };
    let suffix = format!(" [{} TWITCH VOD]", channel_name.to_uppercase());

    let fixed = grapheme_len(&prefix) + grapheme_len(&part_prefix) + grapheme_len(&suffix);
    let budget = max_length.saturating_sub(fixed);

    let body = if grapheme_len(title) <= budget {
        title.to_string()
    } else if budget == 0 {
        String::new()
    } else {
        let mut truncated: String = title.graphemes(true).take(budget - 1).collect();
        truncated.push(ELLIPSIS);
        truncated
    };

    format!("{prefix}{part_prefix}{body}{suffix}")
}

/// [`render_title`] with the standard 100-cluster bound.
pub fn render_title_default(
    date: &str,
    channel_name: &str,
    title: &str,
    part_number: Option<u32>,
) -> String {
    render_title(date, channel_name, title, part_number, DEFAULT_MAX_LENGTH)
}

/// Replace angle brackets with their full-width forms.
///
/// Upload metadata fields reject `<` and `>`; the full-width characters
/// read the same without tripping the validation.
pub fn sanitize_angle_brackets(s: &str) -> String {
    s.replace('<', "＜").replace('>', "＞")
}

pub fn grapheme_len(s: &str) -> usize {
    s.graphemes(true).count()
}
