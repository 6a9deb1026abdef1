//! Message composition and batching.
//!
//! Each change event renders to `"<name>: <status>"` with the reason and any
//! disruption descriptions appended on their own lines. Length is counted in
//! grapheme clusters, matching how the posting endpoint counts characters.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::ChangeEvent;

const ELLIPSIS: &str = "...";

/// Render one change event into a message of at most `max_chars` characters.
pub fn compose(event: &ChangeEvent, max_chars: usize) -> String {
    let line = &event.line;
    let mut text = format!("{}: {}", line.name, line.status);
    if let Some(reason) = &line.reason {
        text.push('\n');
        text.push_str(reason);
    }
    for disruption in &line.disruptions {
        text.push('\n');
        text.push_str(disruption);
    }
    truncate(text, max_chars)
}

/// Batch candidate messages for one poll cycle.
///
/// Joined with newlines they become a single post when the result fits in
/// `max_chars`; otherwise the candidates are posted separately in their
/// original order. Candidates are assumed to be individually capped already.
pub fn combine(candidates: Vec<String>, max_chars: usize) -> Vec<String> {
    if candidates.len() < 2 {
        return candidates;
    }
    let joined = candidates.join("\n");
    if grapheme_len(&joined) <= max_chars {
        vec![joined]
    } else {
        candidates
    }
}

fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Cap `text` at `max_chars` characters, marking the cut with an ellipsis.
fn truncate(text: String, max_chars: usize) -> String {
    if grapheme_len(&text) <= max_chars {
        return text;
    }
    let kept = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.graphemes(true).take(kept).collect();
    out.push_str(ELLIPSIS);
    out
}
