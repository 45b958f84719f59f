//! Splitting of selected text into service-sized chunks.
//!
//! The service rejects oversized input, so text is cut into groups of at
//! most `max_words` whitespace-separated words. Sentence and paragraph
//! boundaries are not respected: a flagged phrase that straddles two
//! chunks is reported truncated, and the reconciler simply fails to find
//! it later.

use unicode_segmentation::UnicodeSegmentation;

/// Default number of words per service request
pub const DEFAULT_MAX_WORDS: usize = 300;

/// Number of grapheme clusters kept by [`preview`]
const PREVIEW_GRAPHEMES: usize = 100;

/// Split `text` into chunks of at most `max_words` words.
///
/// Runs of whitespace (including newlines) collapse to a single space
/// inside a chunk. Empty or whitespace-only input yields no chunks at all,
/// which callers treat as "nothing to check". A `max_words` of zero is
/// treated as one.
pub fn chunk(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();

    words
        .chunks(max_words)
        .map(|group| group.join(" "))
        .collect()
}

/// First hundred grapheme clusters of `text`, for log lines.
pub fn preview(text: &str) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(PREVIEW_GRAPHEMES).collect();
    if graphemes.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
