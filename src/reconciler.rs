//! Applying the user's chosen corrections back into the original text.
//!
//! Each correction binds to the first occurrence of its `original` that no
//! earlier correction has claimed. Replacements are spliced into the
//! original string in one pass, so bytes outside claimed spans are copied
//! through untouched.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::normalizer::Correction;

/// The user's decision for one correction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "text")]
pub enum UserSelection {
    #[default]
    KeptOriginal,
    Candidate(String),
    Custom(String),
}

impl UserSelection {
    /// Text that should replace `correction.original`.
    pub fn replacement<'a>(&'a self, correction: &'a Correction) -> &'a str {
        match self {
            UserSelection::KeptOriginal => correction.original.as_str(),
            UserSelection::Candidate(text) => text.as_str(),
            UserSelection::Custom(text) if text.trim().is_empty() => correction.original.as_str(),
            UserSelection::Custom(text) => text.trim(),
        }
    }
}

/// Produce the final text with every selection applied.
///
/// `selections[i]` belongs to `corrections[i]`; missing entries count as
/// [`UserSelection::KeptOriginal`]. Corrections whose `original` cannot be
/// found in unclaimed text are skipped.
pub fn apply(original: &str, corrections: &[Correction], selections: &[UserSelection]) -> String {
    let kept = UserSelection::KeptOriginal;
    let mut claimed: Vec<(Range<usize>, &str)> = Vec::with_capacity(corrections.len());

    for (i, correction) in corrections.iter().enumerate() {
        if correction.original.is_empty() {
            continue;
        }
        let selection = selections.get(i).unwrap_or(&kept);

        match find_unclaimed(original, &correction.original, &claimed) {
            Some(span) => claimed.push((span, selection.replacement(correction))),
            None => tracing::debug!("Correction {} not found in text: {}", i, correction.original),
        }
    }

    claimed.sort_by_key(|(span, _)| span.start);

    let mut result = String::with_capacity(original.len());
    let mut cursor = 0;
    for (span, replacement) in claimed {
        result.push_str(&original[cursor..span.start]);
        result.push_str(replacement);
        cursor = span.end;
    }
    result.push_str(&original[cursor..]);
    result
}

/// First occurrence of `needle` in `haystack` that overlaps no claimed span.
fn find_unclaimed(haystack: &str, needle: &str, claimed: &[(Range<usize>, &str)]) -> Option<Range<usize>> {
    let mut from = 0;
    while from <= haystack.len() {
        let start = from + haystack[from..].find(needle)?;
        let span = start..start + needle.len();

        let overlaps = claimed
            .iter()
            .any(|(taken, _)| span.start < taken.end && taken.start < span.end);
        if !overlaps {
            return Some(span);
        }

        // step past the first char of this match to try overlapping occurrences
        let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn correction(original: &str, candidates: &[&str]) -> Correction {
        Correction {
            original: original.to_string(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            help: String::new(),
        }
    }

    #[test]
    fn test_no_corrections_returns_input() {
        assert_eq!(apply("나는 밥을먹었다", &[], &[]), "나는 밥을먹었다");
    }

    #[test]
    fn test_all_kept_returns_input() {
        let corrections = vec![correction("밥을먹었다", &["밥을 먹었다"])];
        assert_eq!(apply("나는 밥을먹었다", &corrections, &[]), "나는 밥을먹었다");
    }

    #[test]
    fn test_accept_first_candidate() {
        let corrections = vec![correction("밥을먹었다", &["밥을 먹었다"])];
        let selections = vec![UserSelection::Candidate("밥을 먹었다".to_string())];

        assert_eq!(apply("나는 밥을먹었다", &corrections, &selections), "나는 밥을 먹었다");
    }

    #[test]
    fn test_repeated_originals_bind_in_order() {
        let corrections = vec![correction("가다", &["간다"]), correction("가다", &["갔다"])];
        let selections = vec![
            UserSelection::Candidate("간다".to_string()),
            UserSelection::Candidate("갔다".to_string()),
        ];

        assert_eq!(apply("가다 가다", &corrections, &selections), "간다 갔다");
    }

    #[test]
    fn test_kept_original_still_claims_its_span() {
        let corrections = vec![correction("가다", &["간다"]), correction("가다", &["갔다"])];
        let selections = vec![
            UserSelection::KeptOriginal,
            UserSelection::Candidate("갔다".to_string()),
        ];

        assert_eq!(apply("가다 가다", &corrections, &selections), "가다 갔다");
    }

    #[test]
    fn test_replacement_is_never_rematched() {
        // the first replacement contains the second original
        let corrections = vec![correction("됬", &["됐"]), correction("됐", &["됬"])];
        let selections = vec![
            UserSelection::Candidate("됐".to_string()),
            UserSelection::Candidate("됬".to_string()),
        ];

        assert_eq!(apply("됬다 했다", &corrections, &selections), "됐다 했다");
    }

    #[test]
    fn test_missing_original_is_skipped() {
        let corrections = vec![
            correction("없는말", &["있는 말"]),
            correction("않되", &["안 돼"]),
        ];
        let selections = vec![
            UserSelection::Candidate("있는 말".to_string()),
            UserSelection::Candidate("안 돼".to_string()),
        ];

        assert_eq!(apply("그건 않되", &corrections, &selections), "그건 안 돼");
    }

    #[test]
    fn test_custom_text() {
        let corrections = vec![correction("할께", &["할게"])];
        let selections = vec![UserSelection::Custom(" 하겠다 ".to_string())];
        assert_eq!(apply("내가 할께", &corrections, &selections), "내가 하겠다");
    }

    #[test]
    fn test_blank_custom_falls_back_to_original() {
        let corrections = vec![correction("할께", &["할게"])];
        let selections = vec![UserSelection::Custom("  ".to_string())];
        assert_eq!(apply("내가 할께", &corrections, &selections), "내가 할께");
    }

    #[test]
    fn test_corrections_out_of_text_order() {
        let corrections = vec![correction("셋", &["3"]), correction("하나", &["1"])];
        let selections = vec![
            UserSelection::Candidate("3".to_string()),
            UserSelection::Candidate("1".to_string()),
        ];
        assert_eq!(apply("하나 둘 셋", &corrections, &selections), "1 둘 3");
    }

    #[test]
    fn test_overlapping_occurrence_is_found() {
        let corrections = vec![correction("aa", &["x"]), correction("aa", &["y"])];
        let selections = vec![
            UserSelection::Candidate("x".to_string()),
            UserSelection::Candidate("y".to_string()),
        ];
        // "aaaa": first claims 0..2, second claims 2..4
        assert_eq!(apply("aaaa", &corrections, &selections), "xy");
        // "aaa": second has no unclaimed occurrence left
        assert_eq!(apply("aaa", &corrections, &selections), "xa");
    }

    #[test]
    fn test_text_outside_spans_is_untouched() {
        let text = "  첫 줄\r\n\t둘째 줄의 됬다  \n";
        let corrections = vec![correction("됬다", &["됐다"])];
        let selections = vec![UserSelection::Candidate("됐다".to_string())];

        assert_eq!(apply(text, &corrections, &selections), "  첫 줄\r\n\t둘째 줄의 됐다  \n");
    }

    #[test]
    fn test_selection_serde_shape() {
        let json = serde_json::to_string(&UserSelection::Candidate("됐다".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"candidate","text":"됐다"}"#);

        let kept: UserSelection = serde_json::from_str(r#"{"kind":"kept-original"}"#).unwrap();
        assert_eq!(kept, UserSelection::KeptOriginal);
    }
}
