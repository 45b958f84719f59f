//! Parsing of spell-check service responses into corrections.
//!
//! The service changed its response shape across revisions. Each shape is
//! handled by its own extractor, selected by [`ResponseFormat`], and all of
//! them funnel into the same per-error mapping.
//!
//! An unrecognizable body is logged and treated as "no corrections". Only a
//! server error digest is reported as an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chunker::preview;
use crate::entities::decode_html_entities;
use crate::error::SpellError;

/// One flagged span and its remediation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// Substring of the checked text that the service flagged
    pub original: String,
    /// Suggested replacements in service order
    pub candidates: Vec<String>,
    /// Plain-text explanation
    pub help: String,
}

impl Correction {
    /// Candidates to offer the user; keeps the original when the service had no suggestion.
    pub fn options(&self) -> Vec<&str> {
        if self.candidates.is_empty() {
            vec![self.original.as_str()]
        } else {
            self.candidates.iter().map(String::as_str).collect()
        }
    }
}

/// Corrections of one invocation, in text order across all chunks
pub type CorrectionBatch = Vec<Correction>;

/// Wire formats the service has used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseFormat {
    /// HTML page with a `data = [...]` script assignment
    HtmlEmbedded,
    /// Newline-delimited records tagged `0:`, `1:`, `2:T<len>,`
    StreamLines,
    /// Bare JSON array of sentence objects
    FlatArray,
}

/// Stream record holding the main payload
const MAIN_TAG: &str = "1";
/// Stream record holding the action header
const HEADER_TAG: &str = "0";
/// Stream record holding referenced text
const REFERENCE_TAG: &str = "2";
/// Value of `str` meaning "see the referenced text record"
const REFERENCE_SENTINEL: &str = "$2";

static DATA_ASSIGNMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\bvar\s+)?\bdata\s*=\s*\[").expect("data assignment regex"));

static STREAM_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^[0-9a-f]+:[\[{"T]"#).expect("stream line regex"));

impl ResponseFormat {
    /// Guess the format from the body. Only meant for offline diagnostics;
    /// the service client knows which format it asked for.
    pub fn sniff(body: &str) -> Option<Self> {
        let trimmed = body.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            Some(ResponseFormat::FlatArray)
        } else if DATA_ASSIGNMENT_RE.is_match(body) {
            Some(ResponseFormat::HtmlEmbedded)
        } else if STREAM_LINE_RE.is_match(body) {
            Some(ResponseFormat::StreamLines)
        } else {
            None
        }
    }

    /// Extract the JSON payload that carries sentence objects.
    fn extract(self, body: &str) -> Option<Value> {
        match self {
            ResponseFormat::HtmlEmbedded => extract_html_embedded(body),
            ResponseFormat::StreamLines => extract_stream_lines(body),
            ResponseFormat::FlatArray => extract_flat_array(body),
        }
    }
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseFormat::HtmlEmbedded => "html-embedded",
            ResponseFormat::StreamLines => "stream-lines",
            ResponseFormat::FlatArray => "flat-array",
        };
        f.write_str(name)
    }
}

/// Per-error object as sent by the service
#[derive(Debug, Deserialize)]
struct ErrInfo {
    #[serde(rename = "orgStr", default)]
    org_str: Option<String>,
    #[serde(rename = "candWord", default)]
    cand_word: Option<String>,
    #[serde(default)]
    help: Option<String>,
}

impl ErrInfo {
    fn into_correction(self) -> Correction {
        let original = self.org_str.unwrap_or_default();
        let mut candidates: Vec<String> = self
            .cand_word
            .as_deref()
            .unwrap_or_default()
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if candidates.is_empty() && !original.is_empty() {
            candidates.push(original.clone());
        }

        Correction {
            original,
            candidates,
            help: decode_html_entities(self.help.as_deref().unwrap_or_default()),
        }
    }
}

/// Parse a response body into corrections.
pub fn normalize(body: &str, format: ResponseFormat) -> Result<CorrectionBatch, SpellError> {
    let Some(payload) = format.extract(body) else {
        tracing::warn!(
            "No {} payload found in response: {}",
            format,
            preview(body)
        );
        return Ok(Vec::new());
    };

    let mut corrections = Vec::new();
    collect_corrections(&payload, &mut corrections)?;
    tracing::debug!("Normalized {} corrections ({})", corrections.len(), format);
    Ok(corrections)
}

/// Parse a body whose format is unknown, guessing it first.
pub fn normalize_auto(body: &str) -> Result<CorrectionBatch, SpellError> {
    match ResponseFormat::sniff(body) {
        Some(format) => normalize(body, format),
        None => {
            tracing::warn!("Unrecognized response shape: {}", preview(body));
            Ok(Vec::new())
        }
    }
}

/// Walk a payload and collect corrections from every sentence object in it.
///
/// Accepts sentence objects (`{str, errInfo}`), wrappers (`{data: ...}`)
/// and arrays of either. Anything else contributes nothing.
fn collect_corrections(value: &Value, out: &mut CorrectionBatch) -> Result<(), SpellError> {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_corrections(item, out)?;
            }
        }
        Value::Object(map) => {
            // only structured data can hold sentences
            let data = map.get("data").filter(|d| d.is_object() || d.is_array());

            if let Some(digest) = map.get("digest") {
                if data.is_none() {
                    let digest = match digest {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    return Err(SpellError::Server { digest });
                }
            }

            if let Some(data) = data {
                return collect_corrections(data, out);
            }

            if let Some(err_info) = map.get("errInfo") {
                collect_sentence(map.get("str"), err_info, out);
            } else if let Some(error) = map.get("error").filter(|e| !e.is_null()) {
                tracing::warn!("Service reported an error without data: {}", error);
            }
        }
        _ => {}
    }
    Ok(())
}

fn collect_sentence(text: Option<&Value>, err_info: &Value, out: &mut CorrectionBatch) {
    if text.and_then(Value::as_str) == Some(REFERENCE_SENTINEL) {
        tracing::debug!("Sentence text refers to the referenced-text record");
    }

    let Some(entries) = err_info.as_array() else {
        tracing::warn!("errInfo is not an array: {}", err_info);
        return;
    };

    for entry in entries {
        match ErrInfo::deserialize(entry) {
            Ok(info) => {
                let correction = info.into_correction();
                if correction.original.is_empty() {
                    tracing::debug!("Skipping correction without original text: {}", entry);
                    continue;
                }
                out.push(correction);
            }
            Err(e) => tracing::warn!("Skipping malformed errInfo entry {}: {}", entry, e),
        }
    }
}

fn extract_html_embedded(body: &str) -> Option<Value> {
    let m = DATA_ASSIGNMENT_RE.find(body)?;
    // the match ends right after the opening bracket
    let array_text = extract_balanced(&body[m.end() - 1..])?;

    match serde_json::from_str(array_text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Embedded data array is not valid JSON: {}", e);
            None
        }
    }
}

fn extract_flat_array(body: &str) -> Option<Value> {
    match serde_json::from_str(body.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Response is not valid JSON: {}", e);
            None
        }
    }
}

fn extract_stream_lines(body: &str) -> Option<Value> {
    let mut main: Option<Value> = None;
    let mut referenced_text: Option<&str> = None;

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        let Some((tag, content)) = line.split_once(':') else {
            continue;
        };

        match tag {
            HEADER_TAG => {
                if let Err(e) = serde_json::from_str::<Value>(content) {
                    tracing::warn!("Failed to parse header record: {} ({})", e, preview(content));
                }
            }
            MAIN_TAG => match serde_json::from_str::<Value>(content) {
                Ok(value) => main = Some(value),
                Err(e) => {
                    tracing::warn!("Failed to parse main record: {} ({})", e, preview(content))
                }
            },
            REFERENCE_TAG if content.starts_with('T') => {
                let text = content.split_once(',').map_or(content, |(_, text)| text);
                tracing::debug!("Found referenced text: {}", preview(text));
                referenced_text = Some(text);
            }
            _ => tracing::debug!("Ignoring stream record {}", tag),
        }
    }

    let Some(main) = main else {
        if body.contains("\"errInfo\"") {
            tracing::warn!("Main record missing although the response mentions errInfo");
        }
        return None;
    };

    let refers_to_text = main
        .pointer("/data/str")
        .and_then(Value::as_str)
        .is_some_and(|s| s == REFERENCE_SENTINEL);
    if refers_to_text && referenced_text.is_some() {
        tracing::debug!("Main record refers to the referenced text; corrections use their own orgStr");
    }

    Some(main)
}

/// Slice of `text` from its leading `[` or `{` up to the matching close,
/// skipping brackets inside JSON strings.
fn extract_balanced(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ERR_LIST: &str = r#"[
        {"orgStr": "됬다", "candWord": "됐다| 됬다 ", "help": "<br>설명"},
        {"orgStr": "할께요", "candWord": "할게요", "help": "&lt;할게요&gt;가 맞습니다."}
    ]"#;

    fn expected() -> CorrectionBatch {
        vec![
            Correction {
                original: "됬다".to_string(),
                candidates: vec!["됐다".to_string(), "됬다".to_string()],
                help: "\n설명".to_string(),
            },
            Correction {
                original: "할께요".to_string(),
                candidates: vec!["할게요".to_string()],
                help: "<할게요>가 맞습니다.".to_string(),
            },
        ]
    }

    #[test]
    fn test_flat_array() {
        let body = format!(r#"[{{"str": "문장", "errInfo": {}, "idx": 0}}]"#, ERR_LIST);
        let result = normalize(&body, ResponseFormat::FlatArray).unwrap();
        assert_eq!(result, expected());
    }

    #[test]
    fn test_flat_array_wrapper_pair() {
        let body = format!(
            r#"[{{"a": "$@1"}}, {{"data": {{"str": "문장", "errInfo": {}}}}}]"#,
            ERR_LIST
        );
        let result = normalize(&body, ResponseFormat::FlatArray).unwrap();
        assert_eq!(result, expected());
    }

    #[test]
    fn test_html_embedded() {
        let body = format!(
            "<html><head><script>\n\tvar data = [{{\"str\": \"문장 ]\", \"errInfo\": {}}}];\n\tvar other = [1];\n</script></head></html>",
            ERR_LIST
        );
        let result = normalize(&body, ResponseFormat::HtmlEmbedded).unwrap();
        assert_eq!(result, expected());
    }

    #[test]
    fn test_html_embedded_without_var() {
        let body = r#"<script>data=[{"str":"x","errInfo":[{"orgStr":"안되","candWord":"안 돼","help":""}]}];</script>"#;
        let result = normalize(body, ResponseFormat::HtmlEmbedded).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].candidates, vec!["안 돼"]);
    }

    #[test]
    fn test_html_without_assignment_is_empty() {
        let body = "<html><body>점검 중입니다</body></html>";
        assert!(normalize(body, ResponseFormat::HtmlEmbedded).unwrap().is_empty());
    }

    #[test]
    fn test_stream_lines() {
        let body = format!(
            "0:{{\"a\":\"$@1\",\"f\":\"\",\"b\":\"build\"}}\n1:{{\"data\":{{\"str\":\"$2\",\"errInfo\":{}}}}}\n2:T12,나는 밥을먹었다\n",
            ERR_LIST.replace('\n', "")
        );
        let result = normalize(&body, ResponseFormat::StreamLines).unwrap();
        assert_eq!(result, expected());
    }

    #[test]
    fn test_stream_lines_malformed_main_is_empty() {
        let body = "0:{\"a\":\"$@1\"}\n1:{\"data\":{\"errInfo\":[\n";
        assert!(normalize(body, ResponseFormat::StreamLines).unwrap().is_empty());
    }

    #[test]
    fn test_stream_lines_no_errors() {
        let body = "0:{\"a\":\"$@1\"}\n1:{\"data\":{\"str\":\"좋은 문장\",\"errInfo\":[]}}\n";
        assert!(normalize(body, ResponseFormat::StreamLines).unwrap().is_empty());
    }

    #[test]
    fn test_stream_lines_data_null_with_error() {
        let body = "1:{\"data\":null,\"error\":{\"message\":\"too long\"}}\n";
        assert!(normalize(body, ResponseFormat::StreamLines).unwrap().is_empty());
    }

    #[test]
    fn test_digest_is_server_error() {
        let body = "0:{\"a\":\"$@1\"}\n1:{\"digest\":\"2837461\"}\n";
        let err = normalize(body, ResponseFormat::StreamLines).unwrap_err();
        assert!(matches!(err, SpellError::Server { digest } if digest == "2837461"));
    }

    #[test]
    fn test_top_level_digest_in_flat_format() {
        let err = normalize(r#"{"digest": "abc"}"#, ResponseFormat::FlatArray).unwrap_err();
        assert!(matches!(err, SpellError::Server { .. }));
    }

    #[test]
    fn test_unparseable_body_is_empty() {
        assert!(normalize("not json", ResponseFormat::FlatArray).unwrap().is_empty());
        assert!(normalize("", ResponseFormat::StreamLines).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let body = r#"[{"str": "s", "errInfo": [
            {"orgStr": 12, "candWord": "x"},
            "garbage",
            {"orgStr": "", "candWord": "빈"},
            {"candWord": "없음"},
            {"orgStr": "외않되", "candWord": null, "help": null}
        ]}]"#;
        let result = normalize(body, ResponseFormat::FlatArray).unwrap();

        assert_eq!(
            result,
            vec![Correction {
                original: "외않되".to_string(),
                candidates: vec!["외않되".to_string()],
                help: String::new(),
            }]
        );
    }

    #[test]
    fn test_errinfo_not_array_is_skipped() {
        let body = r#"[{"str": "s", "errInfo": "oops"}, {"str": "t", "errInfo": [{"orgStr": "a", "candWord": "b"}]}]"#;
        let result = normalize(body, ResponseFormat::FlatArray).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_blank_candidates_fall_back_to_original() {
        let body = r#"[{"errInfo": [{"orgStr": "그냥", "candWord": " | |"}]}]"#;
        let result = normalize(body, ResponseFormat::FlatArray).unwrap();
        assert_eq!(result[0].candidates, vec!["그냥"]);
    }

    #[test]
    fn test_duplicate_candidates_are_kept() {
        let body = r#"[{"errInfo": [{"orgStr": "a", "candWord": "b|b|c"}]}]"#;
        let result = normalize(body, ResponseFormat::FlatArray).unwrap();
        assert_eq!(result[0].candidates, vec!["b", "b", "c"]);
    }

    #[test]
    fn test_options_degrade_to_original() {
        let correction = Correction {
            original: "그대로".to_string(),
            candidates: vec![],
            help: String::new(),
        };
        assert_eq!(correction.options(), vec!["그대로"]);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(ResponseFormat::sniff(" [1]"), Some(ResponseFormat::FlatArray));
        assert_eq!(
            ResponseFormat::sniff("0:{}\n1:{}"),
            Some(ResponseFormat::StreamLines)
        );
        assert_eq!(
            ResponseFormat::sniff("<html><script>var data = [];</script>"),
            Some(ResponseFormat::HtmlEmbedded)
        );
        assert_eq!(ResponseFormat::sniff("<html></html>"), None);
    }

    #[test]
    fn test_sniff_html_page_with_css_rule() {
        let body = "<html><style>\na:hover{color:red}\n</style><script>var data = [{\"str\":\"s\",\"errInfo\":[{\"orgStr\":\"됬다\",\"candWord\":\"됐다\"}]}];</script></html>";

        assert_eq!(ResponseFormat::sniff(body), Some(ResponseFormat::HtmlEmbedded));
        assert_eq!(normalize_auto(body).unwrap().len(), 1);
    }

    #[test]
    fn test_sniff_ignores_plain_colon_lines() {
        assert_eq!(ResponseFormat::sniff("<html>\na:hover{color:red}\n</html>"), None);
    }

    #[test]
    fn test_scalar_data_does_not_hide_errinfo() {
        let body = r#"[{"str": "s", "data": "x", "errInfo": [{"orgStr": "됬다", "candWord": "됐다"}]}]"#;
        let result = normalize(body, ResponseFormat::FlatArray).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].candidates, vec!["됐다"]);
    }

    #[test]
    fn test_normalize_auto_unknown_is_empty() {
        assert!(normalize_auto("hello").unwrap().is_empty());
    }

    #[test]
    fn test_extract_balanced_ignores_brackets_in_strings() {
        let text = r#"[{"s": "a]b\"]"}, [1]] trailing"#;
        assert_eq!(extract_balanced(text), Some(r#"[{"s": "a]b\"]"}, [1]]"#));
        assert_eq!(extract_balanced("[1, 2"), None);
    }
}
