//! HTML entity decoding for service help text.
//!
//! Help text arrives as an HTML fragment. Decoding is done with plain string
//! processing so the result is the same whether or not a DOM is around.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").expect("tag regex"));

static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9A-Fa-f]{1,6})|([0-9]{1,7}));").expect("numeric entity regex"));

/// Decode `text` into plain text.
///
/// Line-break tags become `\n`, other tags are dropped, and named or
/// numeric character references are resolved. `&amp;` goes last so that
/// `&amp;lt;` decodes to the literal `&lt;`.
pub fn decode_html_entities(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = BR_RE.replace_all(text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = NUMERIC_RE.replace_all(&text, |caps: &Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        match code.and_then(char::from_u32) {
            // a decoded '&' would be decoded again below
            Some('&') => "&amp;".to_string(),
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    });

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_named_entities() {
        assert_eq!(
            decode_html_entities("&lt;a&gt; &amp; &quot;b&quot; &#39;c&#39;"),
            "<a> & \"b\" 'c'"
        );
    }

    #[test]
    fn test_line_breaks_become_newlines() {
        assert_eq!(decode_html_entities("<br>설명"), "\n설명");
        assert_eq!(decode_html_entities("하나<BR/>둘<br />셋"), "하나\n둘\n셋");
    }

    #[test]
    fn test_tags_are_stripped() {
        assert_eq!(
            decode_html_entities("<b>띄어쓰기</b> 오류입니다.<br><span class=\"x\">예</span>"),
            "띄어쓰기 오류입니다.\n예"
        );
    }

    #[test]
    fn test_lone_angle_bracket_is_kept() {
        assert_eq!(decode_html_entities("1 < 2"), "1 < 2");
    }

    #[test]
    fn test_double_encoded_ampersand_decodes_once() {
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_html_entities("&#38;lt;"), "&lt;");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_html_entities("&#54620;&#xAE00;"), "한글");
    }

    #[test]
    fn test_invalid_numeric_reference_left_alone() {
        assert_eq!(decode_html_entities("&#xD800;"), "&#xD800;");
    }

    #[test]
    fn test_empty() {
        assert_eq!(decode_html_entities(""), "");
    }
}
