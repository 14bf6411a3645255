//! Field normalization for Bubble export values.
//!
//! Every helper here is total: malformed or empty input degrades to `None`, an
//! empty list, `false` or a default, never to an error. Transformers call these
//! once per field when turning a raw row into a normalized record.
//!
//! # Formats
//!
//! - **Dates**: `"Jul 19, 2023 3:11 am"` (`%b %d, %Y %I:%M %p`), no timezone
//! - **Lists**: comma-separated, whitespace around items ignored, empty items dropped
//! - **Flags**: `"yes"` in any case is `true`, anything else is `false`
//! - **Video URLs**: YouTube embed links and iframe snippets become watch URLs

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// Timestamp format used by every date column in the exports.
pub const EXPORT_DATE_FORMAT: &str = "%b %d, %Y %I:%M %p";

/// Display order assigned to projects without a usable `Order` value.
pub const DEFAULT_DISPLAY_ORDER: i32 = 1;

static YOUTUBE_EMBED_REGEX: OnceLock<Regex> = OnceLock::new();

fn youtube_embed_regex() -> &'static Regex {
    YOUTUBE_EMBED_REGEX.get_or_init(|| {
        Regex::new(r#"youtube\.com/embed/([^"?\s]+)"#).expect("Invalid YouTube embed regex")
    })
}

/// Parse an export timestamp such as `"Jul 19, 2023 3:11 am"`.
///
/// Returns `None` for empty or unparseable input.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    NaiveDateTime::parse_from_str(value, EXPORT_DATE_FORMAT).ok()
}

/// Split a comma-separated value into trimmed, non-empty items, keeping order.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"yes"` (any case) is `true`; everything else, including empty, is `false`.
pub fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

fn parse_digits(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<i32>().ok()
}

/// Age is only accepted when the trimmed value is made of ASCII digits.
pub fn parse_age(value: &str) -> Option<i32> {
    parse_digits(value)
}

/// Project display order, falling back to [`DEFAULT_DISPLAY_ORDER`].
pub fn parse_display_order(value: &str) -> i32 {
    parse_digits(value).unwrap_or(DEFAULT_DISPLAY_ORDER)
}

/// Trimmed text, or `None` when nothing is left.
pub fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Rewrite a YouTube embed reference to its canonical watch URL.
///
/// The export stores some videos as `https://www.youtube.com/embed/<id>` or as a
/// whole `<iframe>` snippet. Anything that is not an embed reference is returned
/// trimmed but otherwise unchanged, so callers can detect an empty URL.
pub fn normalize_video_url(value: &str) -> String {
    let value = value.trim();
    if !value.contains("youtube.com/embed/") {
        return value.to_string();
    }

    match youtube_embed_regex().captures(value) {
        Some(caps) => format!("https://www.youtube.com/watch?v={}", &caps[1]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date_morning() {
        let parsed = parse_date("Jul 19, 2023 3:11 am").expect("date parses");
        assert_eq!(parsed.year(), 2023);
        assert_eq!(parsed.month(), 7);
        assert_eq!(parsed.day(), 19);
        assert_eq!(parsed.hour(), 3);
        assert_eq!(parsed.minute(), 11);
    }

    #[test]
    fn test_parse_date_afternoon_and_uppercase() {
        let parsed = parse_date("Dec 1, 2022 11:45 PM").expect("date parses");
        assert_eq!(parsed.day(), 1);
        assert_eq!(parsed.hour(), 23);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("2023-07-19"), None);
        assert_eq!(parse_date("Jul 19 2023"), None);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("a, b ,, c"), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
        assert!(parse_list(" , ,").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("yes"));
        assert!(parse_bool("YES"));
        assert!(parse_bool(" Yes "));
        assert!(!parse_bool("no"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("true"));
    }

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age("27"), Some(27));
        assert_eq!(parse_age(" 31 "), Some(31));
        assert_eq!(parse_age("27.5"), None);
        assert_eq!(parse_age("-3"), None);
        assert_eq!(parse_age("thirty"), None);
        assert_eq!(parse_age("99999999999"), None);
    }

    #[test]
    fn test_parse_display_order() {
        assert_eq!(parse_display_order("4"), 4);
        assert_eq!(parse_display_order(""), DEFAULT_DISPLAY_ORDER);
        assert_eq!(parse_display_order("first"), DEFAULT_DISPLAY_ORDER);
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("  hi "), Some("hi".to_string()));
        assert_eq!(optional_text("   "), None);
    }

    #[test]
    fn test_normalize_embed_url() {
        assert_eq!(
            normalize_video_url("https://www.youtube.com/embed/xyz123"),
            "https://www.youtube.com/watch?v=xyz123"
        );
        assert_eq!(
            normalize_video_url("https://www.youtube.com/embed/xyz123?autoplay=1"),
            "https://www.youtube.com/watch?v=xyz123"
        );
    }

    #[test]
    fn test_normalize_iframe_snippet() {
        let iframe = r#"<iframe width="560" src="https://www.youtube.com/embed/xyz123" frameborder="0"></iframe>"#;
        assert_eq!(
            normalize_video_url(iframe),
            "https://www.youtube.com/watch?v=xyz123"
        );
    }

    #[test]
    fn test_normalize_passthrough() {
        assert_eq!(
            normalize_video_url("https://vimeo.com/12345"),
            "https://vimeo.com/12345"
        );
        assert_eq!(normalize_video_url("  "), "");
    }
}
