pub mod sanitize;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use scraper::Html;
use tracing::warn;

use crate::config::ConverterConfig;

static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
static TITLE_UNSAFE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-_.,!?()]").unwrap());
static AUTHOR_UNSAFE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s\-_.]").unwrap());
static SLUG_UNSAFE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SLUG_DASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

pub const UNTITLED: &str = "Untitled Post";
const EXCERPT_MAX: usize = 300;

/// Unwrap `<![CDATA[..]]>` to its inner text. No-op without a wrapper.
pub fn unwrap_cdata(raw: &str) -> String {
    match CDATA_RE.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.to_string(),
    }
}

/// Strip all markup, decode entities, collapse whitespace runs.
pub fn strip_html(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.concat())
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title role: markup stripped, whitespace collapsed, characters outside the
/// safe punctuation set dropped. Empty result falls back to a placeholder.
pub fn title(raw: &str) -> String {
    let stripped = strip_html(raw);
    let cleaned = TITLE_UNSAFE_RE.replace_all(&stripped, "");
    let cleaned = collapse_whitespace(&cleaned);
    if cleaned.is_empty() {
        UNTITLED.to_string()
    } else {
        cleaned
    }
}

/// Excerpt role: markup stripped, hard-capped at 300 characters including
/// the ellipsis marker.
pub fn excerpt(raw: &str) -> String {
    let stripped = strip_html(raw);
    if stripped.chars().count() > EXCERPT_MAX {
        let mut cut: String = stripped.chars().take(EXCERPT_MAX - 3).collect();
        cut.push_str("...");
        cut
    } else {
        stripped
    }
}

/// Body role: sanitized HTML when preservation is on, plain text otherwise.
/// Over-length content is a logged warning, never an error.
pub fn content(raw: &str, config: &ConverterConfig) -> String {
    let processed = if config.preserve_html {
        sanitize::sanitize_fragment(raw)
    } else {
        strip_html(raw)
    };
    if let Some(max) = config.max_content_length {
        if processed.chars().count() > max {
            warn!("content exceeds maximum length ({max} chars)");
        }
    }
    processed
}

/// Author role: markup stripped, restricted to word characters, whitespace
/// and `-_.`.
pub fn author(raw: &str) -> String {
    let stripped = strip_html(raw);
    let cleaned = AUTHOR_UNSAFE_RE.replace_all(&stripped, "");
    cleaned.trim().to_string()
}

/// Categories: Title Case, first-seen dedupe, comma-joined.
pub fn categories(values: &[String]) -> String {
    join_unique(values.iter().map(|v| title_case(&strip_html(v))))
}

/// Tags: lowercase, first-seen dedupe, comma-joined.
pub fn tags(values: &[String]) -> String {
    join_unique(values.iter().map(|v| strip_html(v).to_lowercase()))
}

fn join_unique(values: impl Iterator<Item = String>) -> String {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen.join(", ")
}

fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Status role: platform vocabulary lookup on the lowercased value. Unknown
/// publication state must never silently appear as published, so unmapped
/// and empty statuses both resolve to Draft.
pub fn status(raw: &str, vocabulary: &BTreeMap<String, String>) -> String {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return "Draft".to_string();
    }
    vocabulary
        .get(&key)
        .cloned()
        .unwrap_or_else(|| "Draft".to_string())
}

/// Date role: flexible parse, then the platform's declared formats in order,
/// then the current date with a warning. Output is always `YYYY-MM-DD`.
pub fn date(raw: &str, formats: &[String]) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return today();
    }
    if let Some(parsed) = parse_flexible(trimmed) {
        return parsed.format("%Y-%m-%d").to_string();
    }
    for fmt in formats {
        if let Some(parsed) = parse_with_format(trimmed, fmt) {
            return parsed.format("%Y-%m-%d").to_string();
        }
    }
    warn!("could not parse date '{trimmed}', using current date");
    today()
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn parse_flexible(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn parse_with_format(raw: &str, fmt: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, fmt).ok()
}

/// URL/image role: trim and upgrade protocol-relative URLs. Relative-URL
/// resolution against a base is a documented future extension.
pub fn url(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        trimmed.to_string()
    }
}

/// Slug role: lowercase, markup-stripped, non-word characters removed,
/// whitespace/hyphen runs collapsed to single hyphens, truncated to
/// `max_length`. Idempotent on its own output.
pub fn slugify(raw: &str, max_length: usize) -> String {
    let lowered = strip_html(&raw.to_lowercase());
    let cleaned = SLUG_UNSAFE_RE.replace_all(&lowered, "");
    let dashed = SLUG_DASH_RE.replace_all(&cleaned, "-");
    let slug = dashed.trim_matches('-');
    if slug.chars().count() > max_length {
        let cut: String = slug.chars().take(max_length).collect();
        cut.trim_end_matches('-').to_string()
    } else {
        slug.to_string()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn cdata_unwrapped() {
        assert_eq!(unwrap_cdata("<![CDATA[<p>Hi</p>]]>"), "<p>Hi</p>");
        assert_eq!(unwrap_cdata("plain"), "plain");
    }

    #[test]
    fn strip_html_decodes_entities() {
        assert_eq!(strip_html("<p>Fish &amp; Chips</p>"), "Fish & Chips");
        assert_eq!(strip_html("a\n\n  b\tc"), "a b c");
    }

    #[test]
    fn title_drops_unsafe_characters() {
        assert_eq!(title(" <b>Hello</b>   World!* "), "Hello World!");
    }

    #[test]
    fn empty_title_falls_back_to_placeholder() {
        assert_eq!(title("   "), UNTITLED);
        assert_eq!(title("<br>"), UNTITLED);
    }

    #[test]
    fn excerpt_boundary_is_exactly_300_with_marker() {
        let long = "a".repeat(301);
        let out = excerpt(&long);
        assert_eq!(out.chars().count(), 300);
        assert!(out.ends_with("..."));
        // At or under the limit, nothing is cut.
        assert_eq!(excerpt(&"b".repeat(300)).chars().count(), 300);
        assert!(!excerpt(&"b".repeat(300)).ends_with("..."));
    }

    #[test]
    fn author_restricted_charset() {
        assert_eq!(author("<i>Jane   O'Doe</i>!"), "Jane ODoe");
    }

    #[test]
    fn categories_title_cased_and_deduped() {
        let raw = vec![
            "news".to_string(),
            "NEWS".to_string(),
            "machine learning".to_string(),
        ];
        assert_eq!(categories(&raw), "News, Machine Learning");
    }

    #[test]
    fn tags_lowercased_preserving_order() {
        let raw = vec!["Rust".to_string(), "XML".to_string(), "rust".to_string()];
        assert_eq!(tags(&raw), "rust, xml");
    }

    #[test]
    fn status_mapped_through_vocabulary() {
        let v = vocab(&[("publish", "Published"), ("draft", "Draft")]);
        assert_eq!(status("publish", &v), "Published");
        assert_eq!(status(" PUBLISH ", &v), "Published");
    }

    #[test]
    fn unknown_status_defaults_to_draft() {
        let v = vocab(&[("publish", "Published")]);
        assert_eq!(status("pending-review", &v), "Draft");
        assert_eq!(status("", &v), "Draft");
    }

    #[test]
    fn date_rfc2822() {
        assert_eq!(
            date("Mon, 15 Jan 2024 10:30:00 +0000", &[]),
            "2024-01-15"
        );
    }

    #[test]
    fn date_platform_format_fallback() {
        let formats = vec!["%d.%m.%Y".to_string()];
        assert_eq!(date("31.12.2023", &formats), "2023-12-31");
    }

    #[test]
    fn unparseable_date_uses_today() {
        assert_eq!(date("next thursday-ish", &[]), today());
        assert_eq!(date("", &[]), today());
    }

    #[test]
    fn protocol_relative_url_upgraded() {
        assert_eq!(url("//cdn.example.com/a.png"), "https://cdn.example.com/a.png");
        assert_eq!(url(" https://x.org/p "), "https://x.org/p");
    }

    #[test]
    fn slug_from_title() {
        assert_eq!(slugify("Test Blog Post Title!", 60), "test-blog-post-title");
    }

    #[test]
    fn slug_is_idempotent() {
        let once = slugify("Some -- Odd   Title?!", 60);
        assert_eq!(slugify(&once, 60), once);
    }

    #[test]
    fn slug_truncated_at_hyphen_boundary() {
        let slug = slugify("one two three four five", 8);
        assert_eq!(slug, "one-two");
    }
}
