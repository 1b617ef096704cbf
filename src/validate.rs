use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::format::FormattedRow;

static DATE_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

const CONTENT_WARN_LEN: usize = 100_000;
const TITLE_WARN_LEN: usize = 200;
const EXCERPT_WARN_LEN: usize = 500;

/// Aggregate counts over the finalized row set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowStats {
    pub total_posts: usize,
    pub published_posts: usize,
    pub draft_posts: usize,
    pub posts_with_images: usize,
    pub posts_with_categories: usize,
    pub posts_with_tags: usize,
}

/// Result of checking the row set invariants. Read-only after construction;
/// errors and warnings are ordered, 1-indexed per row for operator review.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: RowStats,
}

/// Single pass over the finalized rows: hard invariants, length warnings,
/// and statistics.
///
/// The 12-column presence invariant is enforced by [`FormattedRow`] itself;
/// the per-row hard check left to runtime is the `Published Date` shape.
pub fn validate(rows: &[FormattedRow]) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut stats = RowStats {
        total_posts: rows.len(),
        ..RowStats::default()
    };

    if rows.is_empty() {
        errors.push("No posts to validate".to_string());
        return ValidationReport {
            valid: false,
            errors,
            warnings,
            stats,
        };
    }

    for (i, row) in rows.iter().enumerate() {
        let post = i + 1;

        if !DATE_SHAPE_RE.is_match(&row.published_date) {
            errors.push(format!(
                "Post {post}: Published Date '{}' is not in YYYY-MM-DD format",
                row.published_date
            ));
        }
        if row.content.chars().count() > CONTENT_WARN_LEN {
            warnings.push(format!(
                "Post {post}: Content is very long ({} characters)",
                row.content.chars().count()
            ));
        }
        if row.title.chars().count() > TITLE_WARN_LEN {
            warnings.push(format!(
                "Post {post}: Title is very long ({} characters)",
                row.title.chars().count()
            ));
        }
        if row.excerpt.chars().count() > EXCERPT_WARN_LEN {
            warnings.push(format!(
                "Post {post}: Excerpt is very long ({} characters)",
                row.excerpt.chars().count()
            ));
        }

        if row.status == "Published" {
            stats.published_posts += 1;
        } else {
            stats.draft_posts += 1;
        }
        if !row.featured_image.is_empty() {
            stats.posts_with_images += 1;
        }
        if !row.categories.is_empty() {
            stats.posts_with_categories += 1;
        }
        if !row.tags.is_empty() {
            stats.posts_with_tags += 1;
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        stats,
    }
}

// ── Tests ──
