use serde::Serialize;

use crate::config::ConverterConfig;
use crate::extract::RawRecord;
use crate::mapping::{CanonicalField, FieldMapping};
use crate::normalize;

/// The fixed output columns, in header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Title,
    Slug,
    Content,
    Excerpt,
    Author,
    PublishedDate,
    FeaturedImage,
    Categories,
    Tags,
    Status,
    SeoTitle,
    SeoDescription,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::Title,
        Column::Slug,
        Column::Content,
        Column::Excerpt,
        Column::Author,
        Column::PublishedDate,
        Column::FeaturedImage,
        Column::Categories,
        Column::Tags,
        Column::Status,
        Column::SeoTitle,
        Column::SeoDescription,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Title => "Title",
            Column::Slug => "Slug",
            Column::Content => "Content",
            Column::Excerpt => "Excerpt",
            Column::Author => "Author",
            Column::PublishedDate => "Published Date",
            Column::FeaturedImage => "Featured Image",
            Column::Categories => "Categories",
            Column::Tags => "Tags",
            Column::Status => "Status",
            Column::SeoTitle => "SEO Title",
            Column::SeoDescription => "SEO Description",
        }
    }
}

/// One finalized output row. Every column is always populated (possibly with
/// an empty string), so the 12-column invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedRow {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub published_date: String,
    pub featured_image: String,
    pub categories: String,
    pub tags: String,
    pub status: String,
    pub seo_title: String,
    pub seo_description: String,
}

impl FormattedRow {
    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::Title => &self.title,
            Column::Slug => &self.slug,
            Column::Content => &self.content,
            Column::Excerpt => &self.excerpt,
            Column::Author => &self.author,
            Column::PublishedDate => &self.published_date,
            Column::FeaturedImage => &self.featured_image,
            Column::Categories => &self.categories,
            Column::Tags => &self.tags,
            Column::Status => &self.status,
            Column::SeoTitle => &self.seo_title,
            Column::SeoDescription => &self.seo_description,
        }
    }

    /// Cells in header order, for the CSV sink.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        Column::ALL.into_iter().map(|c| self.get(c))
    }
}

/// Turn one raw record into a finalized row. Pure function of its inputs
/// aside from the current-date fallback inside date normalization.
pub fn format_record(
    raw: &RawRecord,
    mapping: &FieldMapping,
    config: &ConverterConfig,
) -> FormattedRow {
    let field = |f: CanonicalField| -> String {
        let value = raw.get(f).unwrap_or_default();
        if config.handle_cdata {
            normalize::unwrap_cdata(value)
        } else {
            value.to_string()
        }
    };

    let title = normalize::title(&field(CanonicalField::Title));

    let explicit_slug = field(CanonicalField::Slug);
    let slug = if !explicit_slug.is_empty() {
        normalize::slugify(&explicit_slug, config.slug_max_length)
    } else if config.generate_slugs {
        normalize::slugify(&title, config.slug_max_length)
    } else {
        String::new()
    };

    let content = normalize::content(&field(CanonicalField::Content), config);

    let explicit_excerpt = field(CanonicalField::Excerpt);
    let excerpt = if !explicit_excerpt.is_empty() {
        normalize::excerpt(&explicit_excerpt)
    } else if !content.is_empty() {
        normalize::excerpt(&leading_sentences(&content, 300))
    } else {
        String::new()
    };

    let seo_title = match field(CanonicalField::SeoTitle) {
        ref explicit if !explicit.is_empty() => normalize::title(explicit),
        _ => title.clone(),
    };
    let seo_description = match field(CanonicalField::SeoDescription) {
        ref explicit if !explicit.is_empty() => normalize::excerpt(explicit),
        _ => excerpt.clone(),
    };

    FormattedRow {
        slug,
        content,
        excerpt,
        author: normalize::author(&field(CanonicalField::Author)),
        published_date: normalize::date(&field(CanonicalField::Date), &mapping.date_formats),
        featured_image: normalize::url(&field(CanonicalField::FeaturedImage)),
        categories: normalize::categories(&raw.categories),
        tags: normalize::tags(&raw.tags),
        status: normalize::status(&field(CanonicalField::Status), &mapping.status_vocabulary),
        seo_title,
        seo_description,
        title,
    }
}

/// Excerpt generation from content: leading `.`-split sentences while they
/// fit under `max_length`, else a hard character truncation with the marker.
fn leading_sentences(content: &str, max_length: usize) -> String {
    let plain = normalize::strip_html(content);
    let mut excerpt = String::new();
    for sentence in plain.split('.') {
        if sentence.is_empty() {
            continue;
        }
        if excerpt.chars().count() + sentence.chars().count() + 1 > max_length {
            break;
        }
        excerpt.push_str(sentence);
        excerpt.push('.');
    }
    if excerpt.is_empty() {
        let mut cut: String = plain.chars().take(max_length.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    } else {
        excerpt.trim().to_string()
    }
}

// ── Tests ──
