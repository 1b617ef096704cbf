use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConvertError;

/// The fixed set of single-valued semantic post attributes a platform
/// mapping can resolve. Taxonomies (categories, tags) are multi-valued and
/// declared separately on [`FieldMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Title,
    Content,
    Excerpt,
    Author,
    Date,
    Status,
    Slug,
    FeaturedImage,
    SeoTitle,
    SeoDescription,
}

/// Declarative description of one platform's export document shape.
/// Loaded once per conversion run and immutable thereafter; every
/// extraction and formatting call takes it explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// XML element delimiting exactly one blog post (e.g. `item`, `post`).
    pub record_tag: String,
    /// Canonical field → path expression (see `extract::resolve`).
    pub field_paths: BTreeMap<CanonicalField, String>,
    /// chrono format strings tried in order after the flexible parse.
    #[serde(default)]
    pub date_formats: Vec<String>,
    /// Source status value (lowercased) → canonical output status.
    #[serde(default)]
    pub status_vocabulary: BTreeMap<String, String>,
    /// Path for category-like elements, zero-or-many per record.
    #[serde(default)]
    pub category_path: Option<String>,
    /// Path for tag-like elements, zero-or-many per record.
    #[serde(default)]
    pub tag_path: Option<String>,
}

impl FieldMapping {
    fn validate(&self) -> Result<(), ConvertError> {
        if self.record_tag.trim().is_empty() {
            return Err(ConvertError::Mapping(format!(
                "platform '{}' has an empty record_tag",
                self.name
            )));
        }
        Ok(())
    }
}

/// All loaded platform mappings, keyed by lowercase platform id.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    platforms: BTreeMap<String, FieldMapping>,
}

impl MappingRegistry {
    /// Registry preloaded with the WordPress, Ghost and Jekyll mappings.
    pub fn builtin() -> Self {
        let mut reg = Self::default();
        reg.add("wordpress", wordpress());
        reg.add("ghost", ghost());
        reg.add("jekyll", jekyll());
        reg
    }

    pub fn add(&mut self, id: &str, mapping: FieldMapping) {
        self.platforms.insert(id.to_lowercase(), mapping);
    }

    pub fn get(&self, id: &str) -> Result<&FieldMapping, ConvertError> {
        self.platforms
            .get(&id.to_lowercase())
            .ok_or_else(|| ConvertError::UnknownPlatform(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }

    /// Load custom mapping templates (`*.json`, file stem = platform id)
    /// from a directory. Invalid templates are skipped with a warning so one
    /// bad file cannot block the run.
    pub fn load_templates(&mut self, dir: &Path) -> Result<usize, ConvertError> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match load_template(&path) {
                Ok(mapping) => {
                    self.add(id, mapping);
                    loaded += 1;
                }
                Err(e) => warn!("skipping template {}: {}", path.display(), e),
            }
        }
        Ok(loaded)
    }
}

fn load_template(path: &Path) -> Result<FieldMapping, ConvertError> {
    let raw = std::fs::read_to_string(path)?;
    let mapping: FieldMapping = serde_json::from_str(&raw)
        .map_err(|e| ConvertError::Mapping(format!("{}: {}", path.display(), e)))?;
    mapping.validate()?;
    Ok(mapping)
}

fn paths(entries: &[(CanonicalField, &str)]) -> BTreeMap<CanonicalField, String> {
    entries
        .iter()
        .map(|(f, p)| (*f, p.to_string()))
        .collect()
}

fn vocab(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn wordpress() -> FieldMapping {
    use CanonicalField::*;
    FieldMapping {
        name: "WordPress".to_string(),
        description: "WordPress WXR export".to_string(),
        record_tag: "item".to_string(),
        field_paths: paths(&[
            (Title, "title"),
            (Content, "{http://purl.org/rss/1.0/modules/content/}encoded"),
            (Excerpt, "{http://wordpress.org/export/1.2/excerpt/}encoded"),
            (Author, "{http://purl.org/dc/elements/1.1/}creator"),
            (Date, "pubDate"),
            (Status, "{http://wordpress.org/export/1.2/}status"),
            (Slug, "{http://wordpress.org/export/1.2/}post_name"),
            (FeaturedImage, "{http://wordpress.org/export/1.2/}attachment_url"),
            (SeoTitle, "yoast_wpseo_title"),
            (SeoDescription, "yoast_wpseo_metadesc"),
        ]),
        date_formats: vec![
            "%a, %d %b %Y %H:%M:%S %z".to_string(),
            "%Y-%m-%d %H:%M:%S".to_string(),
        ],
        status_vocabulary: vocab(&[
            ("publish", "Published"),
            ("draft", "Draft"),
            ("private", "Draft"),
            ("pending", "Draft"),
        ]),
        category_path: Some("category".to_string()),
        tag_path: Some("post_tag".to_string()),
    }
}

fn ghost() -> FieldMapping {
    use CanonicalField::*;
    FieldMapping {
        name: "Ghost".to_string(),
        description: "Ghost export (XML rendering of the JSON format)".to_string(),
        record_tag: "post".to_string(),
        field_paths: paths(&[
            (Title, "title"),
            (Content, "html"),
            (Excerpt, "excerpt"),
            (Author, "author"),
            (Date, "published_at"),
            (Status, "status"),
            (Slug, "slug"),
            (FeaturedImage, "feature_image"),
        ]),
        date_formats: vec![
            "%Y-%m-%dT%H:%M:%S%.fZ".to_string(),
            "%Y-%m-%d %H:%M:%S".to_string(),
        ],
        status_vocabulary: vocab(&[("published", "Published"), ("draft", "Draft")]),
        category_path: None,
        tag_path: Some("tags".to_string()),
    }
}

fn jekyll() -> FieldMapping {
    use CanonicalField::*;
    FieldMapping {
        name: "Jekyll".to_string(),
        description: "Jekyll front matter export".to_string(),
        record_tag: "post".to_string(),
        field_paths: paths(&[
            (Title, "title"),
            (Content, "content"),
            (Excerpt, "excerpt"),
            (Author, "author"),
            (Date, "date"),
            (Slug, "slug"),
            (FeaturedImage, "image"),
        ]),
        date_formats: vec!["%Y-%m-%d".to_string(), "%Y-%m-%d %H:%M:%S".to_string()],
        status_vocabulary: vocab(&[("published", "Published"), ("draft", "Draft")]),
        category_path: Some("categories".to_string()),
        tag_path: Some("tags".to_string()),
    }
}

// ── Tests ──
