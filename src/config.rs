use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Recognized conversion options. Loaded once per run, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Keep sanitized HTML in the Content column; when false, content is
    /// stripped to plain text with entities decoded.
    pub preserve_html: bool,
    /// Length beyond which a content-size warning is logged (never an error).
    pub max_content_length: Option<usize>,
    /// Generate a slug from the title when the source has none.
    pub generate_slugs: bool,
    pub slug_max_length: usize,
    /// Unwrap `<![CDATA[..]]>` wrappers before normalization.
    pub handle_cdata: bool,
    /// Output encoding label for the CSV sink (e.g. "utf-8", "windows-1252").
    pub output_encoding: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            preserve_html: true,
            max_content_length: None,
            generate_slugs: true,
            slug_max_length: 60,
            handle_cdata: true,
            output_encoding: "utf-8".to_string(),
        }
    }
}

impl ConverterConfig {
    /// Load options from a JSON file; unknown keys are ignored, missing keys
    /// keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConvertError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| ConvertError::Mapping(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConverterConfig::default();
        assert!(c.preserve_html);
        assert!(c.generate_slugs);
        assert!(c.handle_cdata);
        assert_eq!(c.slug_max_length, 60);
        assert_eq!(c.output_encoding, "utf-8");
        assert!(c.max_content_length.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: ConverterConfig =
            serde_json::from_str(r#"{"preserve_html": false, "slug_max_length": 40}"#).unwrap();
        assert!(!c.preserve_html);
        assert_eq!(c.slug_max_length, 40);
        assert!(c.generate_slugs);
    }
}
