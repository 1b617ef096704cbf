use std::path::Path;

use crate::error::ConvertError;
use crate::format::{Column, FormattedRow};

/// Render rows as CSV text with the fixed 12-column header.
pub fn to_string(rows: &[FormattedRow]) -> Result<String, ConvertError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(Column::ALL.iter().map(|c| c.header()))?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ConvertError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write rows to a CSV file, re-encoding when the configured output
/// encoding is not UTF-8.
pub fn write_file(
    rows: &[FormattedRow],
    path: &Path,
    encoding_label: &str,
) -> Result<(), ConvertError> {
    let text = to_string(rows)?;
    let encoding = encoding_rs::Encoding::for_label(encoding_label.as_bytes())
        .ok_or_else(|| {
            ConvertError::Mapping(format!("unknown output encoding '{encoding_label}'"))
        })?;
    let (bytes, _, _) = encoding.encode(&text);
    std::fs::write(path, &bytes)?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FormattedRow {
        FormattedRow {
            title: "Hello, \"World\"".into(),
            slug: "hello-world".into(),
            content: "<p>Body</p>".into(),
            excerpt: "Body".into(),
            author: "jane".into(),
            published_date: "2024-01-15".into(),
            featured_image: String::new(),
            categories: "News, Tech".into(),
            tags: String::new(),
            status: "Published".into(),
            seo_title: "Hello".into(),
            seo_description: "Body".into(),
        }
    }

    #[test]
    fn header_matches_fixed_schema() {
        let csv = to_string(&[]).unwrap();
        assert_eq!(
            csv.lines().next().unwrap(),
            "Title,Slug,Content,Excerpt,Author,Published Date,Featured Image,\
             Categories,Tags,Status,SEO Title,SEO Description"
        );
    }

    #[test]
    fn fields_with_commas_and_quotes_are_quoted() {
        let csv = to_string(&[row()]).unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert!(line.starts_with("\"Hello, \"\"World\"\"\",hello-world,"));
        assert!(line.contains("\"News, Tech\""));
    }

    #[test]
    fn unknown_encoding_rejected() {
        let dir = std::env::temp_dir().join("blogcsv-test-unknown-enc.csv");
        let err = write_file(&[row()], &dir, "no-such-encoding").unwrap_err();
        assert!(matches!(err, ConvertError::Mapping(_)));
    }

    #[test]
    fn file_roundtrip_utf8() {
        let path = std::env::temp_dir().join("blogcsv-test-out.csv");
        write_file(&[row()], &path, "utf-8").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        std::fs::remove_file(&path).ok();
    }
}
