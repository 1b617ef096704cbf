pub mod element;
pub mod resolve;

use std::collections::BTreeMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::ConvertError;
use crate::mapping::{CanonicalField, FieldMapping};
use element::RecordElement;
use resolve::{resolve_all, resolve_first, PathExpr};

/// One extracted-but-unnormalized post. Exists for the lifetime of a single
/// record's processing; never mutated after the stream yields it.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: BTreeMap<CanonicalField, String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl RawRecord {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    fn has_text(&self, field: CanonicalField) -> bool {
        self.get(field).is_some_and(|v| !v.is_empty())
    }

    #[cfg(test)]
    pub fn set(&mut self, field: CanonicalField, value: &str) {
        self.fields.insert(field, value.to_string());
    }
}

/// Lazy, single-pass record stream over an XML export document.
///
/// Tag-by-tag traversal: only the subtree of the record currently being
/// extracted is held in memory, so arbitrarily large documents stay bounded.
/// Not restartable — build a new stream from a fresh reader to re-read.
pub struct RecordStream<'m, R: BufRead> {
    reader: NsReader<R>,
    mapping: &'m FieldMapping,
    paths: Vec<(CanonicalField, PathExpr)>,
    category_path: Option<PathExpr>,
    tag_path: Option<PathExpr>,
    buf: Vec<u8>,
    dropped: usize,
    done: bool,
}

impl<'m, R: BufRead> RecordStream<'m, R> {
    pub fn new(reader: R, mapping: &'m FieldMapping) -> Self {
        let paths = mapping
            .field_paths
            .iter()
            .map(|(field, expr)| (*field, PathExpr::parse(expr)))
            .collect();
        Self {
            reader: NsReader::from_reader(reader),
            mapping,
            paths,
            category_path: mapping.category_path.as_deref().map(PathExpr::parse),
            tag_path: mapping.tag_path.as_deref().map(PathExpr::parse),
            buf: Vec::new(),
            dropped: 0,
            done: false,
        }
    }

    /// Records excluded because they carried neither title nor content,
    /// e.g. WordPress nav-menu items and attachments.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Consume events until the current record element closes, building its
    /// subtree snapshot. `root` is the already-consumed start element.
    fn read_record(&mut self, root: RecordElement) -> Result<RecordElement, ConvertError> {
        let record_tag = root.local.clone();
        let mut stack = vec![root];
        loop {
            self.buf.clear();
            let (ns, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
            match event {
                Event::Start(e) => {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    stack.push(RecordElement::new(ns_uri(ns), local));
                }
                Event::Empty(e) => {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    let node = RecordElement::new(ns_uri(ns), local);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(quick_xml::Error::from)?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&raw));
                    }
                }
                Event::End(_) => {
                    // Stack is non-empty until the record's own end tag pops it.
                    if let Some(node) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(node),
                            None => return Ok(node),
                        }
                    }
                }
                Event::Eof => return Err(ConvertError::Truncated(record_tag)),
                _ => {}
            }
        }
    }

    fn build_record(&self, elem: &RecordElement) -> RawRecord {
        let mut record = RawRecord::default();
        for (field, path) in &self.paths {
            // Unresolvable path: the field is simply absent for this record.
            if let Some(value) = resolve_first(elem, path) {
                record.fields.insert(*field, value);
            }
        }
        if let Some(path) = &self.category_path {
            record.categories = resolve_all(elem, path);
        }
        if let Some(path) = &self.tag_path {
            record.tags = resolve_all(elem, path);
        }
        record
    }
}

impl<R: BufRead> Iterator for RecordStream<'_, R> {
    type Item = Result<RawRecord, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            let root = match self.reader.read_resolved_event_into(&mut self.buf) {
                Ok((ns, Event::Start(e))) => {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if local == self.mapping.record_tag {
                        Some(RecordElement::new(ns_uri(ns), local))
                    } else {
                        None
                    }
                }
                Ok((_, Event::Eof)) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => None,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };

            let Some(root) = root else { continue };
            let elem = match self.read_record(root) {
                Ok(elem) => elem,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let record = self.build_record(&elem);
            // elem dropped here; memory stays proportional to one record.
            if !record.has_text(CanonicalField::Title) && !record.has_text(CanonicalField::Content)
            {
                self.dropped += 1;
                continue;
            }
            return Some(Ok(record));
        }
    }
}

fn ns_uri(result: ResolveResult<'_>) -> Option<String> {
    match result {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.0).into_owned()),
        _ => None,
    }
}

/// Best-effort platform auto-detection: root element name first, then a
/// substring sniff of the leading bytes. Ambiguity resolves to `None`,
/// never an error — the caller can then require an explicit selection.
pub fn detect_platform(head: &[u8]) -> Option<&'static str> {
    let mut reader = quick_xml::Reader::from_reader(head);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                return match e.local_name().as_ref() {
                    b"rss" => Some("wordpress"),
                    b"ghost" => Some("ghost"),
                    b"jekyll" => Some("jekyll"),
                    _ => sniff(head),
                };
            }
            Ok(Event::Eof) | Err(_) => return sniff(head),
            Ok(_) => {}
        }
        buf.clear();
    }
}

fn sniff(head: &[u8]) -> Option<&'static str> {
    let text = String::from_utf8_lossy(&head[..head.len().min(1000)]).to_lowercase();
    if text.contains("wp:post_type") || text.contains("wordpress.org/export") {
        Some("wordpress")
    } else if text.contains("ghost") {
        Some("ghost")
    } else if text.contains("jekyll") {
        Some("jekyll")
    } else {
        None
    }
}

/// Count record elements without extracting them (for `stats`).
pub fn count_records(reader: impl BufRead, mapping: &FieldMapping) -> Result<usize, ConvertError> {
    let mut reader = NsReader::from_reader(reader);
    let mut buf = Vec::new();
    let tag = mapping.record_tag.as_bytes();
    let mut count = 0;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == tag => count += 1,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(count)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingRegistry;

    fn wordpress_fixture() -> String {
        std::fs::read_to_string("tests/fixtures/wordpress.xml").unwrap()
    }

    fn extract_wp(xml: &str) -> (Vec<RawRecord>, usize) {
        let reg = MappingRegistry::builtin();
        let mapping = reg.get("wordpress").unwrap();
        let mut stream = RecordStream::new(xml.as_bytes(), mapping);
        let records: Vec<RawRecord> = stream.by_ref().map(|r| r.unwrap()).collect();
        let dropped = stream.dropped();
        (records, dropped)
    }

    #[test]
    fn streams_records_from_fixture() {
        let xml = wordpress_fixture();
        let (records, dropped) = extract_wp(&xml);
        assert_eq!(records.len(), 2);
        // The nav-menu item without title/content is dropped silently.
        assert_eq!(dropped, 1);

        let first = &records[0];
        assert_eq!(
            first.get(CanonicalField::Title),
            Some("Test Blog Post Title!")
        );
        assert_eq!(first.get(CanonicalField::Status), Some("publish"));
        assert!(first
            .get(CanonicalField::Content)
            .unwrap()
            .contains("<p>First post body."));
        assert_eq!(first.get(CanonicalField::Author), Some("jane"));
        assert_eq!(first.categories, ["News"]);
    }

    #[test]
    fn cdata_content_is_captured_verbatim() {
        let xml = wordpress_fixture();
        let (records, _) = extract_wp(&xml);
        let content = records[0].get(CanonicalField::Content).unwrap();
        assert!(content.contains("<strong>bold</strong>"));
    }

    #[test]
    fn namespaced_fields_resolved() {
        let xml = wordpress_fixture();
        let (records, _) = extract_wp(&xml);
        assert_eq!(records[0].get(CanonicalField::Slug), Some("first-post"));
        assert_eq!(records[1].get(CanonicalField::Status), Some("draft"));
    }

    #[test]
    fn truncated_document_is_a_parse_error() {
        let reg = MappingRegistry::builtin();
        let mapping = reg.get("wordpress").unwrap();
        let xml = "<rss><channel><item><title>Cut off";
        let mut stream = RecordStream::new(xml.as_bytes(), mapping);
        let result = stream.next().unwrap();
        assert!(matches!(
            result,
            Err(ConvertError::Truncated(_) | ConvertError::Parse(_))
        ));
        // The stream is exhausted after a fatal error.
        assert!(stream.next().is_none());
    }

    #[test]
    fn detect_by_root_element() {
        assert_eq!(
            detect_platform(b"<?xml version=\"1.0\"?><rss version=\"2.0\"><channel/></rss>"),
            Some("wordpress")
        );
        assert_eq!(detect_platform(b"<ghost><post/></ghost>"), Some("ghost"));
    }

    #[test]
    fn detect_by_content_sniff() {
        let head = b"<export><entry><wp:post_type>post</wp:post_type></entry></export>";
        assert_eq!(detect_platform(head), Some("wordpress"));
    }

    #[test]
    fn ambiguous_input_detects_as_unknown() {
        assert_eq!(detect_platform(b"<data><row/></data>"), None);
        assert_eq!(detect_platform(b"not xml at all"), None);
    }

    #[test]
    fn count_without_extraction() {
        let xml = wordpress_fixture();
        let reg = MappingRegistry::builtin();
        let mapping = reg.get("wordpress").unwrap();
        // Counts every <item>, including the one extraction would drop.
        assert_eq!(count_records(xml.as_bytes(), mapping).unwrap(), 3);
    }

    #[test]
    fn large_document_streams_without_buffering() {
        let mut xml = String::from("<rss><channel>");
        for i in 0..50_000 {
            xml.push_str(&format!("<item><title>Post {i}</title></item>"));
        }
        xml.push_str("</channel></rss>");

        let reg = MappingRegistry::builtin();
        let mapping = reg.get("wordpress").unwrap();
        let stream = RecordStream::new(xml.as_bytes(), mapping);
        // One record alive at a time; consuming the stream must not grow
        // with document size.
        assert_eq!(stream.map(|r| r.unwrap()).count(), 50_000);
    }
}
