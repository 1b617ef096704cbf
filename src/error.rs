use thiserror::Error;

/// Structured failure kinds for the conversion pipeline.
///
/// Per-record problems (unresolvable field, dropped record) are not errors:
/// they degrade gracefully inside the stream. These variants cover the
/// document-level and configuration-level failures that abort a run.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Source document is not well-formed XML. Fatal, no partial output.
    #[error("XML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    /// Document ended inside an open record element.
    #[error("unexpected end of document inside <{0}> element")]
    Truncated(String),

    /// Selected platform identifier has no loaded mapping.
    #[error("unknown platform '{0}' (run `platforms` to list available mappings)")]
    UnknownPlatform(String),

    /// A mapping or config definition failed to load or violates an invariant.
    #[error("invalid mapping definition: {0}")]
    Mapping(String),

    /// The formatted row set failed a hard validation invariant.
    #[error("validation failed with {0} error(s)")]
    Validation(usize),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
