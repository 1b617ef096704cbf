use super::element::RecordElement;

/// A parsed path expression, tried against a record subtree in three forms.
///
/// The prefixed form deliberately ignores the URI the prefix is bound to and
/// matches on local name alone: export documents declare prefixes
/// inconsistently, so suffix matching recovers fields that a strict lookup
/// would miss. Known looseness: two namespaces sharing a local name both
/// match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    /// `{namespaceURI}localName` — exact expanded-name match, anywhere in
    /// the record subtree.
    Qualified { ns: String, local: String },
    /// `prefix:localName` — local-name match, anywhere in the subtree.
    Prefixed { local: String },
    /// Bare tag name — direct child lookup.
    Bare(String),
}

impl PathExpr {
    pub fn parse(expr: &str) -> Self {
        if let Some(rest) = expr.strip_prefix('{') {
            if let Some((ns, local)) = rest.split_once('}') {
                return PathExpr::Qualified {
                    ns: ns.to_string(),
                    local: local.to_string(),
                };
            }
        }
        if let Some((_prefix, local)) = expr.split_once(':') {
            return PathExpr::Prefixed {
                local: local.to_string(),
            };
        }
        PathExpr::Bare(expr.to_string())
    }
}

/// Resolve a path to its first matching text value.
///
/// `None` means no element matched (not-found); `Some("")` means an element
/// matched but carried no text. Values are whitespace-trimmed.
pub fn resolve_first(elem: &RecordElement, path: &PathExpr) -> Option<String> {
    match path {
        PathExpr::Qualified { ns, local } => elem
            .descendants()
            .find(|e| e.local == *local && e.ns.as_deref() == Some(ns))
            .map(|e| e.text.trim().to_string()),
        PathExpr::Prefixed { local } => elem
            .descendants()
            .find(|e| e.local == *local)
            .map(|e| e.text.trim().to_string()),
        PathExpr::Bare(name) => elem
            .children
            .iter()
            .find(|e| e.local == *name)
            .map(|e| e.text.trim().to_string()),
    }
}

/// Resolve every occurrence of a path to its trimmed non-empty text values,
/// in document order, without deduplication.
pub fn resolve_all(elem: &RecordElement, path: &PathExpr) -> Vec<String> {
    let collect = |iter: &mut dyn Iterator<Item = &RecordElement>| {
        iter.map(|e| e.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    };
    match path {
        PathExpr::Qualified { ns, local } => collect(
            &mut elem
                .descendants()
                .filter(|e| e.local == *local && e.ns.as_deref() == Some(ns)),
        ),
        PathExpr::Prefixed { local } => {
            collect(&mut elem.descendants().filter(|e| e.local == *local))
        }
        PathExpr::Bare(name) => collect(&mut elem.children.iter().filter(|e| e.local == *name)),
    }
}

// ── Tests ──
