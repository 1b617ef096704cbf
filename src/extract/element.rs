/// Owned snapshot of one record element's subtree.
///
/// Built while streaming, resolved against, then dropped — peak memory stays
/// proportional to a single record regardless of document size.
#[derive(Debug, Clone)]
pub struct RecordElement {
    /// Resolved namespace URI, if the element name was bound to one.
    pub ns: Option<String>,
    pub local: String,
    /// Concatenated direct text and CDATA content.
    pub text: String,
    pub children: Vec<RecordElement>,
}

impl RecordElement {
    pub fn new(ns: Option<String>, local: String) -> Self {
        Self {
            ns,
            local,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Depth-first descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a RecordElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a RecordElement;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
