//! Allow-list HTML sanitizer for post bodies.
//!
//! Works on a parsed fragment snapshot owned by the call: the tree is walked
//! once and serialized back to a string, so nothing leaks between records.

use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{Html, Node};

/// Removed entirely, descendants included.
const UNSAFE_TAGS: &[&str] = &["script", "style", "iframe", "object", "embed", "form", "input"];

/// Kept under their own name; anything else is renamed to `span` so its
/// text content survives.
const PRESERVE_TAGS: &[&str] = &[
    "p", "div", "span", "h1", "h2", "h3", "h4", "h5", "h6", "strong", "b", "em", "i", "u", "a",
    "img", "ul", "ol", "li", "blockquote", "code", "pre", "br", "hr", "table", "tr", "td", "th",
];

/// Attribute allow-list, also the serialization order.
const SAFE_ATTRS: &[&str] = &[
    "href", "src", "alt", "title", "class", "id", "style", "width", "height", "target", "rel",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

static DANGEROUS_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)javascript:|vbscript:|data:|file:|on\w+\s*=|<script|<iframe").unwrap()
});

/// Sanitize an HTML fragment and serialize it back to a string.
pub fn sanitize_fragment(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let mut out = String::new();
    for child in fragment.root_element().children() {
        write_node(child, &mut out);
    }
    out
}

fn write_node(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Element(_) => write_element(node, out),
        _ => {}
    }
}

fn write_element(node: NodeRef<'_, Node>, out: &mut String) {
    let Node::Element(el) = node.value() else {
        return;
    };
    let name = el.name();
    if UNSAFE_TAGS.contains(&name) {
        return;
    }
    if name == "img" {
        write_image(el, out);
        return;
    }

    let is_void = VOID_TAGS.contains(&name);
    if !is_void && node.children().next().is_none() {
        // Empty non-void elements carry nothing worth keeping.
        return;
    }

    let tag = if PRESERVE_TAGS.contains(&name) {
        name
    } else {
        "span"
    };
    let mut attrs = safe_attrs(el);
    if tag == "a" {
        rewrite_anchor(&mut attrs);
    }

    out.push('<');
    out.push_str(tag);
    push_attrs(&attrs, out);
    out.push('>');
    if is_void {
        return;
    }
    for child in node.children() {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_image(el: &scraper::node::Element, out: &mut String) {
    let mut attrs = safe_attrs(el);
    // An image without a usable source (absent, or rejected as dangerous)
    // is dropped entirely.
    if !attrs.iter().any(|(k, _)| *k == "src") {
        return;
    }
    if !attrs.iter().any(|(k, _)| *k == "alt") {
        attrs.push(("alt", "Image".to_string()));
    }
    out.push_str("<img");
    push_attrs(&attrs, out);
    out.push('>');
}

/// Filter to the allow-list, reject dangerous values, upgrade
/// protocol-relative URLs. Serialization order follows the allow-list.
fn safe_attrs(el: &scraper::node::Element) -> Vec<(&'static str, String)> {
    SAFE_ATTRS
        .iter()
        .filter_map(|&attr| {
            let value = el.attr(attr)?;
            if DANGEROUS_VALUE_RE.is_match(value) {
                return None;
            }
            let value = if (attr == "href" || attr == "src") && value.starts_with("//") {
                format!("https:{value}")
            } else {
                value.to_string()
            };
            Some((attr, value))
        })
        .collect()
}

/// External anchors open in a new tab without a window.opener handle.
fn rewrite_anchor(attrs: &mut Vec<(&'static str, String)>) {
    let external = attrs.iter().any(|(k, v)| {
        *k == "href" && v.starts_with("http") && !v.starts_with("http://localhost")
    });
    if external {
        attrs.retain(|(k, _)| *k != "target" && *k != "rel");
        attrs.push(("target", "_blank".to_string()));
        attrs.push(("rel", "noopener".to_string()));
    }
}

fn push_attrs(attrs: &[(&'static str, String)], out: &mut String) {
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
}

fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(raw: &str) -> String {
    escape_text(raw).replace('"', "&quot;")
}

// ── Tests ──
