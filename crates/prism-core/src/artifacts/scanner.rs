//! Discovery of `ui://` resource references in tool results.
//!
//! Tool results are loosely shaped JSON: resource descriptors can appear as the
//! payload itself, inside a `content` array, or serialized into a string field
//! (sometimes more than once). The walk is depth-first and follows key and
//! array order; each node is matched against the [`Encoding`] shapes when the
//! walk reaches it. Anything that does not match is ordinary tool output and is
//! skipped.

use serde_json::{Map, Value};
use std::collections::HashSet;

use super::reference::{Encoding, ResourceReference, is_ui_uri};
use crate::mcp::ResourceContent;

/// Nesting limit, counting both structural levels and string re-parses.
const MAX_DEPTH: usize = 32;

/// Scans a tool result for resource references.
///
/// References are unique by URI and ordered by first sighting in a depth-first,
/// left-to-right walk. The payload is never modified.
pub fn scan(payload: &Value) -> Vec<ResourceReference> {
    let mut scanner = Scanner::default();
    scanner.visit(payload, Context::root());
    scanner.references
}

/// Scans several tool results as one message, deduplicating across them.
pub fn scan_all<'a>(payloads: impl IntoIterator<Item = &'a Value>) -> Vec<ResourceReference> {
    let mut scanner = Scanner::default();
    for payload in payloads {
        scanner.visit(payload, Context::root());
    }
    scanner.references
}

#[derive(Debug, Clone, Copy)]
struct Context {
    depth: usize,
    stringified: bool,
}

impl Context {
    fn root() -> Self {
        Self {
            depth: 0,
            stringified: false,
        }
    }

    fn deeper(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    fn parsed(self) -> Self {
        Self {
            depth: self.depth + 1,
            stringified: true,
        }
    }

    /// Anything found below a parsed string is reported as stringified.
    fn tag(self, encoding: Encoding) -> Encoding {
        if self.stringified {
            Encoding::StringifiedJson
        } else {
            encoding
        }
    }
}

#[derive(Default)]
struct Scanner {
    seen: HashSet<String>,
    references: Vec<ResourceReference>,
}

impl Scanner {
    fn visit(&mut self, node: &Value, ctx: Context) {
        if ctx.depth > MAX_DEPTH {
            return;
        }

        match node {
            Value::String(text) => {
                if let Some(parsed) = parse_embedded_json(text) {
                    self.visit(&parsed, ctx.parsed());
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item, ctx.deeper());
                }
            }
            Value::Object(map) => {
                if let Some(found) = resource_descriptor(map) {
                    self.emit(found, ctx.tag(Encoding::DirectResourceObject));
                }
                for (key, value) in map {
                    match value {
                        Value::Array(items) if key == "content" => {
                            for item in items {
                                self.visit_content_item(item, ctx.deeper());
                            }
                        }
                        _ => self.visit(value, ctx.deeper()),
                    }
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    /// Item of a `content` array: item-level shapes first, then its children.
    fn visit_content_item(&mut self, item: &Value, ctx: Context) {
        if ctx.depth > MAX_DEPTH {
            return;
        }

        if let Some(found) = item.as_object().and_then(resource_descriptor) {
            self.emit(found, ctx.tag(Encoding::ContentArrayItem));
        } else if let Some(found) = text_item(item)
            .and_then(parse_embedded_json)
            .as_ref()
            .and_then(Value::as_object)
            .and_then(resource_descriptor)
        {
            self.emit(found, Encoding::StringifiedJson);
        }

        self.visit(item, ctx);
    }

    fn emit(&mut self, found: Descriptor, encoding: Encoding) {
        if !self.seen.insert(found.uri.clone()) {
            return;
        }

        let mut reference = ResourceReference::new(found.uri, encoding);
        reference.embedded = found.embedded;
        self.references.push(reference);
    }
}

struct Descriptor {
    uri: String,
    embedded: Option<ResourceContent>,
}

/// Matches `{type: "resource", uri}` and `{type: "resource", resource: {uri}}`.
fn resource_descriptor(node: &Map<String, Value>) -> Option<Descriptor> {
    if node.get("type").and_then(Value::as_str) != Some("resource") {
        return None;
    }

    let holder = match node.get("uri") {
        Some(Value::String(_)) => node,
        _ => node.get("resource")?.as_object()?,
    };
    let uri = holder.get("uri")?.as_str()?;
    if !is_ui_uri(uri) {
        return None;
    }

    Some(Descriptor {
        uri: uri.to_string(),
        embedded: embedded_content(uri, holder),
    })
}

fn embedded_content(uri: &str, holder: &Map<String, Value>) -> Option<ResourceContent> {
    let mime_type = holder.get("mimeType").and_then(Value::as_str);
    if let Some(text) = holder.get("text").and_then(Value::as_str) {
        return Some(ResourceContent::text(uri, mime_type, text));
    }
    holder
        .get("blob")
        .and_then(Value::as_str)
        .map(|blob| ResourceContent::blob(uri, mime_type, blob))
}

fn text_item(item: &Value) -> Option<&str> {
    let item = item.as_object()?;
    if item.get("type").and_then(Value::as_str) != Some("text") {
        return None;
    }
    item.get("text").and_then(Value::as_str)
}

/// Parses strings that look like serialized JSON containers or strings.
fn parse_embedded_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !matches!(trimmed.as_bytes().first(), Some(b'{' | b'[' | b'"')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
