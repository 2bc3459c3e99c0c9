use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mcp::ResourceContent;

/// Scheme reserved for displayable artifacts.
pub const UI_SCHEME: &str = "ui://";

/// Returns true if `uri` is in the `ui://` scheme and names something.
pub fn is_ui_uri(uri: &str) -> bool {
    uri.len() > UI_SCHEME.len()
        && uri
            .get(..UI_SCHEME.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(UI_SCHEME))
}

/// Compares two `ui://` URIs, ignoring the case of the scheme only.
pub fn same_ui_uri(a: &str, b: &str) -> bool {
    if !(is_ui_uri(a) && is_ui_uri(b)) {
        return a == b;
    }
    a.get(UI_SCHEME.len()..) == b.get(UI_SCHEME.len()..)
}

/// Where in a tool result a reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// The node itself is a resource descriptor
    DirectResourceObject,
    /// An item of a `content` array is a resource
    ContentArrayItem,
    /// A string field held JSON that contained the resource
    StringifiedJson,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::DirectResourceObject => "direct_resource_object",
            Encoding::ContentArrayItem => "content_array_item",
            Encoding::StringifiedJson => "stringified_json",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    pub uri: String,
    pub source_encoding: Encoding,
    /// Content carried inline by the tool result, if any. Such references
    /// resolve without contacting a server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<ResourceContent>,
}

impl ResourceReference {
    pub fn new(uri: impl Into<String>, source_encoding: Encoding) -> Self {
        Self {
            uri: uri.into(),
            source_encoding,
            embedded: None,
        }
    }

    pub fn with_embedded(mut self, content: ResourceContent) -> Self {
        self.embedded = Some(content);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ui://graph-visualization", true)]
    #[case("UI://chart-1", true)]
    #[case("ui://", false)]
    #[case("https://example.com", false)]
    #[case("ui:/chart", false)]
    #[case("", false)]
    #[case("üi://x", false)]
    fn test_is_ui_uri(#[case] uri: &str, #[case] expected: bool) {
        assert_eq!(is_ui_uri(uri), expected);
    }

    #[rstest]
    #[case("ui://graph-visualization", "ui://graph-visualization", true)]
    #[case("UI://graph-visualization", "ui://graph-visualization", true)]
    #[case("Ui://graph-visualization", "uI://graph-visualization", true)]
    #[case("ui://Graph-Visualization", "ui://graph-visualization", false)]
    #[case("ui://graph", "ui://graph-visualization", false)]
    #[case("https://x", "https://x", true)]
    #[case("HTTPS://x", "https://x", false)]
    fn test_same_ui_uri(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
        assert_eq!(same_ui_uri(a, b), expected);
        assert_eq!(same_ui_uri(b, a), expected);
    }
}
