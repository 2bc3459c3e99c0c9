use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::reference::same_ui_uri;
use crate::mcp::{McpError, ResourceBody, ResourceContent};

/// Assumed when neither the server nor the tool result names a MIME type.
pub const DEFAULT_MIME_TYPE: &str = "text/html";

/// Decoded artifact content for one `ui://` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedArtifact {
    pub uri: String,
    pub mime_type: String,
    pub content: String,
}

impl ResolvedArtifact {
    /// Picks the entry for `uri` out of a read response (falling back to the
    /// first entry) and decodes it. Returns `None` for an empty response.
    pub fn from_contents(uri: &str, contents: Vec<ResourceContent>) -> Result<Option<Self>, McpError> {
        let position = contents.iter().position(|c| c.uri == uri).unwrap_or(0);
        match contents.into_iter().nth(position) {
            Some(content) => Self::decode(uri, content).map(Some),
            None => Ok(None),
        }
    }

    /// Text is taken verbatim; blobs are base64-decoded into text.
    pub fn decode(uri: &str, content: ResourceContent) -> Result<Self, McpError> {
        let text = match content.body {
            ResourceBody::Text(text) => text,
            ResourceBody::Blob(blob) => {
                let bytes = STANDARD
                    .decode(blob.trim())
                    .map_err(|e| McpError::invalid_content(uri, format!("Invalid base64 blob: {e}")))?;
                String::from_utf8(bytes)
                    .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        };

        Ok(Self {
            uri: uri.to_string(),
            mime_type: content
                .mime_type
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            content: text,
        })
    }
}

/// Identity of the assistant message whose tool results are being processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIdentity {
    pub message_id: String,
    pub chat_id: String,
}

impl MessageIdentity {
    pub fn new(message_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            chat_id: chat_id.into(),
        }
    }
}

/// One tool call of a message, as produced by the agent layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub tool_name: String,
    /// Raw tool result; may still be growing while the response streams.
    #[serde(default)]
    pub result: Value,
}

impl ToolInvocation {
    pub fn new(tool_call_id: impl Into<String>, tool_name: impl Into<String>, result: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            result,
        }
    }
}

/// Resolved artifacts of a single message, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArtifactSet {
    pub message_id: String,
    pub chat_id: String,
    /// Set only when the live reference resolved.
    pub live_uri: Option<String>,
    pub artifacts: Vec<ResolvedArtifact>,
}

impl MessageArtifactSet {
    pub fn new(identity: &MessageIdentity, live_sentinel: &str, artifacts: Vec<ResolvedArtifact>) -> Self {
        let live_uri = artifacts
            .iter()
            .find(|a| same_ui_uri(&a.uri, live_sentinel))
            .map(|a| a.uri.clone());
        Self {
            message_id: identity.message_id.clone(),
            chat_id: identity.chat_id.clone(),
            live_uri,
            artifacts,
        }
    }

    pub fn live(&self) -> Option<&ResolvedArtifact> {
        let live_uri = self.live_uri.as_deref()?;
        self.artifacts.iter().find(|a| a.uri == live_uri)
    }

    pub fn inline_artifacts(&self) -> impl Iterator<Item = &ResolvedArtifact> {
        self.artifacts
            .iter()
            .filter(move |a| Some(a.uri.as_str()) != self.live_uri.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn into_display(self) -> DisplayUpdate {
        let mut live = None;
        let mut inline_artifacts = Vec::with_capacity(self.artifacts.len());
        for artifact in self.artifacts {
            if live.is_none() && Some(artifact.uri.as_str()) == self.live_uri.as_deref() {
                live = Some(LiveArtifact {
                    uri: artifact.uri,
                    mime_type: artifact.mime_type,
                    content: artifact.content,
                });
            } else {
                inline_artifacts.push(artifact);
            }
        }
        DisplayUpdate {
            live,
            inline_artifacts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveArtifact {
    pub uri: String,
    pub mime_type: String,
    pub content: String,
}

/// What the display surface receives for a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayUpdate {
    pub live: Option<LiveArtifact>,
    pub inline_artifacts: Vec<ResolvedArtifact>,
}

/// Record handed to the persistence gateway at the end of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedArtifact {
    pub message_id: String,
    pub chat_id: String,
    /// Absent when nothing resolved, never empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
}

impl PersistedArtifact {
    /// Splits stored content back into the individual artifacts.
    pub fn segments<'a>(&'a self, delimiter: &str) -> Vec<&'a str> {
        match self.html_content.as_deref() {
            Some(content) if !delimiter.is_empty() => content.split(delimiter).collect(),
            Some(content) => vec![content],
            None => Vec::new(),
        }
    }
}
