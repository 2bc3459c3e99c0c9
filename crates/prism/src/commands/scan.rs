use async_trait::async_trait;
use eyre::Result;
use prism_core::artifacts::{ResourceReference, scan_all};
use serde_json::{Value, json};
use std::path::PathBuf;

use super::{Command, load_invocations, write_json};

pub struct ScanCommand {
    pub payload: PathBuf,
}

#[async_trait]
impl Command for ScanCommand {
    async fn execute(&self) -> Result<()> {
        let invocations = load_invocations(&self.payload)?;
        let references = scan_all(invocations.iter().map(|invocation| &invocation.result));
        write_json(&references_json(&references))
    }
}

fn references_json(references: &[ResourceReference]) -> Value {
    references
        .iter()
        .map(|reference| {
            json!({
                "uri": reference.uri,
                "encoding": reference.source_encoding.as_str(),
                "embedded": reference.embedded.is_some(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::artifacts::scan;

    #[test]
    fn test_references_are_listed_in_discovery_order() {
        let payload = json!({"content": [
            {"type": "resource", "resource": {"uri": "ui://b", "text": "<b/>"}},
            {"type": "text", "text": "{\"type\":\"resource\",\"uri\":\"ui://a\"}"},
        ]});

        let listed = references_json(&scan(&payload));

        assert_eq!(
            listed,
            json!([
                {"uri": "ui://b", "encoding": "content_array_item", "embedded": true},
                {"uri": "ui://a", "encoding": "stringified_json", "embedded": false},
            ])
        );
    }
}
