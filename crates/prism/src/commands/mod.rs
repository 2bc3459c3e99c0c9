use async_trait::async_trait;
use eyre::{Result, eyre};
use prism_core::artifacts::ToolInvocation;
use prism_core::store::SqliteArtifactStore;
use prism_core::utils::AppPaths;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub mod replay;
pub mod resolve;
pub mod scan;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Reads a payload file ("-" for stdin).
///
/// A JSON array of `{tool_call_id, tool_name, result}` objects is taken as the
/// message's tool invocations; anything else is a single tool result.
pub fn load_invocations(path: &Path) -> prism_core::error::Result<Vec<ToolInvocation>> {
    let text = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };

    let value: Value = serde_json::from_str(&text)?;
    Ok(invocations_from_value(value))
}

fn invocations_from_value(value: Value) -> Vec<ToolInvocation> {
    let is_invocation_list = value.as_array().is_some_and(|items| {
        !items.is_empty() && items.iter().all(|item| item.get("tool_call_id").is_some())
    });

    if is_invocation_list {
        if let Ok(invocations) = serde_json::from_value::<Vec<ToolInvocation>>(value.clone()) {
            return invocations;
        }
    }
    vec![ToolInvocation::new("payload", "payload", value)]
}

pub async fn open_store(db: Option<&PathBuf>) -> Result<SqliteArtifactStore> {
    let path = match db {
        Some(path) => path.clone(),
        None => AppPaths::default_artifact_db()
            .ok_or_else(|| eyre!("Failed to determine the user data directory; pass --db"))?,
    };

    SqliteArtifactStore::new(&path)
        .await
        .map_err(|e| eyre!("Failed to open artifact database {}: {}", path.display(), e))
}

pub fn write_json(value: &Value) -> Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::error::Error;
    use serde_json::json;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn test_invocation_list_is_recognized() {
        let invocations = invocations_from_value(json!([
            {"tool_call_id": "t1", "tool_name": "chart", "result": {"type": "resource", "uri": "ui://a"}},
            {"tool_call_id": "t2", "tool_name": "graph"},
        ]));

        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].tool_name, "chart");
        assert_eq!(invocations[1].result, Value::Null);
    }

    #[test]
    fn test_plain_result_becomes_one_invocation() {
        let result = json!([{"type": "resource", "uri": "ui://a"}]);
        let invocations = invocations_from_value(result.clone());

        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].result, result);
    }

    #[test]
    fn test_load_invocations_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"type": "resource", "uri": "ui://chart"}}"#).unwrap();

        let invocations = load_invocations(file.path()).unwrap();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].result["uri"], "ui://chart");
    }

    #[test]
    fn test_load_invocations_rejects_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = load_invocations(file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
        assert!(err.to_string().starts_with("Invalid payload"));
    }

    #[test]
    fn test_load_invocations_reports_missing_file_as_io() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_invocations(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }
}
