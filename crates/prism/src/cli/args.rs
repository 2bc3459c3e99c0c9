use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Finds `ui://` artifact references in tool results and resolves them against MCP resource servers.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Path to the artifact configuration file (TOML format)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the artifact database file (defaults to the user data directory)
    #[arg(long, env = "PRISM_ARTIFACT_DB", global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List the artifact references found in a payload
    Scan {
        /// JSON file holding a tool result or a list of tool invocations ("-" for stdin)
        payload: PathBuf,
    },
    /// Resolve the artifacts of a payload as one assistant message
    Resolve {
        /// JSON file holding a tool result or a list of tool invocations ("-" for stdin)
        payload: PathBuf,
        #[arg(long)]
        message_id: String,
        #[arg(long)]
        chat_id: String,
        /// Write the persistence record to the artifact database
        #[arg(long)]
        persist: bool,
    },
    /// Show the stored artifacts of a message
    Replay {
        #[arg(long)]
        message_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_arguments() {
        let cli = Cli::try_parse_from([
            "prism",
            "--config",
            "artifacts.toml",
            "resolve",
            "result.json",
            "--message-id",
            "m1",
            "--chat-id",
            "c1",
            "--persist",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("artifacts.toml")));
        assert_eq!(
            cli.command,
            Commands::Resolve {
                payload: PathBuf::from("result.json"),
                message_id: "m1".to_string(),
                chat_id: "c1".to_string(),
                persist: true,
            }
        );
    }

    #[test]
    fn test_global_db_after_subcommand() {
        let cli =
            Cli::try_parse_from(["prism", "replay", "--message-id", "m1", "--db", "a.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("a.db")));
    }

    #[test]
    fn test_resolve_requires_identity() {
        assert!(Cli::try_parse_from(["prism", "resolve", "result.json"]).is_err());
    }
}
