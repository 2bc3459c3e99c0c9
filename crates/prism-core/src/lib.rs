// Artifact reference discovery and resolution for tool results

pub mod artifacts;
pub mod config;
pub mod error;
pub mod mcp;
pub mod store;
pub mod test_utils;
pub mod utils;
