pub mod cli;
pub mod commands;

pub use prism_core::{artifacts, config, mcp, store, utils};
