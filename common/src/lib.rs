//! Shared infrastructure for the `cpe` crates.
//!
//! - Logging initialization with daily file rotation.
//! - The unified config file (`mcpServers` table, per-model `patchRequest`).
//! - A re-exported cancellation token used for cooperative shutdown.

pub mod cancellation;
pub mod config;
pub mod logging;

pub use config::{McpServerConfig, McpTransportKind, ToolFilterMode, UnifiedConfig};
