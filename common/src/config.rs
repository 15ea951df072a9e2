//! Unified config file (`config.yaml` under the user's config directory).
//!
//! The core only consumes the `mcpServers` table and each model's
//! `patchRequest` field; `models` and `defaults` are otherwise opaque and
//! owned by the driver that embeds this crate.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport kind for an MCP server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    Stdio,
    Http,
}

/// Tool-filter mode applied to a server's tool list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolFilterMode {
    #[default]
    All,
    Whitelist,
    Blacklist,
}

/// Configuration for a single MCP server entry under `mcpServers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    #[serde(rename = "type")]
    pub transport: McpTransportKind,

    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(rename = "timeoutSeconds", default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(rename = "toolFilter", default)]
    pub tool_filter: ToolFilterMode,
    #[serde(rename = "enabledTools", default)]
    pub enabled_tools: Vec<String>,
    #[serde(rename = "disabledTools", default)]
    pub disabled_tools: Vec<String>,
}

fn default_timeout_seconds() -> u64 {
    60
}

/// Per-model request-body patch, applied below the Auth Transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(rename = "patchRequest", default)]
    pub patch_request: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The subset of the unified config file the core understands. `models` and
/// `defaults` are kept as opaque YAML so a driver can round-trip its own
/// fields without this crate needing to know their shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifiedConfig {
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: HashMap<String, McpServerConfig>,
    #[serde(default)]
    pub defaults: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Path to the unified config file: `<config-dir>/cpe/config.yaml`.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join("cpe")
        .join("config.yaml"))
}

impl UnifiedConfig {
    /// Load the unified config from its default path. A missing file is
    /// treated as an empty config, matching the vault's "tolerate absence"
    /// policy rather than erroring on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("does-not-exist.yaml");
        let cfg = UnifiedConfig::load_from(&path).expect("load");
        assert!(cfg.mcp_servers.is_empty());
    }

    #[test]
    fn parses_mcp_servers_section() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
mcpServers:
  files:
    type: stdio
    command: mcp-server-files
    args: ["--root", "/tmp"]
    toolFilter: whitelist
    enabledTools: ["read_file"]
"#,
        )
        .expect("write");

        let cfg = UnifiedConfig::load_from(&path).expect("load");
        let files = cfg.mcp_servers.get("files").expect("files server");
        assert_eq!(files.transport, McpTransportKind::Stdio);
        assert_eq!(files.command.as_deref(), Some("mcp-server-files"));
        assert_eq!(files.tool_filter, ToolFilterMode::Whitelist);
        assert_eq!(files.enabled_tools, vec!["read_file".to_string()]);
        assert_eq!(files.timeout_seconds, 60);
    }

    #[test]
    fn patch_request_field_reads_camel_case_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
models:
  claude-3-5-sonnet:
    patchRequest:
      temperature: 0.2
"#,
        )
        .expect("write");

        let cfg = UnifiedConfig::load_from(&path).expect("load");
        let model = cfg.models.get("claude-3-5-sonnet").expect("model entry");
        assert_eq!(
            model.patch_request,
            Some(serde_json::json!({"temperature": 0.2}))
        );
    }
}
