use std::collections::HashMap;

use cpe_common::{McpServerConfig, McpTransportKind, UnifiedConfig};
use rmcp::model::{CallToolRequestParam, PaginatedRequestParam};
use rmcp::service::{serve_client, RoleClient, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::McpError;
use crate::filter::apply_tool_filter;

/// A tool exposed by an MCP server, reduced to what callers of this crate need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A single piece of content returned by a tool invocation. MCP tool results
/// are mixed-modality (text, image, resource links); we keep the raw shape
/// instead of guessing at rmcp's exact enum layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub modality: String,
    pub text: Option<String>,
    pub mime_type: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CallResult {
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
}

/// A live connection to one MCP server.
pub struct Session {
    name: String,
    service: RunningService<RoleClient, ()>,
}

impl Session {
    #[instrument(skip(self))]
    pub async fn list_tools_raw(&self) -> Result<Vec<Tool>, McpError> {
        let result = self
            .service
            .list_tools(Some(PaginatedRequestParam::default()))
            .await
            .map_err(|e| McpError::Transport {
                server: self.name.clone(),
                source: anyhow::anyhow!(e),
            })?;

        Ok(result
            .tools
            .into_iter()
            .map(|tool| tool_from_json(serde_json::to_value(tool).unwrap_or(Value::Null)))
            .collect())
    }

    #[instrument(skip(self, arguments))]
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallResult, McpError> {
        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: tool_name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| McpError::ToolInvocation {
                server: self.name.clone(),
                tool: tool_name.to_string(),
                message: e.to_string(),
            })?;

        let content = result
            .content
            .into_iter()
            .map(|block| content_block_from_json(serde_json::to_value(block).unwrap_or(Value::Null)))
            .collect();

        Ok(CallResult {
            content,
            is_error: result.is_error.unwrap_or(false),
        })
    }

    pub async fn close(self) {
        if let Err(err) = self.service.cancel().await {
            debug!(server = %self.name, error = %err, "error shutting down mcp session");
        }
    }
}

/// Best-effort conversion from rmcp's raw tool JSON, read by field name for
/// the same reason as `content_block_from_json` below.
fn tool_from_json(value: Value) -> Tool {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let input_schema = value
        .get("inputSchema")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));

    Tool {
        name,
        description,
        input_schema,
    }
}

/// Best-effort conversion from rmcp's raw content JSON into our flattened
/// `ContentBlock`, read by field name rather than matching on a specific
/// serde enum shape (the wire format is the stable contract, not the Rust type).
fn content_block_from_json(value: Value) -> ContentBlock {
    let modality = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let text = value.get("text").and_then(Value::as_str).map(str::to_string);
    let mime_type = value
        .get("mimeType")
        .and_then(Value::as_str)
        .map(str::to_string);
    let data = value.get("data").and_then(Value::as_str).map(str::to_string);

    ContentBlock {
        modality,
        text,
        mime_type,
        data,
    }
}

/// Holds per-server config and the set of currently-open sessions.
pub struct McpClient {
    servers: HashMap<String, McpServerConfig>,
}

impl McpClient {
    pub fn new(servers: HashMap<String, McpServerConfig>) -> Self {
        Self { servers }
    }

    pub fn from_config(config: &UnifiedConfig) -> Self {
        Self::new(config.mcp_servers.clone())
    }

    pub fn list_servers(&self) -> Vec<&str> {
        self.servers.keys().map(String::as_str).collect()
    }

    pub fn server_config(&self, name: &str) -> Result<&McpServerConfig, McpError> {
        self.servers.get(name).ok_or_else(|| McpError::UnknownServer {
            name: name.to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn connect(&self, name: &str) -> Result<Session, McpError> {
        let config = self.server_config(name)?;

        let service = match config.transport {
            McpTransportKind::Stdio => {
                let command_str = config
                    .command
                    .clone()
                    .ok_or_else(|| McpError::MissingCommand {
                        server: name.to_string(),
                    })?;
                let mut command = Command::new(command_str);
                command.args(&config.args);
                for (key, value) in &config.env {
                    command.env(key, value);
                }
                let (transport, stderr) = TokioChildProcess::builder(command)
                    .spawn()
                    .map_err(|e| McpError::Transport {
                        server: name.to_string(),
                        source: anyhow::anyhow!(e),
                    })?;
                if let Some(stderr) = stderr {
                    let server_name = name.to_string();
                    tokio::spawn(async move {
                        use tokio::io::{AsyncBufReadExt, BufReader};
                        let mut lines = BufReader::new(stderr).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            debug!(server = %server_name, "mcp stderr: {line}");
                        }
                    });
                }
                serve_client((), transport)
                    .await
                    .map_err(|e| McpError::Transport {
                        server: name.to_string(),
                        source: anyhow::anyhow!(e),
                    })?
            }
            McpTransportKind::Http => {
                let url = config.url.clone().ok_or_else(|| McpError::MissingUrl {
                    server: name.to_string(),
                })?;
                let http_client = reqwest::Client::builder()
                    .timeout(std::time::Duration::from_secs(config.timeout_seconds))
                    .build()
                    .map_err(|e| McpError::Transport {
                        server: name.to_string(),
                        source: anyhow::anyhow!(e),
                    })?;
                let transport_config = StreamableHttpClientTransportConfig::with_uri(url);
                let transport = StreamableHttpClientTransport::with_client(http_client, transport_config);
                serve_client((), transport)
                    .await
                    .map_err(|e| McpError::Transport {
                        server: name.to_string(),
                        source: anyhow::anyhow!(e),
                    })?
            }
        };

        Ok(Session {
            name: name.to_string(),
            service,
        })
    }

    /// List a server's tools after applying its configured allow/deny filter.
    pub async fn tools(&self, name: &str, session: &Session) -> Result<Vec<Tool>, McpError> {
        let config = self.server_config(name)?;
        let raw = session.list_tools_raw().await?;
        let outcome = apply_tool_filter(
            raw,
            config.tool_filter,
            &config.enabled_tools,
            &config.disabled_tools,
        );
        if !outcome.dropped.is_empty() {
            debug!(server = name, dropped = ?outcome.dropped, "tools excluded by filter");
        }
        Ok(outcome.kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_from_json_reads_camel_case_input_schema() {
        let value = serde_json::json!({
            "name": "read_file",
            "description": "reads a file",
            "inputSchema": {"type": "object", "properties": {"path": {"type": "string"}}},
        });
        let tool = tool_from_json(value);
        assert_eq!(tool.name, "read_file");
        assert_eq!(tool.description, "reads a file");
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn tool_from_json_defaults_missing_schema_to_empty_object() {
        let tool = tool_from_json(serde_json::json!({"name": "noop"}));
        assert_eq!(tool.input_schema, serde_json::json!({}));
    }

    #[test]
    fn content_block_from_json_extracts_text_content() {
        let value = serde_json::json!({"type": "text", "text": "hello"});
        let block = content_block_from_json(value);
        assert_eq!(block.modality, "text");
        assert_eq!(block.text.as_deref(), Some("hello"));
        assert!(block.mime_type.is_none());
    }

    #[test]
    fn content_block_from_json_extracts_image_content() {
        let value = serde_json::json!({"type": "image", "data": "base64==", "mimeType": "image/png"});
        let block = content_block_from_json(value);
        assert_eq!(block.modality, "image");
        assert_eq!(block.mime_type.as_deref(), Some("image/png"));
        assert_eq!(block.data.as_deref(), Some("base64=="));
    }
}
