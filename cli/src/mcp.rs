use clap::Subcommand;
use cpe_mcp::McpClient;

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum McpCommand {
    /// Print an empty mcpServers section for the config file.
    Init,
    /// List configured server names.
    ListServers,
    /// Show one server's transport and filter configuration.
    Info { name: String },
    /// Connect to a server and list its tools.
    ListTools {
        name: String,
        /// Show every tool the server reports, ignoring its configured filter.
        #[arg(long, conflicts_with = "show_filtered")]
        show_all: bool,
        /// Show only the tools dropped by the configured filter.
        #[arg(long, conflicts_with = "show_all")]
        show_filtered: bool,
    },
    /// Connect to a server and invoke one of its tools.
    CallTool {
        #[arg(long)]
        server: String,
        #[arg(long)]
        tool: String,
        /// JSON object of tool arguments.
        #[arg(long)]
        args: Option<String>,
    },
}

pub async fn run(client: &McpClient, command: McpCommand) -> Result<(), CliError> {
    match command {
        McpCommand::Init => {
            println!("mcpServers: {{}}");
            Ok(())
        }
        McpCommand::ListServers => {
            for name in client.list_servers() {
                println!("{name}");
            }
            Ok(())
        }
        McpCommand::Info { name } => {
            let config = client.server_config(&name)?;
            println!("{name}: {config:?}");
            Ok(())
        }
        McpCommand::ListTools {
            name,
            show_all,
            show_filtered,
        } => {
            let session = client.connect(&name).await?;
            let tools = if show_all || show_filtered {
                let raw = session.list_tools_raw().await?;
                if show_filtered {
                    let config = client.server_config(&name)?;
                    let outcome = cpe_mcp::apply_tool_filter(
                        raw,
                        config.tool_filter,
                        &config.enabled_tools,
                        &config.disabled_tools,
                    );
                    outcome
                        .dropped
                        .into_iter()
                        .map(|dropped_name| cpe_mcp::Tool {
                            name: dropped_name,
                            description: String::new(),
                            input_schema: serde_json::json!({}),
                        })
                        .collect()
                } else {
                    raw
                }
            } else {
                client.tools(&name, &session).await?
            };
            for tool in tools {
                println!("{}\t{}", tool.name, tool.description);
            }
            session.close().await;
            Ok(())
        }
        McpCommand::CallTool { server, tool, args } => {
            let arguments = match args {
                Some(raw) => {
                    let value: serde_json::Value = serde_json::from_str(&raw)
                        .map_err(|err| CliError::UserError(format!("invalid --args json: {err}")))?;
                    match value {
                        serde_json::Value::Object(map) => Some(map),
                        _ => {
                            return Err(CliError::UserError(
                                "--args must be a json object".to_string(),
                            ))
                        }
                    }
                }
                None => None,
            };

            let session = client.connect(&server).await?;
            let result = session.call_tool(&tool, arguments).await?;
            for block in result.content {
                match block.text {
                    Some(text) => println!("{text}"),
                    None => println!("[{} content]", block.modality),
                }
            }
            if result.is_error {
                session.close().await;
                return Err(CliError::UserError(format!(
                    "tool {tool} on server {server} reported an error"
                )));
            }
            session.close().await;
            Ok(())
        }
    }
}
