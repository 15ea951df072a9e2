//! CLI driver: subcommand parsing and dispatch for `auth`, `conversation`,
//! and `mcp`.

mod auth;
mod conversation;
mod error;
mod mcp;

use clap::{Parser, Subcommand};
use cpe_common::UnifiedConfig;
use cpe_dialog::DialogStore;
use cpe_mcp::McpClient;

pub use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "cpe", version, about = "A CLI programming assistant")]
pub struct Cli {
    /// Force debug-level logging regardless of RUST_LOG.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage OAuth credentials.
    #[command(subcommand)]
    Auth(auth::AuthCommand),
    /// Inspect and manage stored conversations.
    #[command(subcommand)]
    Conversation(conversation::ConversationCommand),
    /// Inspect and call configured MCP servers.
    #[command(subcommand)]
    Mcp(mcp::McpCommand),
}

/// Path to the dialog store's SQLite file: `<config-dir>/cpe/dialog.db`.
fn dialog_store_path() -> Result<std::path::PathBuf, CliError> {
    Ok(dirs::config_dir()
        .ok_or_else(|| CliError::Config("could not determine config directory".to_string()))?
        .join("cpe")
        .join("dialog.db"))
}

pub async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    cpe_common::logging::init_logging(cli.verbose)
        .map_err(|err| CliError::Config(err.to_string()))?;

    match cli.command {
        Command::Auth(command) => auth::run(command).await,
        Command::Conversation(command) => {
            let store = DialogStore::open(&dialog_store_path()?)?;
            conversation::run(&store, command)
        }
        Command::Mcp(command) => {
            let config = UnifiedConfig::load()?;
            let client = McpClient::from_config(&config);
            mcp::run(&client, command).await
        }
    }
}
