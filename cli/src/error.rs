use thiserror::Error;

/// Top-level CLI error, carrying the exit code a driver should return.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    UserError(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    /// §6: 0 success, 1 user or config error, non-zero on any uncaught
    /// propagation.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::UserError(_) => 1,
            CliError::Internal(_) => 2,
        }
    }
}

impl From<cpe_vault::VaultError> for CliError {
    fn from(err: cpe_vault::VaultError) -> Self {
        match err {
            cpe_vault::VaultError::NotFound { .. } => {
                CliError::UserError(format!("{err}\nhint: run `cpe auth login <provider>` first"))
            }
            other => CliError::Internal(other.into()),
        }
    }
}

impl From<cpe_oauth::OAuthError> for CliError {
    fn from(err: cpe_oauth::OAuthError) -> Self {
        CliError::UserError(err.to_string())
    }
}

impl From<cpe_dialog::DialogError> for CliError {
    fn from(err: cpe_dialog::DialogError) -> Self {
        match err {
            cpe_dialog::DialogError::NotFound { .. }
            | cpe_dialog::DialogError::HasChildren { .. } => CliError::UserError(err.to_string()),
            cpe_dialog::DialogError::ParentChainMismatch { .. } => CliError::Internal(
                anyhow::anyhow!("internal inconsistency in the conversation store: {err}"),
            ),
            other => CliError::Internal(other.into()),
        }
    }
}

impl From<cpe_mcp::McpError> for CliError {
    fn from(err: cpe_mcp::McpError) -> Self {
        match err {
            cpe_mcp::McpError::UnknownServer { .. } => CliError::UserError(err.to_string()),
            other => CliError::Internal(other.into()),
        }
    }
}

impl From<cpe_common::config::ConfigError> for CliError {
    fn from(err: cpe_common::config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
