use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Dialog(#[from] cpe_dialog::DialogError),

    #[error(transparent)]
    Mcp(#[from] cpe_mcp::McpError),

    #[error(transparent)]
    Transport(#[from] cpe_transport::TransportError),

    #[error("unknown model {0} in config")]
    UnknownModel(String),
}
