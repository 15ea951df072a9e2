use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("no server named {name} in the config")]
    UnknownServer { name: String },

    #[error("stdio server {server} requires a command")]
    MissingCommand { server: String },

    #[error("http server {server} requires a url")]
    MissingUrl { server: String },

    #[error("transport error connecting to {server}: {source}")]
    Transport {
        server: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("tool {tool} on server {server} failed: {message}")]
    ToolInvocation {
        server: String,
        tool: String,
        message: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
