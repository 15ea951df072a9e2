use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no credential stored for provider {provider}")]
    NotFound { provider: String },

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read vault file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write vault file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupted vault file {path}: {source}")]
    CorruptedData {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl VaultError {
    pub fn not_found(provider: impl Into<String>) -> Self {
        Self::NotFound {
            provider: provider.into(),
        }
    }
}
