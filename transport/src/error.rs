use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no credential for provider {provider}")]
    NoCredential { provider: String },

    #[error("token refresh failed: {0}")]
    RefreshFailed(#[from] cpe_oauth::OAuthError),

    #[error("request could not be cloned for auth injection")]
    RequestNotCloneable,

    #[error("underlying transport failed: {0}")]
    Transport(#[from] reqwest::Error),
}
