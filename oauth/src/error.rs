use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("oauth provider returned an error: {code}{}", description.as_ref().map(|d| format!(" ({d})")).unwrap_or_default())]
    OAuthError {
        code: String,
        description: Option<String>,
    },

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("oauth callback state mismatch: expected {expected}, got {actual}")]
    StateMismatch { expected: String, actual: String },

    #[error("oauth flow interrupted before completion")]
    Interrupted,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
