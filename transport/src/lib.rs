//! Auth Transport: injects a bearer token (refreshing it if it's near
//! expiry) and, for Anthropic, merges the oauth beta-feature tokens and
//! strips any `x-api-key` header. Sits *above* a caller-supplied base
//! round-tripper so a JSON-patch/body-mutation layer can run beneath it.

mod base;
mod error;

pub use base::BaseTransport;
pub use error::TransportError;

use std::sync::Arc;

use cpe_oauth::{OAuthEngine, Provider};
use cpe_vault::CredentialVault;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use tokio::sync::Mutex;

const ANTHROPIC_BETA_HEADER: &str = "anthropic-beta";
const ANTHROPIC_REQUIRED_BETA_TOKENS: &[&str] = &["oauth-2025-04-20", "claude-code-20250219"];
const X_API_KEY_HEADER: &str = "x-api-key";
const REFRESH_WINDOW_SECS: i64 = 60;

pub struct AuthTransport {
    provider: Provider,
    vault: Arc<CredentialVault>,
    oauth: Arc<OAuthEngine>,
    base: Arc<dyn BaseTransport>,
    refresh_lock: Mutex<()>,
}

impl AuthTransport {
    /// `base` defaults to a plain `reqwest::Client` when `None`; pass a
    /// custom implementation to compose beneath a body-patching layer.
    pub fn new(
        provider: Provider,
        vault: Arc<CredentialVault>,
        oauth: Arc<OAuthEngine>,
        base: Option<Arc<dyn BaseTransport>>,
    ) -> Self {
        Self {
            provider,
            vault,
            oauth,
            base: base.unwrap_or_else(|| Arc::new(reqwest::Client::new())),
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn execute(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, TransportError> {
        let credential = self.ensure_fresh_credential().await?;

        let mut cloned = request
            .try_clone()
            .ok_or(TransportError::RequestNotCloneable)?;

        let headers = cloned.headers_mut();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credential.access_token))
            .map_err(|_| TransportError::RequestNotCloneable)?;
        headers.insert(AUTHORIZATION, bearer);

        if matches!(self.provider, Provider::Anthropic) {
            apply_anthropic_headers(headers);
        }

        self.base.execute(cloned).await.map_err(TransportError::from)
    }

    async fn ensure_fresh_credential(&self) -> Result<cpe_vault::Credential, TransportError> {
        let credential =
            self.vault
                .get(self.provider.name())
                .map_err(|_| TransportError::NoCredential {
                    provider: self.provider.name().to_string(),
                })?;

        if !needs_refresh(credential.expires, now_unix()) {
            return Ok(credential);
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-read and re-check: another waiter may have already refreshed
        // while we queued for the lock.
        let credential =
            self.vault
                .get(self.provider.name())
                .map_err(|_| TransportError::NoCredential {
                    provider: self.provider.name().to_string(),
                })?;
        if !needs_refresh(credential.expires, now_unix()) {
            return Ok(credential);
        }

        Ok(self.oauth.refresh(self.provider).await?)
    }
}

fn needs_refresh(expires_at: i64, now: i64) -> bool {
    expires_at > 0 && now >= expires_at - REFRESH_WINDOW_SECS
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Merge the required oauth beta tokens into any caller-supplied
/// `anthropic-beta` header (comma-joined, deduplicated, order-preserving),
/// and drop `x-api-key` — OAuth credentials never travel alongside it.
fn apply_anthropic_headers(headers: &mut reqwest::header::HeaderMap) {
    let existing = headers
        .get(ANTHROPIC_BETA_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let mut tokens: Vec<String> = existing
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    for required in ANTHROPIC_REQUIRED_BETA_TOKENS {
        if !tokens.iter().any(|t| t == required) {
            tokens.push((*required).to_string());
        }
    }

    if let Ok(value) = HeaderValue::from_str(&tokens.join(",")) {
        headers.insert(HeaderName::from_static(ANTHROPIC_BETA_HEADER), value);
    }

    headers.remove(X_API_KEY_HEADER);
}
