//! PKCE OAuth flow engine for the `anthropic` and `openai` providers:
//! login, refresh, and the shared provider table.

mod browser;
pub mod error;
mod jwt;
mod login;
mod pkce;
pub mod provider;
pub mod token;

pub use error::OAuthError;
pub use login::{run_anthropic_paste_flow, run_openai_loopback_flow};
pub use provider::{Provider, ProviderEndpoints};
pub use token::{build_authorization_url, FlowState, TokenResponse};

use cpe_common::cancellation::CancellationToken;
use cpe_vault::{Credential, CredentialVault};

/// Drives the login and refresh flows and persists the resulting
/// credential into the vault.
pub struct OAuthEngine {
    client: reqwest::Client,
    vault: std::sync::Arc<CredentialVault>,
}

impl OAuthEngine {
    pub fn new(vault: std::sync::Arc<CredentialVault>) -> Self {
        Self {
            client: reqwest::Client::new(),
            vault,
        }
    }

    /// Run the full login flow for `provider` and persist the resulting
    /// credential. Leaves no partial credential behind on any failure.
    pub async fn login(
        &self,
        provider: Provider,
        cancel: CancellationToken,
    ) -> Result<Credential, OAuthError> {
        let endpoints = ProviderEndpoints::for_provider(provider);
        let flow = FlowState::generate(&endpoints);

        let code = match provider {
            Provider::Anthropic => {
                let pasted = login::run_anthropic_paste_flow(&endpoints, &flow, cancel).await?;
                if pasted.state != flow.state {
                    return Err(OAuthError::StateMismatch {
                        expected: flow.state.clone(),
                        actual: pasted.state,
                    });
                }
                pasted.code
            }
            Provider::OpenAi => {
                println!(
                    "Open this URL to authorize:\n{}",
                    build_authorization_url(&endpoints, &flow)
                );
                browser::open_browser(&build_authorization_url(&endpoints, &flow));
                login::run_openai_loopback_flow(&flow.state, cancel).await?
            }
        };

        let token = token::exchange_code_for_tokens(&self.client, &endpoints, &flow, &code).await?;
        let credential = self.credential_from_token(provider, &token);
        self.vault.save(credential.clone()).map_err(|err| {
            OAuthError::TokenExchangeFailed(format!("failed to persist credential: {err}"))
        })?;
        Ok(credential)
    }

    /// Force a refresh regardless of the stored token's expiry.
    pub async fn refresh(&self, provider: Provider) -> Result<Credential, OAuthError> {
        let endpoints = ProviderEndpoints::for_provider(provider);
        let existing = self.vault.get(provider.name()).map_err(|err| {
            OAuthError::TokenRefreshFailed(format!("no stored credential: {err}"))
        })?;

        let token =
            token::refresh_tokens(&self.client, &endpoints, &existing.refresh_token).await?;
        let credential = self.credential_from_token(provider, &token);
        self.vault.save(credential.clone()).map_err(|err| {
            OAuthError::TokenRefreshFailed(format!("failed to persist credential: {err}"))
        })?;
        Ok(credential)
    }

    fn credential_from_token(&self, provider: Provider, token: &TokenResponse) -> Credential {
        let expires_at = if token.expires_in > 0 {
            now_unix() + token.expires_in
        } else {
            0
        };
        let mut credential = Credential::new(
            provider.name(),
            token.access_token.clone(),
            token.refresh_token.clone(),
            expires_at,
        );
        if matches!(provider, Provider::OpenAi) {
            if let Some(account_id) = jwt::openai_chatgpt_account_id(&token.access_token) {
                credential
                    .extra_fields
                    .insert("chatgpt_account_id".to_string(), account_id.into());
            }
        }
        credential
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
