//! Provider table: per-provider endpoints, redirect URI, state policy, and
//! token request body encoding. Every field is overridable via
//! `CPE_<PROVIDER>_<FIELD>` environment variables.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            Provider::Anthropic => "CPE_ANTHROPIC",
            Provider::OpenAi => "CPE_OPENAI",
        }
    }
}

/// How the `state` parameter is derived for a given provider's login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePolicy {
    /// `state` is set to the PKCE verifier itself.
    Verifier,
    /// `state` is an independently generated random value.
    Random,
}

/// How the token endpoint expects the request body to be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBodyEncoding {
    Json,
    FormUrlEncoded,
}

#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub provider: Provider,
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: String,
    pub state_policy: StatePolicy,
    pub body_encoding: TokenBodyEncoding,
}

fn env_override(prefix: &str, field: &str) -> Option<String> {
    std::env::var(format!("{prefix}_{field}")).ok()
}

impl ProviderEndpoints {
    pub fn for_provider(provider: Provider) -> Self {
        let prefix = provider.env_prefix();
        match provider {
            Provider::Anthropic => Self {
                provider,
                client_id: env_override(prefix, "CLIENT_ID")
                    .unwrap_or_else(|| "9d1c250a-e61b-44d9-88ed-5944d1962f5e".to_string()),
                auth_url: env_override(prefix, "AUTH_URL")
                    .unwrap_or_else(|| "https://claude.ai/oauth/authorize".to_string()),
                token_url: env_override(prefix, "TOKEN_URL").unwrap_or_else(|| {
                    "https://console.anthropic.com/v1/oauth/token".to_string()
                }),
                redirect_uri: env_override(prefix, "REDIRECT_URI").unwrap_or_else(|| {
                    "https://console.anthropic.com/oauth/code/callback".to_string()
                }),
                scopes: env_override(prefix, "SCOPES")
                    .unwrap_or_else(|| "org:create_api_key user:profile user:inference".to_string()),
                state_policy: StatePolicy::Verifier,
                body_encoding: TokenBodyEncoding::Json,
            },
            Provider::OpenAi => Self {
                provider,
                client_id: env_override(prefix, "CLIENT_ID")
                    .unwrap_or_else(|| "app_EMoamEEZ73f0CkXaXp7hrann".to_string()),
                auth_url: env_override(prefix, "AUTH_URL")
                    .unwrap_or_else(|| "https://auth.openai.com/oauth/authorize".to_string()),
                token_url: env_override(prefix, "TOKEN_URL")
                    .unwrap_or_else(|| "https://auth.openai.com/oauth/token".to_string()),
                redirect_uri: env_override(prefix, "REDIRECT_URI")
                    .unwrap_or_else(|| "http://localhost:1455/auth/callback".to_string()),
                scopes: env_override(prefix, "SCOPES")
                    .unwrap_or_else(|| "openid profile email offline_access".to_string()),
                state_policy: StatePolicy::Random,
                body_encoding: TokenBodyEncoding::FormUrlEncoded,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_state_policy_is_verifier() {
        let endpoints = ProviderEndpoints::for_provider(Provider::Anthropic);
        assert_eq!(endpoints.state_policy, StatePolicy::Verifier);
        assert_eq!(endpoints.body_encoding, TokenBodyEncoding::Json);
    }

    #[test]
    fn openai_state_policy_is_random() {
        let endpoints = ProviderEndpoints::for_provider(Provider::OpenAi);
        assert_eq!(endpoints.state_policy, StatePolicy::Random);
        assert_eq!(endpoints.body_encoding, TokenBodyEncoding::FormUrlEncoded);
        assert_eq!(endpoints.redirect_uri, "http://localhost:1455/auth/callback");
    }

    #[test]
    fn env_override_wins_over_default() {
        std::env::set_var("CPE_ANTHROPIC_CLIENT_ID", "test-client-id");
        let endpoints = ProviderEndpoints::for_provider(Provider::Anthropic);
        assert_eq!(endpoints.client_id, "test-client-id");
        std::env::remove_var("CPE_ANTHROPIC_CLIENT_ID");
    }
}
