//! Authorization URL construction and the token/refresh HTTP exchange.

use serde::{Deserialize, Serialize};

use crate::error::OAuthError;
use crate::pkce;
use crate::provider::{ProviderEndpoints, StatePolicy, TokenBodyEncoding};

/// Per-attempt PKCE state, held in memory only for the duration of one
/// login flow.
#[derive(Debug, Clone)]
pub struct FlowState {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
    pub redirect_uri: String,
}

impl FlowState {
    pub fn generate(endpoints: &ProviderEndpoints) -> Self {
        let verifier = pkce::generate_verifier();
        let challenge = pkce::compute_challenge(&verifier);
        let state = match endpoints.state_policy {
            StatePolicy::Verifier => verifier.clone(),
            StatePolicy::Random => pkce::generate_state(),
        };
        Self {
            verifier,
            challenge,
            state,
            redirect_uri: endpoints.redirect_uri.clone(),
        }
    }
}

pub fn build_authorization_url(endpoints: &ProviderEndpoints, flow: &FlowState) -> String {
    let mut url = url::Url::parse(&endpoints.auth_url).unwrap_or_else(|_| {
        #[allow(clippy::unwrap_used)]
        url::Url::parse("https://invalid.example/").unwrap()
    });
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("response_type", "code")
            .append_pair("client_id", &endpoints.client_id)
            .append_pair("redirect_uri", &flow.redirect_uri)
            .append_pair("scope", &endpoints.scopes)
            .append_pair("code_challenge", &flow.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &flow.state);
        if matches!(endpoints.provider, crate::provider::Provider::Anthropic) {
            query.append_pair("code", "true");
        }
    }
    url.to_string()
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

const ANTHROPIC_BETA_HEADER: &str = "oauth-2025-04-20";

#[derive(Serialize)]
struct JsonExchangeBody<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    redirect_uri: &'a str,
    code: &'a str,
    state: &'a str,
    code_verifier: &'a str,
}

#[derive(Serialize)]
struct JsonRefreshBody<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    refresh_token: &'a str,
}

pub async fn exchange_code_for_tokens(
    client: &reqwest::Client,
    endpoints: &ProviderEndpoints,
    flow: &FlowState,
    code: &str,
) -> Result<TokenResponse, OAuthError> {
    let request = match endpoints.body_encoding {
        TokenBodyEncoding::Json => {
            let body = JsonExchangeBody {
                grant_type: "authorization_code",
                client_id: &endpoints.client_id,
                redirect_uri: &flow.redirect_uri,
                code,
                state: &flow.state,
                code_verifier: &flow.verifier,
            };
            client
                .post(&endpoints.token_url)
                .header("anthropic-beta", ANTHROPIC_BETA_HEADER)
                .json(&body)
        }
        TokenBodyEncoding::FormUrlEncoded => {
            let params = [
                ("grant_type", "authorization_code"),
                ("client_id", &endpoints.client_id),
                ("redirect_uri", &flow.redirect_uri),
                ("code", code),
                ("code_verifier", &flow.verifier),
            ];
            client.post(&endpoints.token_url).form(&params)
        }
    };
    send_and_parse(request, OAuthError::TokenExchangeFailed).await
}

pub async fn refresh_tokens(
    client: &reqwest::Client,
    endpoints: &ProviderEndpoints,
    refresh_token: &str,
) -> Result<TokenResponse, OAuthError> {
    let request = match endpoints.body_encoding {
        TokenBodyEncoding::Json => {
            let body = JsonRefreshBody {
                grant_type: "refresh_token",
                client_id: &endpoints.client_id,
                refresh_token,
            };
            client
                .post(&endpoints.token_url)
                .header("anthropic-beta", ANTHROPIC_BETA_HEADER)
                .json(&body)
        }
        TokenBodyEncoding::FormUrlEncoded => {
            let params = [
                ("grant_type", "refresh_token"),
                ("client_id", &endpoints.client_id),
                ("refresh_token", refresh_token),
            ];
            client.post(&endpoints.token_url).form(&params)
        }
    };
    send_and_parse(request, OAuthError::TokenRefreshFailed).await
}

async fn send_and_parse(
    request: reqwest::RequestBuilder,
    on_failure: fn(String) -> OAuthError,
) -> Result<TokenResponse, OAuthError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        if let Ok(payload) = serde_json::from_str::<ErrorPayload>(&body) {
            return Err(OAuthError::OAuthError {
                code: payload.error,
                description: payload.error_description,
            });
        }
        return Err(on_failure(format!("{status}: {body}")));
    }

    serde_json::from_str(&body).map_err(|_| on_failure(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    #[test]
    fn authorization_url_carries_pkce_params() {
        let endpoints = ProviderEndpoints::for_provider(Provider::Anthropic);
        let flow = FlowState::generate(&endpoints);
        let url = build_authorization_url(&endpoints, &flow);
        assert!(url.contains("code_challenge="));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("state={}", flow.state)));
        assert!(url.contains("code=true"));
    }

    #[test]
    fn openai_url_has_no_code_true_param() {
        let endpoints = ProviderEndpoints::for_provider(Provider::OpenAi);
        let flow = FlowState::generate(&endpoints);
        let url = build_authorization_url(&endpoints, &flow);
        assert!(!url.contains("code=true"));
    }

    #[test]
    fn anthropic_state_equals_verifier() {
        let endpoints = ProviderEndpoints::for_provider(Provider::Anthropic);
        let flow = FlowState::generate(&endpoints);
        assert_eq!(flow.state, flow.verifier);
    }
}
