//! Minimal JWT payload decoding. We never verify a signature here: the
//! token came straight from the IdP's own token endpoint over TLS, and the
//! only thing extracted is an account id for the transport to attach to
//! later requests.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;

/// Extract `payload["https://api.openai.com/auth"]["chatgpt_account_id"]`
/// from a JWT access token. Returns `None` if the token isn't a well-formed
/// JWT or the claim is absent.
pub fn openai_chatgpt_account_id(access_token: &str) -> Option<String> {
    let payload_segment = access_token.split('.').nth(1)?;
    let padded = pad_base64url(payload_segment);
    let bytes = URL_SAFE_NO_PAD.decode(padded.trim_end_matches('=')).ok()?;
    let payload: Value = serde_json::from_slice(&bytes).ok()?;
    payload
        .get("https://api.openai.com/auth")?
        .get("chatgpt_account_id")?
        .as_str()
        .map(str::to_string)
}

fn pad_base64url(segment: &str) -> String {
    let remainder = segment.len() % 4;
    if remainder == 0 {
        segment.to_string()
    } else {
        format!("{segment}{}", "=".repeat(4 - remainder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.sig")
    }

    #[test]
    fn extracts_account_id() {
        let token = make_token(&serde_json::json!({
            "https://api.openai.com/auth": { "chatgpt_account_id": "acct_123" }
        }));
        assert_eq!(
            openai_chatgpt_account_id(&token),
            Some("acct_123".to_string())
        );
    }

    #[test]
    fn missing_claim_is_none() {
        let token = make_token(&serde_json::json!({"sub": "user_1"}));
        assert_eq!(openai_chatgpt_account_id(&token), None);
    }

    #[test]
    fn malformed_token_is_none() {
        assert_eq!(openai_chatgpt_account_id("not-a-jwt"), None);
    }
}
