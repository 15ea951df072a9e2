use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cpe_oauth::{OAuthEngine, Provider};
use cpe_transport::{AuthTransport, BaseTransport};
use cpe_vault::{Credential, CredentialVault};

/// A stand-in for the JSON-patch/body-mutation middleware the Auth
/// Transport must sit above. Records whether it ran and forwards to a
/// plain reqwest client.
struct RecordingPatchLayer {
    patched: Arc<AtomicUsize>,
    inner: reqwest::Client,
}

#[async_trait]
impl BaseTransport for RecordingPatchLayer {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.patched.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(request).await
    }
}

fn vault_with_fresh_credential(dir: &std::path::Path, now: i64) -> Arc<CredentialVault> {
    let vault = CredentialVault::open_at(dir.join("auth.json")).expect("open vault");
    vault
        .save(Credential::new("anthropic", "access-token", "refresh-token", now + 3600))
        .expect("seed credential");
    Arc::new(vault)
}

#[tokio::test]
async fn patch_layer_runs_inside_auth_layer() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let now = 1_700_000_000;
    let vault = vault_with_fresh_credential(dir.path(), now);
    let oauth = Arc::new(OAuthEngine::new(vault.clone()));

    let patched = Arc::new(AtomicUsize::new(0));
    let patch_layer = Arc::new(RecordingPatchLayer {
        patched: patched.clone(),
        inner: reqwest::Client::new(),
    });

    let transport = AuthTransport::new(Provider::Anthropic, vault, oauth, Some(patch_layer));

    let request = reqwest::Client::new()
        .get(server.uri())
        .build()
        .expect("build request");
    let response = transport.execute(request).await.expect("execute");

    assert_eq!(response.status(), 200);
    assert_eq!(patched.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn injects_bearer_and_strips_api_key() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::header(
            "authorization",
            "Bearer access-token",
        ))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let now = 1_700_000_000;
    let vault = vault_with_fresh_credential(dir.path(), now);
    let oauth = Arc::new(OAuthEngine::new(vault.clone()));
    let transport = AuthTransport::new(Provider::Anthropic, vault, oauth, None);

    let request = reqwest::Client::new()
        .get(server.uri())
        .header("x-api-key", "should-be-removed")
        .build()
        .expect("build request");

    let response = transport.execute(request).await.expect("execute");
    assert_eq!(response.status(), 200);
}
