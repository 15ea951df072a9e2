//! Agent-Loop Hooks: the narrow surface a driver needs to operate the
//! Conversation Store, MCP Client, and authenticated HTTP transport without
//! reaching into their internals.

mod error;
mod patch;

pub use error::CoreError;
pub use patch::PatchTransport;

use std::sync::Arc;

use cpe_common::UnifiedConfig;
use cpe_dialog::{DialogStore, Message, SaveDialog};
use cpe_mcp::{CallResult, McpClient, Session, Tool};
use cpe_oauth::{OAuthEngine, Provider};
use cpe_transport::AuthTransport;
use cpe_vault::CredentialVault;

/// Bundles the three subsystems behind the single contract a driver
/// consumes: dialog read/write, MCP connect/tools/call, and an
/// authenticated HTTP client per provider.
pub struct Hooks {
    dialog: Arc<DialogStore>,
    mcp: Arc<McpClient>,
    vault: Arc<CredentialVault>,
    oauth: Arc<OAuthEngine>,
    config: UnifiedConfig,
}

impl Hooks {
    pub fn new(
        dialog: Arc<DialogStore>,
        vault: Arc<CredentialVault>,
        oauth: Arc<OAuthEngine>,
        config: UnifiedConfig,
    ) -> Self {
        let mcp = Arc::new(McpClient::from_config(&config));
        Self {
            dialog,
            mcp,
            vault,
            oauth,
            config,
        }
    }

    // -- read --

    pub fn get_dialog_for_message(&self, id: &str) -> Result<Vec<Message>, CoreError> {
        Ok(self.dialog.get_dialog_for_message(id)?)
    }

    pub fn list_messages(&self, offset: i64, ascending: bool) -> Result<Vec<Message>, CoreError> {
        Ok(self.dialog.list_messages(offset, ascending)?)
    }

    pub fn get_messages(&self, ids: &[String]) -> Result<Vec<Message>, CoreError> {
        Ok(self.dialog.get_messages(ids)?)
    }

    // -- write --

    pub fn save_dialog<I>(&self, messages: I) -> SaveDialog<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Message>,
    {
        self.dialog.save_dialog(messages)
    }

    // -- mcp --

    pub fn list_servers(&self) -> Vec<&str> {
        self.mcp.list_servers()
    }

    pub async fn connect(&self, server: &str) -> Result<Session, CoreError> {
        Ok(self.mcp.connect(server).await?)
    }

    pub async fn tools(&self, server: &str, session: &Session) -> Result<Vec<Tool>, CoreError> {
        Ok(self.mcp.tools(server, session).await?)
    }

    pub async fn call_tool(
        &self,
        session: &Session,
        name: &str,
        args: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallResult, CoreError> {
        Ok(session.call_tool(name, args).await?)
    }

    // -- auth --

    /// An HTTP client with the Auth Transport applied for `provider`, with
    /// the named model's `patchRequest` (if any) composed beneath it.
    pub fn http_client(&self, provider: Provider, model: Option<&str>) -> Result<AuthTransport, CoreError> {
        let patch = match model {
            Some(name) => {
                let model_config = self
                    .config
                    .models
                    .get(name)
                    .ok_or_else(|| CoreError::UnknownModel(name.to_string()))?;
                model_config.patch_request.clone()
            }
            None => None,
        };

        let base: Arc<dyn cpe_transport::BaseTransport> =
            Arc::new(PatchTransport::new(patch, Arc::new(reqwest::Client::new())));

        Ok(AuthTransport::new(
            provider,
            self.vault.clone(),
            self.oauth.clone(),
            Some(base),
        ))
    }

    pub fn config(&self) -> &UnifiedConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hooks() -> Hooks {
        let dialog = Arc::new(DialogStore::open_in_memory().expect("open"));
        let path = tempfile::NamedTempFile::new()
            .expect("tempfile")
            .path()
            .to_path_buf();
        let vault = Arc::new(CredentialVault::open_at(path).expect("open vault"));
        let oauth = Arc::new(OAuthEngine::new(vault.clone()));
        Hooks::new(dialog, vault, oauth, UnifiedConfig::default())
    }

    #[test]
    fn unknown_model_is_rejected() {
        let hooks = hooks();
        let result = hooks.http_client(Provider::Anthropic, Some("nonexistent"));
        assert!(matches!(result, Err(CoreError::UnknownModel(_))));
    }

    #[test]
    fn no_model_means_no_patch() {
        let hooks = hooks();
        let result = hooks.http_client(Provider::Anthropic, None);
        assert!(result.is_ok());
    }

    #[test]
    fn list_servers_reflects_empty_config() {
        let hooks = hooks();
        assert!(hooks.list_servers().is_empty());
    }
}
