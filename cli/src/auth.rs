use std::sync::Arc;

use clap::{Subcommand, ValueEnum};
use cpe_common::cancellation::CancellationToken;
use cpe_oauth::{OAuthEngine, Provider};
use cpe_vault::CredentialVault;

use crate::error::CliError;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProviderArg {
    Anthropic,
    Openai,
}

impl From<ProviderArg> for Provider {
    fn from(value: ProviderArg) -> Self {
        match value {
            ProviderArg::Anthropic => Provider::Anthropic,
            ProviderArg::Openai => Provider::OpenAi,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Run the OAuth login flow for a provider.
    Login { provider: ProviderArg },
    /// Force a token refresh for a provider.
    Refresh { provider: ProviderArg },
    /// Delete the stored credential for a provider.
    Logout { provider: ProviderArg },
    /// List stored providers and their expiry windows.
    Status,
}

pub async fn run(command: AuthCommand) -> Result<(), CliError> {
    let vault = Arc::new(CredentialVault::open()?);

    match command {
        AuthCommand::Login { provider } => {
            let oauth = OAuthEngine::new(vault.clone());
            let credential = oauth
                .login(provider.into(), CancellationToken::new())
                .await?;
            println!("logged in as {}", credential.provider);
            Ok(())
        }
        AuthCommand::Refresh { provider } => {
            let oauth = OAuthEngine::new(vault.clone());
            let credential = oauth.refresh(provider.into()).await?;
            println!("refreshed {}", credential.provider);
            Ok(())
        }
        AuthCommand::Logout { provider } => {
            let provider: Provider = provider.into();
            vault.delete(provider.name())?;
            println!("removed credential for {provider}");
            Ok(())
        }
        AuthCommand::Status => {
            let now = now_unix();
            for provider in vault.list() {
                match vault.get(&provider) {
                    Ok(credential) if credential.expires == 0 => {
                        println!("{provider}: never expires");
                    }
                    Ok(credential) => {
                        let remaining = credential.expires - now;
                        println!("{provider}: expires in {remaining}s");
                    }
                    Err(err) => println!("{provider}: {err}"),
                }
            }
            Ok(())
        }
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
