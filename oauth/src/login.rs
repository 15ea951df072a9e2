//! The two login flows: Anthropic's paste-the-code flow and OpenAI's
//! localhost loopback flow.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::Query;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use cpe_common::cancellation::CancellationToken;
use tokio::sync::oneshot;

use crate::browser::open_browser;
use crate::error::OAuthError;
use crate::provider::ProviderEndpoints;
use crate::token::{build_authorization_url, FlowState};

const OPENAI_LOOPBACK_PORT: u16 = 1455;
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Outcome of the anthropic paste-code flow: the pasted `code#state` pair.
pub struct PastedCode {
    pub code: String,
    pub state: String,
}

/// Print the authorization URL, attempt to open a browser, and read a
/// single `code#state` line from stdin. Honors cancellation while waiting
/// on stdin by racing the blocking read against the cancellation signal.
pub async fn run_anthropic_paste_flow(
    endpoints: &ProviderEndpoints,
    flow: &FlowState,
    cancel: CancellationToken,
) -> Result<PastedCode, OAuthError> {
    let url = build_authorization_url(endpoints, flow);
    println!("Open this URL to authorize:\n{url}");
    open_browser(&url);
    println!("Paste the code#state value here:");

    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    });

    tokio::select! {
        result = read => {
            let line = result.map_err(|_| OAuthError::Interrupted)??;
            parse_pasted_code(&line)
        }
        () = cancel.cancelled() => Err(OAuthError::Interrupted),
    }
}

fn parse_pasted_code(line: &str) -> Result<PastedCode, OAuthError> {
    let trimmed = line.trim();
    match trimmed.split_once('#') {
        Some((code, state)) => Ok(PastedCode {
            code: code.to_string(),
            state: state.to_string(),
        }),
        None => Err(OAuthError::TokenExchangeFailed(
            "pasted value did not contain a '#'-separated state".to_string(),
        )),
    }
}

#[derive(Clone)]
enum CallbackOutcome {
    Success { code: String, state: String },
    Error { code: String, description: Option<String> },
}

impl CallbackOutcome {
    fn from_params(params: &HashMap<String, String>) -> Self {
        if let Some(error) = params.get("error") {
            return CallbackOutcome::Error {
                code: error.clone(),
                description: params.get("error_description").cloned(),
            };
        }
        CallbackOutcome::Success {
            code: params.get("code").cloned().unwrap_or_default(),
            state: params.get("state").cloned().unwrap_or_default(),
        }
    }

    fn response_html(&self) -> String {
        match self {
            CallbackOutcome::Success { .. } => {
                "<html><body>Login complete. You may close this window.</body></html>".to_string()
            }
            CallbackOutcome::Error { code, description } => format!(
                "<html><body>Login failed: {}{}</body></html>",
                html_escape(code),
                description
                    .as_deref()
                    .map(|d| format!(" ({})", html_escape(d)))
                    .unwrap_or_default()
            ),
        }
    }

    fn into_result(self, expected_state: &str) -> Result<String, OAuthError> {
        match self {
            CallbackOutcome::Error { code, description } => {
                Err(OAuthError::OAuthError { code, description })
            }
            CallbackOutcome::Success { code, state } => {
                if state != expected_state {
                    return Err(OAuthError::StateMismatch {
                        expected: expected_state.to_string(),
                        actual: state,
                    });
                }
                Ok(code)
            }
        }
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Run the OpenAI loopback callback server on a fixed port, accept exactly
/// one `/auth/callback` request, and return the authorization code once the
/// state has been verified.
pub async fn run_openai_loopback_flow(
    expected_state: &str,
    cancel: CancellationToken,
) -> Result<String, OAuthError> {
    let (result_tx, result_rx) = oneshot::channel::<CallbackOutcome>();
    let result_tx = Arc::new(Mutex::new(Some(result_tx)));
    let shutdown = CancellationToken::new();

    let handler_tx = result_tx.clone();
    let handler_shutdown = shutdown.clone();
    let app = Router::new().route(
        "/auth/callback",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let result_tx = handler_tx.clone();
            let shutdown = handler_shutdown.clone();
            async move {
                let outcome = CallbackOutcome::from_params(&params);
                let html = outcome.response_html();
                if let Some(tx) = result_tx.lock().unwrap_or_else(|e| e.into_inner()).take() {
                    let _ = tx.send(outcome);
                }
                tokio::spawn(async move {
                    tokio::time::sleep(SHUTDOWN_GRACE).await;
                    shutdown.cancel();
                });
                Html(html)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", OPENAI_LOOPBACK_PORT)).await?;
    let shutdown_signal = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_signal.cancelled().await });

    tokio::select! {
        result = server => {
            result?;
        }
        () = cancel.cancelled() => {
            shutdown.cancel();
            return Err(OAuthError::Interrupted);
        }
    }

    match result_rx.await {
        Ok(outcome) => outcome.into_result(expected_state),
        Err(_) => Err(OAuthError::Interrupted),
    }
}
