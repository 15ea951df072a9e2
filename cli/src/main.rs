//! `cpe` - a CLI programming assistant: OAuth-backed provider credentials,
//! a branching conversation store, and an MCP tool runtime.

#[tokio::main]
async fn main() {
    if let Err(err) = cpe_cli::run().await {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}
