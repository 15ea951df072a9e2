//! Cooperative cancellation token for the OAuth login flow: aborting it
//! stops the paste-code prompt or the loopback listener mid-wait.
//!
//! Re-exported so downstream crates depend on `cpe_common::cancellation`
//! rather than pinning their own `tokio-util` version.

pub use tokio_util::sync::CancellationToken;
