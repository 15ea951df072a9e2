//! Best-effort OS browser launch. Failure is never fatal to the login flow:
//! the URL is always printed so the user can copy it by hand.

use std::process::Command;

pub fn open_browser(url: &str) {
    let result = spawn_opener(url);
    if let Err(err) = result {
        tracing::debug!(%err, "failed to spawn browser opener");
    }
}

#[cfg(target_os = "macos")]
fn spawn_opener(url: &str) -> std::io::Result<()> {
    Command::new("open").arg(url).spawn().map(|_| ())
}

#[cfg(target_os = "windows")]
fn spawn_opener(url: &str) -> std::io::Result<()> {
    Command::new("rundll32")
        .args(["url.dll,FileProtocolHandler", url])
        .spawn()
        .map(|_| ())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn spawn_opener(url: &str) -> std::io::Result<()> {
    Command::new("xdg-open").arg(url).spawn().map(|_| ())
}
