//! Process bootstrap helpers: port selection and browser launch

use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::process::ExitStatus;
use tokio::net::TcpListener;

/// Bind the first free port in `start..start + limit`
pub async fn bind_first_free(host: &str, start: u16, limit: u16) -> Result<TcpListener> {
    let mut port = start;
    for _ in 0..limit {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                if port != start {
                    tracing::info!("Port {} busy, using {}", start, port);
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!("Port {} in use", port);
            }
            Err(e) => return Err(e.into()),
        }
        port = match port.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }
    Err(Error::Server(format!(
        "No free port on {} between {} and {}",
        host,
        start,
        start.saturating_add(limit.saturating_sub(1))
    )))
}

/// URL a local browser should open for a listener bound at `addr`
pub fn browser_url(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() || addr.ip().is_loopback() {
        format!("http://localhost:{}", addr.port())
    } else {
        format!("http://{}", addr)
    }
}

/// Ask the desktop to open `url`. Failures are logged, never fatal.
pub fn open_browser(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };

    match command.arg(url).spawn() {
        Ok(child) => {
            tracing::info!("Opening browser: {}", url);
            let _ = reap(child);
        }
        Err(e) => tracing::warn!("Could not open browser ({}); visit {} manually", e, url),
    }
}

/// Wait for a launcher process off the async runtime so it does not linger
/// as a zombie
fn reap(mut child: std::process::Child) -> std::thread::JoinHandle<Option<ExitStatus>> {
    std::thread::spawn(move || match child.wait() {
        Ok(status) => {
            if !status.success() {
                tracing::warn!("Browser launcher exited with {}", status);
            }
            Some(status)
        }
        Err(e) => {
            tracing::debug!("Failed to wait for browser launcher: {}", e);
            None
        }
    })
}
