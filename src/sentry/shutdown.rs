//! Cooperative shutdown: a shared flag and the signal task that sets it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared "stop after the current step" flag.
///
/// Clones observe the same flag. Once requested it stays set.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Spawn a task that sets `flag` on SIGINT or SIGTERM.
///
/// Only sets the flag; the loop notices it on its next check and runs
/// cleanup itself.
pub fn install_signal_handler(flag: ShutdownFlag) -> std::io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            #[cfg(unix)]
            let signal = tokio::select! {
                result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
                _ = terminate.recv() => Ok("SIGTERM"),
            };

            #[cfg(not(unix))]
            let signal = tokio::signal::ctrl_c().await.map(|_| "SIGINT");

            match signal {
                Ok(name) => {
                    info!("Shutdown requested ({})", name);
                    flag.request();
                }
                Err(e) => {
                    tracing::error!("Failed to listen for shutdown signals: {}", e);
                    break;
                }
            }
        }
    }))
}
