//! Process-wide stop signal.
//!
//! One [`ShutdownToken`] is created at startup and handed to every session.
//! Each session derives a child token, so stopping one session leaves the
//! others running while a process shutdown reaches all of them.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A flag that flips from "running" to "stop requested" exactly once.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    inner: CancellationToken,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Requests a stop. Further calls have no effect.
    pub fn request(&self) {
        self.inner.cancel();
    }

    /// Completes once a stop has been requested.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await;
    }

    /// A token that is requested whenever `self` is, and can also be
    /// requested on its own.
    pub fn child(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
        }
    }
}

/// Listens for SIGINT/SIGTERM for the rest of the process.
///
/// The first signal requests `token`. A second signal while the stop is
/// still in progress exits the process with status 1.
pub fn spawn_signal_listener(token: ShutdownToken) -> JoinHandle<()> {
    info!("Starting signal handler task");
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut terminate =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(stream) => Some(stream),
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    None
                }
            };

        loop {
            #[cfg(unix)]
            let terminated = recv_terminate(&mut terminate);
            #[cfg(not(unix))]
            let terminated = std::future::pending::<()>();

            let signal = tokio::select! {
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => "SIGINT",
                    Err(e) => {
                        error!(error = %e, "failed to listen for Ctrl+C");
                        return;
                    }
                },
                () = terminated => "SIGTERM",
            };

            if token.requested() {
                warn!(signal, "second signal received, exiting immediately");
                std::process::exit(1);
            }
            info!(signal, "received signal, initiating graceful shutdown");
            token.request();
        }
    })
}

#[cfg(unix)]
async fn recv_terminate(stream: &mut Option<tokio::signal::unix::Signal>) {
    match stream {
        Some(stream) => {
            if stream.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}
