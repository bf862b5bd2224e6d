//! Server lifecycle: bind, serve, drain.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::{net::TcpListener, signal, sync::oneshot, task::JoinHandle};
use tracing::info;

use crate::{app::build_app, state::AppState};

/// A running HTTP server. Dropping it also begins shutdown, but only
/// [`Server::stop`] waits for the drain and closes the store.
pub struct Server {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    state: AppState,
}

impl Server {
    /// Binds `addr` and starts serving. Returns once the listener is bound,
    /// so connections are accepted as soon as this resolves.
    pub async fn start(state: AppState, addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind {addr}"))?;
        let local_addr = listener.local_addr().context("read bound address")?;

        let app = build_app(state.clone());
        let (shutdown, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
        });

        info!("listening on {}", local_addr);
        Ok(Self {
            local_addr,
            shutdown,
            task,
            state,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections, waits for in-flight requests to finish,
    /// then releases the store.
    pub async fn stop(self) -> anyhow::Result<()> {
        info!("closing server");
        let _ = self.shutdown.send(());
        self.task
            .await
            .context("server task panicked")?
            .context("server error")?;
        self.state.close().await;
        info!("server drained");
        Ok(())
    }
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM).
pub async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("install SIGTERM handler")?;
        tokio::select! {
            res = ctrl_c => {
                res.context("listen for Ctrl+C")?;
                info!("received Ctrl+C, initiating shutdown");
            }
            _ = terminate.recv() => {
                info!("received SIGTERM, initiating shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.context("listen for Ctrl+C")?;
        info!("received Ctrl+C, initiating shutdown");
    }

    Ok(())
}
