//! Listener lifecycle.

use crate::routes::{create_router, AppState};
use std::io;
use tokio::net::TcpListener;

/// Binds the configured address and serves until Ctrl+C.
pub async fn run(state: AppState) -> io::Result<()> {
    let addr = state.config.listen_addr();
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state).await
}

/// Serves on an already-bound listener until Ctrl+C.
pub async fn serve(listener: TcpListener, state: AppState) -> io::Result<()> {
    let local = listener.local_addr()?;
    tracing::info!(
        port = local.port(),
        addr = %local,
        root = %state.config.main_path.display(),
        "Git HTTP(S) Server listening on port {}",
        local.port()
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
