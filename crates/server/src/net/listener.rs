use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use crate::context::ServerContext;

/// Bind `bind_addr` and accept connections until an accept error.
pub async fn run(ctx: Arc<ServerContext>, bind_addr: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!("Listening on {}", bind_addr);
    serve(listener, ctx).await
}

/// Accept loop over an already-bound listener. One task per connection.
pub async fn serve(listener: TcpListener, ctx: Arc<ServerContext>) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await.context("accept failed")?;
        tracing::debug!("Connection from {}", addr);

        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(e) = super::connection::handle(stream, addr, ctx).await {
                tracing::warn!("Connection from {} closed: {:#}", addr, e);
            }
        });
    }
}
