//! One TCP connection: a reader loop that owns the [`Session`] and a writer
//! task that drains the connection's [`Transport`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use slab_protocol::FrameBuffer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::Instrument;

use crate::context::ServerContext;
use crate::session::{Flow, Session};
use crate::transport::{Outbound, Transport};

/// Serve one client until it disconnects, goes idle, breaks framing or a
/// handler closes the session. The session is deregistered exactly once on
/// the way out.
pub async fn handle(stream: TcpStream, peer: SocketAddr, ctx: Arc<ServerContext>) -> Result<()> {
    let id = ctx.sessions.next_session_id();
    let span = tracing::info_span!("conn", sid = id, %peer);
    serve(stream, peer, id, ctx).instrument(span).await
}

async fn serve(stream: TcpStream, peer: SocketAddr, id: u64, ctx: Arc<ServerContext>) -> Result<()> {
    stream.set_nodelay(true)?;
    let (read, write) = stream.into_split();

    let (transport, outbound) = Transport::channel(ctx.config.outbound_capacity);
    ctx.sessions.register(id, peer, transport.clone());
    ctx.metrics.connection_accepted();

    let mut writer = tokio::spawn(
        write_loop(write, outbound, ctx.config.write_timeout, Arc::clone(&ctx)).in_current_span(),
    );
    let mut session = Session::new(id, Arc::clone(&ctx), transport.clone());

    let result = tokio::select! {
        result = read_loop(read, &mut session, &ctx) => {
            // Stop heartbeats first, then let the writer flush what is queued.
            if ctx.sessions.deregister(id) {
                ctx.metrics.session_closed();
            }
            transport.close().await;
            drop(session);
            drop(transport);
            let flushed = joined(writer.await);
            result.and(flushed)
        }
        written = &mut writer => joined(written),
    };

    if ctx.sessions.deregister(id) {
        ctx.metrics.session_closed();
    }
    tracing::debug!("Connection closed");
    result
}

fn joined(result: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    result.map_err(|e| anyhow!("writer task failed: {e}"))?
}

async fn read_loop(mut read: OwnedReadHalf, session: &mut Session, ctx: &ServerContext) -> Result<()> {
    let mut frames = FrameBuffer::new();
    let idle = ctx.config.idle_timeout;

    loop {
        let n = match timeout(idle, read.read_buf(frames.read_buf())).await {
            Ok(read) => read.context("read failed")?,
            Err(_) => {
                tracing::info!("Idle for {:?}, disconnecting", session.idle_for());
                return Ok(());
            }
        };
        if n == 0 {
            tracing::debug!("Peer closed the connection");
            return Ok(());
        }

        // Once framing breaks there is no way to find the next frame.
        let batch = frames.drain().context("unrecoverable framing error")?;
        for frame in batch {
            ctx.metrics.frame_received();
            if session.handle_frame(&frame).await == Flow::Close {
                return Ok(());
            }
        }
    }
}

async fn write_loop(
    mut write: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Outbound>,
    write_timeout: Duration,
    ctx: Arc<ServerContext>,
) -> Result<()> {
    while let Some(message) = outbound.recv().await {
        match message {
            Outbound::Frame(frame) => {
                timeout(write_timeout, write.write_all(&frame))
                    .await
                    .map_err(|_| anyhow!("write timed out after {write_timeout:?}"))?
                    .context("write failed")?;
                ctx.metrics.frame_sent();
            }
            Outbound::Close => break,
        }
    }
    let _ = write.shutdown().await;
    Ok(())
}
