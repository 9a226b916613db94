//! Process-wide keep-alive.
//!
//! One task ticks on `heartbeat_interval` and offers a `KeepAlive` carrying
//! the current time in milliseconds to every session in Play. Offers never
//! wait: a session whose outbound queue is full simply misses that beat.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use slab_protocol::{ConnectionState, Direction, FieldValue};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Interval, MissedTickBehavior};

use crate::context::ServerContext;
use crate::session_registry::BroadcastReport;

/// Send one keep-alive round.
pub fn beat(ctx: &ServerContext, timestamp_ms: i64) -> Result<BroadcastReport> {
    let frame = ctx.codec.encode(
        Direction::ClientBound,
        ConnectionState::Play,
        "KeepAlive",
        &[FieldValue::Long(timestamp_ms)],
    )?;
    let report = ctx.sessions.broadcast_play(&frame);
    ctx.metrics.keepalives(report.sent, report.skipped);
    Ok(report)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// Fixed-cadence ticker: after a stall it resumes on the next whole period
/// instead of firing the missed ticks back to back.
fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Spawn the heartbeat task.
pub fn start(ctx: Arc<ServerContext>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = ctx.config.heartbeat_interval;
        let mut interval = ticker(period);
        // The first tick fires immediately; nobody is connected yet.
        interval.tick().await;

        tracing::info!("Heartbeat started (interval {:?})", period);

        loop {
            interval.tick().await;

            match beat(&ctx, now_ms()) {
                Ok(report) if report.skipped > 0 => {
                    tracing::debug!("Keep-alive sent to {}, skipped {}", report.sent, report.skipped);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Heartbeat stopped: {:#}", e);
                    return;
                }
            }

            let snapshot = ctx.metrics.snapshot(
                ctx.sessions.len() as u64,
                ctx.sessions.playing_count() as u64,
            );
            match serde_json::to_string(&snapshot) {
                Ok(json) => tracing::debug!(metrics = %json, "Tick"),
                Err(e) => tracing::warn!("Failed to serialize metrics: {}", e),
            }
        }
    })
}
