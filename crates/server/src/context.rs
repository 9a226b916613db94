use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use slab_protocol::world::ChunkEncoder;
use slab_protocol::world::position::MAX_RADIUS;
use slab_protocol::{PacketCodec, PacketRegistry};

use crate::config::ServerConfig;
use crate::metrics::Metrics;
use crate::session_registry::SessionRegistry;

/// Protocol 340 packet table shipped with the server.
pub const DEFAULT_REGISTRY: &str = include_str!("../data/packets.json");

/// Everything a connection needs that outlives it. Built once at startup and
/// shared behind an `Arc`.
pub struct ServerContext {
    pub config: ServerConfig,
    pub codec: PacketCodec,
    pub chunks: ChunkEncoder,
    pub sessions: SessionRegistry,
    pub metrics: Metrics,
}

impl ServerContext {
    pub fn new(config: ServerConfig, registry: PacketRegistry) -> Result<Self> {
        ensure!(
            config.world.view_radius <= MAX_RADIUS,
            "view radius {} exceeds {}",
            config.world.view_radius,
            MAX_RADIUS
        );
        let chunks = ChunkEncoder::new(config.world.chunk).context("invalid chunk settings")?;
        Ok(Self {
            codec: PacketCodec::new(Arc::new(registry)),
            chunks,
            sessions: SessionRegistry::new(),
            metrics: Metrics::new(),
            config,
        })
    }

    /// Context using the shipped packet table.
    pub fn with_default_registry(config: ServerConfig) -> Result<Self> {
        let registry =
            PacketRegistry::from_json(DEFAULT_REGISTRY).context("shipped packet table")?;
        Self::new(config, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slab_protocol::{ConnectionState, Direction};

    #[test]
    fn oversized_view_radius_is_rejected() {
        let mut config = ServerConfig::default();
        config.world.view_radius = MAX_RADIUS + 1;
        assert!(ServerContext::with_default_registry(config).is_err());

        let mut config = ServerConfig::default();
        config.world.view_radius = MAX_RADIUS;
        assert!(ServerContext::with_default_registry(config).is_ok());
    }

    #[test]
    fn shipped_table_has_every_packet_the_server_sends() {
        let ctx = ServerContext::with_default_registry(ServerConfig::default()).unwrap();
        let registry = ctx.codec.registry();
        for name in [
            "StatusResponse",
            "Pong",
            "LoginDisconnect",
            "LoginSuccess",
            "JoinGame",
            "PlayerPositionAndLook",
            "ChunkData",
            "KeepAlive",
        ] {
            assert!(
                registry.resolve_name(Direction::ClientBound, name).is_some(),
                "{name} missing"
            );
        }
        let handlers = registry
            .iter()
            .filter(|d| d.direction == Direction::ServerBound && d.handler.is_some())
            .count();
        assert_eq!(handlers, 4);
        assert!(
            registry
                .resolve(Direction::ServerBound, ConnectionState::Play, 0x0e)
                .is_some()
        );
    }
}
