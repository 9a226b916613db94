//! Server configuration. Everything the session handlers put on the wire
//! that is not dictated by the protocol comes from here.

use std::time::Duration;

use slab_protocol::world::{BlockState, ChunkConfig};
use slab_protocol::{PROTOCOL_VERSION, VERSION_NAME};

/// Where a joining player is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub spawn: SpawnPoint,
    /// Columns sent on join cover a `2 * view_radius` square around the origin.
    pub view_radius: u32,
    pub chunk: ChunkConfig,
    pub game_mode: u8,
    pub dimension: i32,
    pub difficulty: u8,
    pub level_type: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let chunk = ChunkConfig {
            bits_per_block: 14,
            block_state: BlockState::STONE,
            sections: 4,
            light: 0xFF,
        };
        Self {
            // One block above the top of the stone.
            spawn: SpawnPoint {
                x: 0.0,
                y: f64::from(chunk.sections) * 16.0 + 1.0,
                z: 0.0,
                yaw: 0.0,
                pitch: 0.0,
            },
            view_radius: 1,
            chunk,
            game_mode: 1,
            dimension: 0,
            difficulty: 0,
            level_type: "flat".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_players: usize,
    pub motd: String,
    pub version_name: String,
    pub protocol_version: i32,
    pub heartbeat_interval: Duration,
    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout: Duration,
    pub write_timeout: Duration,
    /// Frames queued per connection before senders wait (or skip, for the
    /// heartbeat).
    pub outbound_capacity: usize,
    pub world: WorldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 25565,
            max_players: 20,
            motd: "A slab server".into(),
            version_name: VERSION_NAME.into(),
            protocol_version: PROTOCOL_VERSION,
            heartbeat_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
            outbound_capacity: 64,
            world: WorldConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
