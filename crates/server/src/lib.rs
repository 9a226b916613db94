//! Flat-world Minecraft 1.12.2 server: connection sessions, the session
//! registry and the keep-alive heartbeat, on top of `slab-protocol`.

pub mod config;
pub mod context;
pub mod heartbeat;
pub mod metrics;
pub mod net;
pub mod session;
pub mod session_registry;
pub mod status;
pub mod transport;

pub use config::{ServerConfig, SpawnPoint, WorldConfig};
pub use context::ServerContext;
