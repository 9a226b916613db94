//! Wire engine for the Minecraft 1.12.2 (protocol 340) protocol.
//!
//! The crate knows how bytes are framed and how packets are shaped, but not
//! what any packet means: packet schemas come from an injected
//! [`PacketRegistry`] and the server decides what to do with them.

pub mod codec;
pub mod error;
pub mod frame;
pub mod primitive;
pub mod registry;
pub mod types;
pub mod world;

pub use codec::{Decoded, DecodedPacket, PacketCodec, PayloadSource};
pub use error::{ProtocolError, Result};
pub use frame::{FrameBuffer, RawFrame, split_frames};
pub use registry::{PacketDescriptor, PacketRegistry, RegistryConfig, RegistryError};
pub use types::{ConnectionState, Direction, FieldType, FieldValue};

/// Protocol number spoken by 1.12.2 clients.
pub const PROTOCOL_VERSION: i32 = 340;
/// Version string reported in the status response.
pub const VERSION_NAME: &str = "1.12.2";
