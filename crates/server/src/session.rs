//! Per-connection protocol state machine.
//!
//! Handshaking -> Status (request, ping, close) | Login -> Play
//!
//! A [`Session`] lives inside its connection's reader task. It decodes each
//! frame against the shared registry and hands known packets to the handler
//! the registry names. Handlers are the only code that changes the session
//! state or writes to the transport.

use std::sync::Arc;

use anyhow::{Context, Result};
use slab_protocol::world::ChunkPos;
use slab_protocol::{
    ConnectionState, Decoded, DecodedPacket, Direction, FieldType, FieldValue, ProtocolError,
    RawFrame,
};
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::context::ServerContext;
use crate::session_registry::PlayerInfo;
use crate::status::StatusDocument;
use crate::transport::Transport;

/// Handlers a registry entry can name by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Handshake,
    StatusRequest,
    Ping,
    LoginStart,
}

impl TryFrom<u8> for Handler {
    type Error = u8;

    fn try_from(id: u8) -> std::result::Result<Self, u8> {
        match id {
            0 => Ok(Self::Handshake),
            1 => Ok(Self::StatusRequest),
            2 => Ok(Self::Ping),
            3 => Ok(Self::LoginStart),
            other => Err(other),
        }
    }
}

/// What the connection loop should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Flush queued output and end the connection.
    Close,
}

/// What the client declared in its handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeInfo {
    pub protocol_version: i32,
    pub address: String,
    pub port: u16,
    pub next_state: i32,
}

pub struct Session {
    id: u64,
    state: ConnectionState,
    handshake: Option<HandshakeInfo>,
    player: Option<PlayerInfo>,
    /// When the last frame arrived.
    last_activity: Instant,
    ctx: Arc<ServerContext>,
    transport: Transport,
}

impl Session {
    pub fn new(id: u64, ctx: Arc<ServerContext>, transport: Transport) -> Self {
        Self {
            id,
            state: ConnectionState::Handshaking,
            handshake: None,
            player: None,
            last_activity: Instant::now(),
            ctx,
            transport,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn handshake(&self) -> Option<&HandshakeInfo> {
        self.handshake.as_ref()
    }

    pub fn player(&self) -> Option<&PlayerInfo> {
        self.player.as_ref()
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Decode and act on one frame.
    ///
    /// Malformed and unknown packets are dropped and the session carries on
    /// in the same state. A handler error closes the session.
    pub async fn handle_frame(&mut self, frame: &RawFrame) -> Flow {
        self.last_activity = Instant::now();
        let ctx = Arc::clone(&self.ctx);
        let packet = match ctx.codec.decode(frame, Direction::ServerBound, self.state) {
            Ok(Decoded::Packet(packet)) => packet,
            Ok(Decoded::Unknown { id }) => {
                tracing::debug!(state = ?self.state, "Ignoring unknown packet 0x{id:02x}");
                ctx.metrics.packet_dropped();
                return Flow::Continue;
            }
            Err(e) => {
                tracing::debug!(state = ?self.state, "Dropping malformed packet: {e}");
                ctx.metrics.packet_dropped();
                return Flow::Continue;
            }
        };

        let Some(handler_id) = packet.descriptor.handler else {
            tracing::trace!(packet = packet.name(), "No handler, ignoring");
            return Flow::Continue;
        };
        let handler = match Handler::try_from(handler_id) {
            Ok(handler) => handler,
            Err(id) => {
                tracing::warn!(packet = packet.name(), "Registry names unknown handler {id}");
                return Flow::Continue;
            }
        };

        match self.dispatch(handler, &packet).await {
            Ok(flow) => flow,
            Err(e) => {
                let programming = e
                    .downcast_ref::<ProtocolError>()
                    .is_some_and(ProtocolError::is_programming_error);
                if programming {
                    tracing::error!("{handler:?} handler failed: {e:#}");
                } else {
                    tracing::debug!("{handler:?} handler stopped: {e:#}");
                }
                Flow::Close
            }
        }
    }

    async fn dispatch(&mut self, handler: Handler, packet: &DecodedPacket<'_>) -> Result<Flow> {
        match handler {
            Handler::Handshake => self.on_handshake(packet),
            Handler::StatusRequest => self.on_status_request().await,
            Handler::Ping => self.on_ping(packet).await,
            Handler::LoginStart => self.on_login_start(packet).await,
        }
    }

    // ── Handshaking ─────────────────────────────────────────────────────

    fn on_handshake(&mut self, packet: &DecodedPacket<'_>) -> Result<Flow> {
        let protocol_version = int_field(packet, 0, FieldType::VarInt)?;
        let address = str_field(packet, 1, FieldType::String)?.to_owned();
        let port = u16::try_from(int_field(packet, 2, FieldType::UnsignedShort)?)
            .map_err(|_| mismatch(packet, 2, FieldType::UnsignedShort))?;
        let next_state = int_field(packet, 3, FieldType::VarInt)?;

        if protocol_version != self.ctx.config.protocol_version {
            tracing::warn!(
                client = protocol_version,
                server = self.ctx.config.protocol_version,
                "Protocol version mismatch"
            );
        }

        self.state = if next_state == 1 {
            ConnectionState::Status
        } else {
            ConnectionState::Login
        };
        tracing::info!(
            "Handshake: protocol={}, host={}:{}, next={:?}",
            protocol_version,
            address,
            port,
            self.state
        );

        self.handshake = Some(HandshakeInfo {
            protocol_version,
            address,
            port,
            next_state,
        });
        Ok(Flow::Continue)
    }

    // ── Status ──────────────────────────────────────────────────────────

    async fn on_status_request(&mut self) -> Result<Flow> {
        let json = StatusDocument::from_context(&self.ctx)
            .to_json()
            .context("encoding status document")?;
        self.send("StatusResponse", &[FieldValue::String(json)])
            .await?;
        Ok(Flow::Continue)
    }

    async fn on_ping(&mut self, packet: &DecodedPacket<'_>) -> Result<Flow> {
        let payload = long_field(packet, 0)?;
        self.send("Pong", &[FieldValue::Long(payload)]).await?;
        Ok(Flow::Close)
    }

    // ── Login ───────────────────────────────────────────────────────────

    async fn on_login_start(&mut self, packet: &DecodedPacket<'_>) -> Result<Flow> {
        let name = str_field(packet, 0, FieldType::String)?.to_owned();
        let ctx = Arc::clone(&self.ctx);

        if ctx.sessions.playing_count() >= ctx.config.max_players {
            tracing::info!("Refusing {}: server full", name);
            self.send("LoginDisconnect", &[FieldValue::String(chat_text("Server is full"))])
                .await?;
            return Ok(Flow::Close);
        }

        let uuid = offline_uuid(&name);
        let player = PlayerInfo {
            entity_id: ctx.sessions.allocate_entity_id(),
            uuid,
            name: name.clone(),
        };

        self.send(
            "LoginSuccess",
            &[
                FieldValue::String(uuid.hyphenated().to_string()),
                FieldValue::String(name.clone()),
            ],
        )
        .await?;
        self.state = ConnectionState::Play;

        let world = &ctx.config.world;
        self.send(
            "JoinGame",
            &[
                FieldValue::Int(player.entity_id),
                FieldValue::UnsignedByte(world.game_mode),
                FieldValue::Int(world.dimension),
                FieldValue::UnsignedByte(world.difficulty),
                FieldValue::UnsignedByte(u8::try_from(ctx.config.max_players).unwrap_or(u8::MAX)),
                FieldValue::String(world.level_type.clone()),
                // Reduced debug info.
                FieldValue::Boolean(false),
            ],
        )
        .await?;

        let spawn = world.spawn;
        self.send(
            "PlayerPositionAndLook",
            &[
                FieldValue::Double(spawn.x),
                FieldValue::Double(spawn.y),
                FieldValue::Double(spawn.z),
                FieldValue::Float(spawn.yaw),
                FieldValue::Float(spawn.pitch),
                // All absolute.
                FieldValue::Byte(0),
                // Teleport id.
                FieldValue::VarInt(1),
            ],
        )
        .await?;

        for pos in ChunkPos::around_origin(world.view_radius) {
            let column = ctx.chunks.column(pos);
            let frame = ctx.codec.encode_with(
                Direction::ClientBound,
                self.state,
                "ChunkData",
                &column,
            )?;
            self.transport.send(frame).await?;
        }

        // Only now does the heartbeat start reaching this session.
        if !ctx.sessions.admit(self.id, player.clone(), ctx.config.max_players) {
            tracing::info!("Refusing {}: server filled up during login", name);
            self.send("Disconnect", &[FieldValue::String(chat_text("Server is full"))])
                .await?;
            return Ok(Flow::Close);
        }

        tracing::info!(
            "Player joined: {} (uuid: {}, entity: {})",
            name,
            uuid,
            player.entity_id
        );
        self.player = Some(player);
        Ok(Flow::Continue)
    }

    async fn send(&self, name: &str, fields: &[FieldValue]) -> Result<()> {
        let frame = self
            .ctx
            .codec
            .encode(Direction::ClientBound, self.state, name, fields)?;
        self.transport.send(frame).await
    }
}

/// Offline-mode identity: a name-based UUID, stable across logins.
pub fn offline_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_URL, format!("OfflinePlayer:{}", name).as_bytes())
}

fn chat_text(text: &str) -> String {
    serde_json::json!({ "text": text }).to_string()
}

fn mismatch(packet: &DecodedPacket<'_>, index: usize, expected: FieldType) -> ProtocolError {
    ProtocolError::FieldTypeMismatch {
        name: packet.name().to_owned(),
        index,
        expected,
    }
}

fn int_field(packet: &DecodedPacket<'_>, index: usize, expected: FieldType) -> Result<i32> {
    packet
        .field(index)
        .and_then(FieldValue::as_i32)
        .ok_or_else(|| mismatch(packet, index, expected).into())
}

fn long_field(packet: &DecodedPacket<'_>, index: usize) -> Result<i64> {
    packet
        .field(index)
        .and_then(FieldValue::as_i64)
        .ok_or_else(|| mismatch(packet, index, FieldType::Long).into())
}

fn str_field<'p>(
    packet: &'p DecodedPacket<'_>,
    index: usize,
    expected: FieldType,
) -> Result<&'p str> {
    packet
        .field(index)
        .and_then(FieldValue::as_str)
        .ok_or_else(|| mismatch(packet, index, expected).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_ids_map_to_a_closed_set() {
        assert_eq!(Handler::try_from(0), Ok(Handler::Handshake));
        assert_eq!(Handler::try_from(1), Ok(Handler::StatusRequest));
        assert_eq!(Handler::try_from(2), Ok(Handler::Ping));
        assert_eq!(Handler::try_from(3), Ok(Handler::LoginStart));
        assert_eq!(Handler::try_from(4), Err(4));
    }

    #[test]
    fn offline_uuid_is_stable_and_name_based() {
        assert_eq!(offline_uuid("Notch"), offline_uuid("Notch"));
        assert_ne!(offline_uuid("Notch"), offline_uuid("notch"));
        assert_eq!(offline_uuid("Notch").get_version_num(), 3);
    }

    #[test]
    fn chat_text_is_a_json_component() {
        assert_eq!(chat_text("bye"), r#"{"text":"bye"}"#);
    }
}
