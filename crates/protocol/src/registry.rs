//! Packet registry: the static table that gives every packet its name, id,
//! connection state and field schema.
//!
//! The table is injected configuration. [`RegistryConfig`] is its serialised
//! form (JSON, keyed direction -> packet name), and [`PacketRegistry`] is the
//! validated, immutable lookup structure built from it once at startup and
//! shared behind an `Arc`.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{ConnectionState, Direction, FieldType};

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{direction:?} packets {first} and {second} share id 0x{id:02x} in {state:?}")]
    DuplicateId {
        direction: Direction,
        state: ConnectionState,
        id: i32,
        first: String,
        second: String,
    },

    #[error("packet {0}: ByteArray must be the last field")]
    ByteArrayNotLast(String),

    #[error("packet {0}: a generated payload cannot also declare fields")]
    GeneratedWithFields(String),
}

/// One packet as it appears in the configuration table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacketEntry {
    pub id: i32,
    pub state: ConnectionState,
    #[serde(default)]
    pub fields: Vec<FieldType>,
    /// Which handler (if any) acts on this packet when it is received.
    #[serde(default)]
    pub handler: Option<u8>,
    /// The body is produced structurally instead of from `fields`.
    #[serde(default)]
    pub generated: bool,
}

/// Serialised registry table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub server_bound: IndexMap<String, PacketEntry>,
    #[serde(default)]
    pub client_bound: IndexMap<String, PacketEntry>,
}

impl RegistryConfig {
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Immutable description of one packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketDescriptor {
    pub name: String,
    pub id: i32,
    pub direction: Direction,
    pub state: ConnectionState,
    pub fields: Vec<FieldType>,
    pub handler: Option<u8>,
    pub generated: bool,
}

/// Lookup table built once from a [`RegistryConfig`].
#[derive(Debug, Default)]
pub struct PacketRegistry {
    descriptors: Vec<PacketDescriptor>,
    by_id: HashMap<(Direction, ConnectionState, i32), usize>,
    by_name: HashMap<Direction, HashMap<String, usize>>,
}

impl PacketRegistry {
    /// Validate a table and index it.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ids within a (direction, state), a `ByteArray`
    /// anywhere but last, or a generated packet with fields.
    pub fn from_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        let tables = [
            (Direction::ServerBound, config.server_bound),
            (Direction::ClientBound, config.client_bound),
        ];

        for (direction, table) in tables {
            for (name, entry) in table {
                registry.insert(direction, name, entry)?;
            }
        }

        tracing::debug!(packets = registry.len(), "Packet registry built");
        Ok(registry)
    }

    /// Parse and build in one step.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Self::from_config(RegistryConfig::from_json(json)?)
    }

    fn insert(
        &mut self,
        direction: Direction,
        name: String,
        entry: PacketEntry,
    ) -> Result<(), RegistryError> {
        if entry.generated && !entry.fields.is_empty() {
            return Err(RegistryError::GeneratedWithFields(name));
        }
        if let Some(pos) = entry.fields.iter().position(|f| *f == FieldType::ByteArray) {
            if pos + 1 != entry.fields.len() {
                return Err(RegistryError::ByteArrayNotLast(name));
            }
        }

        let key = (direction, entry.state, entry.id);
        if let Some(&existing) = self.by_id.get(&key) {
            return Err(RegistryError::DuplicateId {
                direction,
                state: entry.state,
                id: entry.id,
                first: self.descriptors[existing].name.clone(),
                second: name,
            });
        }

        let index = self.descriptors.len();
        self.by_id.insert(key, index);
        self.by_name
            .entry(direction)
            .or_default()
            .insert(name.clone(), index);
        self.descriptors.push(PacketDescriptor {
            name,
            id: entry.id,
            direction,
            state: entry.state,
            fields: entry.fields,
            handler: entry.handler,
            generated: entry.generated,
        });
        Ok(())
    }

    /// Decode-side lookup.
    pub fn resolve(
        &self,
        direction: Direction,
        state: ConnectionState,
        id: i32,
    ) -> Option<&PacketDescriptor> {
        self.by_id
            .get(&(direction, state, id))
            .map(|&i| &self.descriptors[i])
    }

    /// Encode-side lookup.
    pub fn resolve_name(&self, direction: Direction, name: &str) -> Option<&PacketDescriptor> {
        self.by_name
            .get(&direction)
            .and_then(|names| names.get(name))
            .map(|&i| &self.descriptors[i])
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PacketDescriptor> {
        self.descriptors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "ServerBound": {
            "Handshake": { "id": 0, "state": "Handshaking",
                           "fields": ["VarInt", "String", "UnsignedShort", "VarInt"], "handler": 0 },
            "Ping": { "id": 1, "state": "Status", "fields": ["Long"], "handler": 2 }
        },
        "ClientBound": {
            "Pong": { "id": 1, "state": "Status", "fields": ["Long"] },
            "ChunkData": { "id": 32, "state": "Play", "generated": true }
        }
    }"#;

    #[test]
    fn resolves_by_id_and_name() {
        let registry = PacketRegistry::from_json(TABLE).unwrap();
        assert_eq!(registry.len(), 4);

        let handshake = registry
            .resolve(Direction::ServerBound, ConnectionState::Handshaking, 0)
            .unwrap();
        assert_eq!(handshake.name, "Handshake");
        assert_eq!(handshake.fields.len(), 4);
        assert_eq!(handshake.handler, Some(0));

        let pong = registry.resolve_name(Direction::ClientBound, "Pong").unwrap();
        assert_eq!(pong.id, 1);
        assert_eq!(pong.state, ConnectionState::Status);
        assert_eq!(pong.handler, None);

        assert!(registry.resolve_name(Direction::ClientBound, "ChunkData").unwrap().generated);
    }

    #[test]
    fn misses_return_none() {
        let registry = PacketRegistry::from_json(TABLE).unwrap();
        // Same id, wrong state.
        assert!(registry
            .resolve(Direction::ServerBound, ConnectionState::Login, 0)
            .is_none());
        // Name exists only the other way.
        assert!(registry.resolve_name(Direction::ServerBound, "Pong").is_none());
    }

    #[test]
    fn same_id_in_different_states_is_fine() {
        let table = r#"{ "ServerBound": {
            "Handshake": { "id": 0, "state": "Handshaking" },
            "StatusRequest": { "id": 0, "state": "Status" }
        } }"#;
        assert_eq!(PacketRegistry::from_json(table).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let table = r#"{ "ServerBound": {
            "StatusRequest": { "id": 0, "state": "Status" },
            "Other": { "id": 0, "state": "Status" }
        } }"#;
        assert!(matches!(
            PacketRegistry::from_json(table),
            Err(RegistryError::DuplicateId { id: 0, .. })
        ));
    }

    #[test]
    fn byte_array_must_be_last() {
        let table = r#"{ "ServerBound": {
            "Bad": { "id": 9, "state": "Play", "fields": ["ByteArray", "VarInt"] }
        } }"#;
        assert!(matches!(
            PacketRegistry::from_json(table),
            Err(RegistryError::ByteArrayNotLast(name)) if name == "Bad"
        ));
    }

    #[test]
    fn generated_packets_declare_no_fields() {
        let table = r#"{ "ClientBound": {
            "ChunkData": { "id": 32, "state": "Play", "generated": true, "fields": ["Int"] }
        } }"#;
        assert!(matches!(
            PacketRegistry::from_json(table),
            Err(RegistryError::GeneratedWithFields(_))
        ));
    }

    #[test]
    fn unknown_field_type_is_a_parse_error() {
        let table = r#"{ "ServerBound": {
            "Bad": { "id": 9, "state": "Play", "fields": ["Quaternion"] }
        } }"#;
        assert!(matches!(
            PacketRegistry::from_json(table),
            Err(RegistryError::Json(_))
        ));
    }
}
