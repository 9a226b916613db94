//! The JSON document answered to a status request.

use serde::Serialize;

use crate::context::ServerContext;

/// Vanilla never lists more players than this in the server list.
pub const SAMPLE_LIMIT: usize = 12;

#[derive(Debug, Serialize)]
pub struct StatusDocument {
    pub version: Version,
    pub players: Players,
    pub description: Description,
}

#[derive(Debug, Serialize)]
pub struct Version {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Serialize)]
pub struct Players {
    pub max: usize,
    pub online: usize,
    pub sample: Vec<PlayerSample>,
}

#[derive(Debug, Serialize)]
pub struct PlayerSample {
    pub name: String,
    pub id: String,
}

/// Chat component; plain text only.
#[derive(Debug, Serialize)]
pub struct Description {
    pub text: String,
}

impl StatusDocument {
    pub fn from_context(ctx: &ServerContext) -> Self {
        let sample = ctx
            .sessions
            .sample(SAMPLE_LIMIT)
            .into_iter()
            .map(|p| PlayerSample {
                name: p.name,
                id: p.uuid.hyphenated().to_string(),
            })
            .collect();

        Self {
            version: Version {
                name: ctx.config.version_name.clone(),
                protocol: ctx.config.protocol_version,
            },
            players: Players {
                max: ctx.config.max_players,
                online: ctx.sessions.playing_count(),
                sample,
            },
            description: Description {
                text: ctx.config.motd.clone(),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
