use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::vec3::{Rotation, Vec3};

/// Opaque, server-assigned peer identifier.
pub type PeerId = String;

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// First frame on every connection: own id plus everyone already here.
    #[serde(rename = "connect")]
    Connect { id: PeerId, clients: Vec<RosterEntry> },
    #[serde(rename = "newPlayer")]
    NewPlayer { id: PeerId },
    #[serde(rename = "playerMove")]
    PlayerMove {
        id: PeerId,
        position: Vec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<Rotation>,
    },
    #[serde(rename = "playerLeft")]
    PlayerLeft { id: PeerId },
}

impl ServerMsg {
    pub const KINDS: &'static [&'static str] = &["connect", "newPlayer", "playerMove", "playerLeft"];

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMsg::Connect { .. } => "connect",
            ServerMsg::NewPlayer { .. } => "newPlayer",
            ServerMsg::PlayerMove { .. } => "playerMove",
            ServerMsg::PlayerLeft { .. } => "playerLeft",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/generated/")]
pub struct RosterEntry {
    pub id: PeerId,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "position")]
    Position {
        position: Vec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<Rotation>,
    },
}

impl ClientMsg {
    pub const KINDS: &'static [&'static str] = &["position"];
}

// === Decoding ===

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("message has no \"type\" field")]
    MissingKind,
    #[error("unknown message type {0:?}")]
    UnknownKind(String),
}

pub fn decode_server_msg(text: &str) -> Result<ServerMsg, DecodeError> {
    decode_tagged(text, ServerMsg::KINDS)
}

pub fn decode_client_msg(text: &str) -> Result<ClientMsg, DecodeError> {
    decode_tagged(text, ClientMsg::KINDS)
}

fn decode_tagged<T: DeserializeOwned>(text: &str, kinds: &[&str]) -> Result<T, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(|k| k.as_str())
        .ok_or(DecodeError::MissingKind)?;
    if !kinds.contains(&kind) {
        return Err(DecodeError::UnknownKind(kind.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3::vec3;

    #[test]
    fn connect_carries_roster_positions() {
        let msg = ServerMsg::Connect {
            id: "k3j9x0a1b".to_string(),
            clients: vec![RosterEntry {
                id: "q8w7e6r5t".to_string(),
                position: vec3(4.0, 5.0, 6.0),
                rotation: None,
            }],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connect\""));
        assert!(json.contains("\"clients\":[{\"id\":\"q8w7e6r5t\""));
        assert!(!json.contains("rotation"));
        assert_eq!(decode_server_msg(&json).unwrap(), msg);
    }

    #[test]
    fn player_move_uses_camel_case_tag() {
        let msg = ServerMsg::PlayerMove {
            id: "abc".to_string(),
            position: vec3(1.0, 2.0, 3.0),
            rotation: Some(Rotation::new(0.1, -1.2)),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"playerMove\""));
        assert!(json.contains("\"rotation\":{\"x\":0.1,\"y\":-1.2}"));
    }

    #[test]
    fn position_without_rotation_decodes() {
        let text = r#"{"type":"position","position":{"x":1,"y":2,"z":3}}"#;
        match decode_client_msg(text).unwrap() {
            ClientMsg::Position { position, rotation } => {
                assert_eq!(position, vec3(1.0, 2.0, 3.0));
                assert!(rotation.is_none());
            }
        }
    }

    #[test]
    fn roster_entry_without_position_defaults_to_origin() {
        let text = r#"{"type":"connect","id":"me","clients":[{"id":"other"}]}"#;
        match decode_server_msg(text).unwrap() {
            ServerMsg::Connect { clients, .. } => {
                assert_eq!(clients[0].position, Vec3::ZERO);
            }
            other => panic!("Expected Connect, got {:?}", other),
        }
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            decode_client_msg("not valid json"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn schema_violation_is_malformed() {
        let text = r#"{"type":"position","position":{"x":"left"}}"#;
        assert!(matches!(
            decode_client_msg(text),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn missing_and_unknown_kinds_are_distinguished() {
        assert!(matches!(
            decode_server_msg(r#"{"id":"x"}"#),
            Err(DecodeError::MissingKind)
        ));
        match decode_server_msg(r#"{"type":"shoot","id":"x"}"#) {
            Err(DecodeError::UnknownKind(kind)) => assert_eq!(kind, "shoot"),
            other => panic!("Expected UnknownKind, got {:?}", other),
        }
        // A server kind is not a client kind.
        assert!(matches!(
            decode_client_msg(r#"{"type":"playerLeft","id":"x"}"#),
            Err(DecodeError::UnknownKind(_))
        ));
    }

    #[test]
    fn kind_matches_serialized_tag() {
        let msgs = [
            ServerMsg::Connect {
                id: "a".to_string(),
                clients: vec![],
            },
            ServerMsg::NewPlayer { id: "a".to_string() },
            ServerMsg::PlayerMove {
                id: "a".to_string(),
                position: Vec3::ZERO,
                rotation: None,
            },
            ServerMsg::PlayerLeft { id: "a".to_string() },
        ];
        for msg in msgs {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["type"], msg.kind());
            assert!(ServerMsg::KINDS.contains(&msg.kind()));
        }
    }
}
