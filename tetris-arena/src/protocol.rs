//! Wire messages exchanged between clients and the server.
//!
//! Every message travels in a single datagram. Envelopes and server messages
//! are JSON; the action carried inside a relay is a single byte.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tetris_core::{Action, TetrisState};

use crate::error::{ArenaError, Result};
use crate::types::PlayerId;

/// Client to server message, exactly one variant per datagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    Join(JoinMessage),
    Relay(RelayMessage),
}

/// Join (or create) a named room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinMessage {
    pub player_id: PlayerId,
    pub name: String,
    pub room: String,
}

/// Opaque payload for the sender's room, an encoded action during play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub player_id: PlayerId,
    pub payload: Vec<u8>,
}

/// Server to client message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    MatchStart(MatchStart),
    StateUpdate(StateUpdate),
}

/// Sent once to each player when the second player joins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStart {
    /// Piece seed of each player's board
    pub seeds: HashMap<PlayerId, i64>,
    pub tick_rate_fps: u32,
    pub width: usize,
    pub height: usize,
}

impl MatchStart {
    /// The other player's id, as seen by `me`
    pub fn opponent_of(&self, me: &PlayerId) -> Option<&PlayerId> {
        self.seeds.keys().find(|id| *id != me)
    }
}

/// Periodic authoritative snapshot of both boards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub states: HashMap<PlayerId, TetrisState>,
}

impl Envelope {
    pub fn join(player_id: PlayerId, name: impl Into<String>, room: impl Into<String>) -> Self {
        Envelope::Join(JoinMessage {
            player_id,
            name: name.into(),
            room: room.into(),
        })
    }

    pub fn action(player_id: PlayerId, action: Action) -> Self {
        Envelope::Relay(RelayMessage {
            player_id,
            payload: encode_action(action),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl ServerMessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Serialize action as a single byte
pub fn encode_action(action: Action) -> Vec<u8> {
    let byte = match action {
        Action::Tick => 0u8,
        Action::GoLeft => 1u8,
        Action::GoRight => 2u8,
        Action::Rotate => 3u8,
        Action::Smash => 4u8,
        Action::Fill => 5u8,
    };
    vec![byte]
}

pub fn decode_action(payload: &[u8]) -> Result<Action> {
    let action = match payload {
        [0] => Action::Tick,
        [1] => Action::GoLeft,
        [2] => Action::GoRight,
        [3] => Action::Rotate,
        [4] => Action::Smash,
        [5] => Action::Fill,
        _ => return Err(ArenaError::InvalidAction(payload.to_vec())),
    };
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetris_core::{Board, SeededSource};

    #[test]
    fn test_action_serialization() {
        let bytes = encode_action(Action::Smash);
        assert_eq!(bytes, vec![4]);
        assert_eq!(decode_action(&bytes).unwrap(), Action::Smash);
    }

    #[test]
    fn test_invalid_action_payload() {
        assert!(matches!(decode_action(&[6]), Err(ArenaError::InvalidAction(_))));
        assert!(matches!(decode_action(&[]), Err(ArenaError::InvalidAction(_))));
        assert!(matches!(decode_action(&[1, 2]), Err(ArenaError::InvalidAction(_))));
    }

    #[test]
    fn test_envelope_serialization() {
        let join = Envelope::join(PlayerId::new("a"), "Alice", "r1");
        assert_eq!(Envelope::decode(&join.encode().unwrap()).unwrap(), join);

        let relay = Envelope::action(PlayerId::new("a"), Action::Rotate);
        let decoded = Envelope::decode(&relay.encode().unwrap()).unwrap();
        match decoded {
            Envelope::Relay(msg) => {
                assert_eq!(msg.player_id.as_str(), "a");
                assert_eq!(decode_action(&msg.payload).unwrap(), Action::Rotate);
            }
            other => panic!("Expected relay, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_envelope() {
        assert!(Envelope::decode(b"not json").is_err());
        // An envelope carries exactly one variant
        assert!(Envelope::decode(br#"{"Join":{"player_id":"a","name":"n","room":"r"},"Relay":{"player_id":"a","payload":[]}}"#).is_err());
    }

    #[test]
    fn test_state_update_serialization() {
        let mut board = Board::builder()
            .with_source(SeededSource::new(1))
            .build()
            .unwrap();
        board.apply(Action::Smash);
        board.apply(Action::Fill);

        let mut states = HashMap::new();
        states.insert(PlayerId::new("a"), board.state());
        let message = ServerMessage::StateUpdate(StateUpdate { states });

        let bytes = message.encode().unwrap();
        assert!(bytes.len() < 64 * 1024);
        assert_eq!(ServerMessage::decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_match_start_opponent() {
        let mut seeds = HashMap::new();
        seeds.insert(PlayerId::new("a"), 1);
        seeds.insert(PlayerId::new("b"), -2);
        let start = MatchStart {
            seeds,
            tick_rate_fps: 24,
            width: 10,
            height: 24,
        };
        assert_eq!(start.opponent_of(&PlayerId::new("a")), Some(&PlayerId::new("b")));
        assert_eq!(start.opponent_of(&PlayerId::new("b")), Some(&PlayerId::new("a")));
    }
}
