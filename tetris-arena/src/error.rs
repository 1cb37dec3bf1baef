/// Error types for the tetris-arena library
use thiserror::Error;

use crate::types::PlayerId;

/// Result type alias for arena operations
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Errors that can occur in tetris-arena operations
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Player id or display name missing
    #[error("Invalid player: {0}")]
    InvalidPlayer(String),

    /// Room already holds two players
    #[error("Room '{0}' already full")]
    RoomFull(String),

    /// Player already seated in a room
    #[error("Player '{0}' already joined")]
    AlreadyJoined(PlayerId),

    /// Player is not an occupant of the room
    #[error("No such player '{player}' in room '{room}'")]
    NotInRoom {
        /// Player that tried to leave
        player: PlayerId,
        /// Room name
        room: String,
    },

    /// No address or room registered for the player
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// Room name not registered on the server
    #[error("Unknown room: {0}")]
    UnknownRoom(String),

    /// Inner action payload is not a known action
    #[error("Invalid action payload: {0:?}")]
    InvalidAction(Vec<u8>),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Board construction or state restore failed
    #[error("Board error: {0}")]
    Board(#[from] tetris_core::BoardError),

    /// Unexpected message during a protocol exchange
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
