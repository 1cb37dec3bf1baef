/// Core types for the tetris-arena library
use serde::{Deserialize, Serialize};

use crate::name_generator;

/// Opaque player identifier chosen by the client.
///
/// The server trusts it as-is; emptiness is checked when the player joins a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Generate a new unique player ID
    /// Uses base58 encoding of UUID to avoid special characters
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let encoded = bs58::encode(uuid.as_bytes()).into_string();
        // Take first 16 characters for reasonable length
        let shortened = encoded.chars().take(16).collect::<String>();
        PlayerId(shortened)
    }

    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        PlayerId::new(id)
    }
}

/// Participant of a match. Two players are the same player when their ids match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Player {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Player with a generated id and a readable random name
    pub fn generate() -> Self {
        Player {
            id: PlayerId::generate(),
            name: name_generator::generate_random_name(),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

impl std::hash::Hash for Player {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Lifecycle stage of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    /// No occupant
    Empty,
    /// One occupant, waiting for an opponent
    AwaitingSecond,
    /// Two occupants, match in progress
    Running,
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomStatus::Empty => write!(f, "empty"),
            RoomStatus::AwaitingSecond => write!(f, "awaiting second player"),
            RoomStatus::Running => write!(f, "running"),
        }
    }
}
