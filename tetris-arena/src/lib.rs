//! # tetris-arena
//!
//! Two-player networked Tetris over UDP, built on [`tetris_core`].
//!
//! ## Overview
//!
//! A single [`Server`] endpoint hosts any number of named [`Room`]s. The first
//! two players joining a room are matched; the room then owns both boards,
//! drops gravity on them, turns rows cleared on one board into garbage on the
//! other, and broadcasts authoritative snapshots to both players. A [`Client`]
//! joins a room, relays the player's actions and mirrors the snapshots into
//! two display boards.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tetris_arena::{ArenaConfig, Client, Player, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ArenaConfig::default().with_bind_addr("127.0.0.1:8123")).await?;
//!     tokio::spawn(server.run());
//!
//!     let client = Client::connect("127.0.0.1:8123", Player::generate()).await?;
//!     client.join("lobby").await?;
//!     let start = client.wait_match_start().await?;
//!     let game = client.start_match(&start)?;
//!     println!("Playing against {}", game.opponent());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
mod name_generator;
pub mod protocol;
pub mod room;
pub mod server;
pub mod types;

pub use client::{Client, ClientMatch};
pub use config::ArenaConfig;
pub use error::{ArenaError, Result};
pub use protocol::{Envelope, MatchStart, ServerMessage, StateUpdate};
pub use room::{MessageSender, Room};
pub use server::{Server, ServerCommand};
pub use types::{Player, PlayerId, RoomStatus};
