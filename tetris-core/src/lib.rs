//! # tetris-core
//!
//! Deterministic Tetris board engine.
//!
//! A [`Board`] owns one player's grid, falling piece and preview. It is driven
//! by [`Action`]s and draws pieces from a [`PieceSource`]; two boards fed by
//! [`SeededSource`]s with the same seed see the same pieces, which is what
//! lets a remote replica be rebuilt from a seed alone. [`SharedBoard`] wraps a
//! board for use from several tasks at once.
//!
//! ```rust
//! use tetris_core::{Action, Board, SeededSource};
//!
//! let mut board = Board::builder()
//!     .with_size(10, 24)
//!     .with_source(SeededSource::new(42))
//!     .build()
//!     .unwrap();
//! board.apply(Action::Smash);
//! assert!(!board.is_game_over());
//! ```

pub mod board;
pub mod error;
pub mod piece;
pub mod shared;
pub mod state;

pub use board::{Action, Board, BoardBuilder, CompleteHandler, score_for_rows};
pub use error::{BoardError, Result};
pub use piece::{PieceSource, ScriptedSource, SeededSource, Tetromino};
pub use shared::SharedBoard;
pub use state::{Grid, TetrisState, Tile};
