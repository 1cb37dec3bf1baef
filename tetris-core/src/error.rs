/// Error types for the tetris-core library
use thiserror::Error;

/// Result type alias for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors that can occur while building or restoring a board
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    /// Board smaller than the playable minimum
    #[error("Invalid board size {width}x{height}: minimal width x height is {min}x{min}")]
    InvalidSize {
        width: usize,
        height: usize,
        min: usize,
    },

    /// Scripted piece source built without pieces
    #[error("Scripted piece source needs at least one piece")]
    EmptyScript,

    /// Snapshot grid does not match the board dimensions
    #[error("State grid is {got_width}x{got_height}, board is {width}x{height}")]
    StateSizeMismatch {
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },
}
