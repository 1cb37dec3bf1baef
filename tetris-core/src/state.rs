use serde::{Deserialize, Serialize};

use crate::piece::Tetromino;

/// Classification of a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Empty,
    /// Locked piece cell
    NormalBlock,
    /// Garbage pushed up from the bottom by the opponent
    AdditionalBlock,
    /// Cell of the falling piece, only ever present in rendered frames
    ActivePiece,
}

impl Tile {
    /// Locked tiles block movement
    pub fn is_locked(&self) -> bool {
        matches!(self, Tile::NormalBlock | Tile::AdditionalBlock)
    }
}

/// Grid of tiles, indexed `[row][column]`
pub type Grid = Vec<Vec<Tile>>;

/// Owned snapshot of a board, safe to send and to store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TetrisState {
    pub grid: Grid,
    pub current: Tetromino,
    pub next: Tetromino,
    pub offset_x: i32,
    pub offset_y: i32,
    pub game_over: bool,
}

impl TetrisState {
    pub fn width(&self) -> usize {
        self.grid.first().map(Vec::len).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.grid.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{TETROMINO_I, TETROMINO_T};

    #[test]
    fn test_snapshot_does_not_alias() {
        let state = TetrisState {
            grid: vec![vec![Tile::Empty; 10]; 12],
            current: TETROMINO_T,
            next: TETROMINO_I,
            offset_x: -1,
            offset_y: 3,
            game_over: false,
        };
        let mut copy = state.clone();
        copy.grid[11][0] = Tile::AdditionalBlock;
        assert_eq!(state.grid[11][0], Tile::Empty);
        assert_eq!((state.width(), state.height()), (10, 12));
    }

    #[test]
    fn test_state_serialization() {
        let mut grid = vec![vec![Tile::Empty; 10]; 10];
        grid[9] = vec![Tile::AdditionalBlock; 10];
        grid[8][2] = Tile::NormalBlock;
        let state = TetrisState {
            grid,
            current: TETROMINO_T,
            next: TETROMINO_I,
            offset_x: -1,
            offset_y: 0,
            game_over: true,
        };
        let json = serde_json::to_string(&state).unwrap();
        let decoded: TetrisState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_locked_tiles() {
        assert!(Tile::NormalBlock.is_locked());
        assert!(Tile::AdditionalBlock.is_locked());
        assert!(!Tile::ActivePiece.is_locked());
        assert!(!Tile::Empty.is_locked());
    }
}
