use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::board::{Action, Board};
use crate::error::Result;
use crate::piece::Tetromino;
use crate::state::{Grid, TetrisState};

/// Board shared between tasks.
///
/// Every mutation holds the write lock for the whole operation, completion
/// handler included; every read holds the read lock for the whole read.
/// Handlers run under the lock and must not touch another `SharedBoard`.
#[derive(Clone)]
pub struct SharedBoard {
    inner: Arc<RwLock<Board>>,
}

impl SharedBoard {
    pub fn new(board: Board) -> Self {
        SharedBoard {
            inner: Arc::new(RwLock::new(board)),
        }
    }

    // A panic inside a handler leaves the board between two whole actions,
    // so a poisoned lock still guards a consistent value
    fn read(&self) -> RwLockReadGuard<'_, Board> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Board> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, action: Action) {
        self.write().apply(action);
    }

    /// Apply the same action `times` times under a single lock acquisition
    pub fn apply_repeated(&self, action: Action, times: usize) {
        let mut board = self.write();
        for _ in 0..times {
            board.apply(action);
        }
    }

    pub fn state(&self) -> TetrisState {
        self.read().state()
    }

    pub fn set_state(&self, state: TetrisState) -> Result<()> {
        self.write().set_state(state)
    }

    pub fn render(&self) -> Grid {
        self.read().render()
    }

    pub fn next(&self) -> Tetromino {
        self.read().next()
    }

    pub fn is_game_over(&self) -> bool {
        self.read().is_game_over()
    }

    pub fn width(&self) -> usize {
        self.read().width()
    }

    pub fn height(&self) -> usize {
        self.read().height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{ScriptedSource, TETROMINO_I, TETROMINO_O};
    use crate::state::Tile;

    fn shared() -> SharedBoard {
        SharedBoard::new(
            Board::builder()
                .with_source(ScriptedSource::new(vec![TETROMINO_I, TETROMINO_O]).unwrap())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_clones_share_the_board() {
        let board = shared();
        let other = board.clone();
        other.apply(Action::Smash);
        assert_eq!(board.next(), TETROMINO_I);
        assert_eq!(board.state().grid[23][5], Tile::NormalBlock);
    }

    #[test]
    fn test_apply_repeated() {
        let board = shared();
        board.apply_repeated(Action::Fill, 3);
        let grid = board.state().grid;
        for row in 21..24 {
            assert!(grid[row].iter().all(|t| *t == Tile::AdditionalBlock));
        }
        assert!(grid[20].iter().all(|t| *t == Tile::Empty));
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let board = shared();
        let mut handles = Vec::new();
        for action in [Action::Tick, Action::GoLeft, Action::Rotate, Action::Fill] {
            let board = board.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    board.apply(action);
                }
            }));
        }
        let reader = board.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..200 {
                let state = reader.state();
                assert_eq!(state.height(), 24);
                assert_eq!(state.width(), 10);
                assert_eq!(reader.render().len(), 24);
            }
        }));
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(board.height(), 24);
    }
}
