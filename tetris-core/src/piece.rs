use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{BoardError, Result};

/// Side length of the square piece mask
pub const MASK_SIZE: usize = 4;

/// Falling piece shape, stored as a 4x4 occupancy mask (row 0 on top)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tetromino {
    cells: [[bool; MASK_SIZE]; MASK_SIZE],
}

// Constant tetromino mask for T, matrix is always 4x4
pub const TETROMINO_T: Tetromino = Tetromino::from_rows([
    [false, false, false, false],
    [true, true, true, false],
    [false, true, false, false],
    [false, false, false, false],
]);

// Constant tetromino mask for L
pub const TETROMINO_L: Tetromino = Tetromino::from_rows([
    [false, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, false, false],
]);

// Constant tetromino mask for Z
pub const TETROMINO_Z: Tetromino = Tetromino::from_rows([
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, false, false],
]);

// Constant tetromino mask for O
pub const TETROMINO_O: Tetromino = Tetromino::from_rows([
    [false, false, false, false],
    [false, true, true, false],
    [false, true, true, false],
    [false, false, false, false],
]);

// Constant tetromino mask for I
pub const TETROMINO_I: Tetromino = Tetromino::from_rows([
    [false, true, false, false],
    [false, true, false, false],
    [false, true, false, false],
    [false, true, false, false],
]);

/// All shapes a seeded source picks from, in selection order
pub const SHAPES: [Tetromino; 5] = [TETROMINO_T, TETROMINO_L, TETROMINO_Z, TETROMINO_O, TETROMINO_I];

impl Tetromino {
    pub const fn from_rows(cells: [[bool; MASK_SIZE]; MASK_SIZE]) -> Self {
        Tetromino { cells }
    }

    pub fn rows(&self) -> &[[bool; MASK_SIZE]; MASK_SIZE] {
        &self.cells
    }

    /// Whether the mask cell at column `x`, row `y` is occupied
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.cells[y][x]
    }

    /// Rotate the mask by 90 degrees: transpose, then reverse the row order
    pub fn rotated(&self) -> Tetromino {
        let mut cells = [[false; MASK_SIZE]; MASK_SIZE];
        for (r, row) in cells.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = self.cells[c][MASK_SIZE - 1 - r];
            }
        }
        Tetromino { cells }
    }

    /// Iterate over occupied cells as (x, y) mask coordinates
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..MASK_SIZE).flat_map(move |y| {
            (0..MASK_SIZE).filter_map(move |x| self.cells[y][x].then_some((x, y)))
        })
    }
}

/// Supplier of the infinite sequence of falling pieces
pub trait PieceSource: Send {
    fn next_piece(&mut self) -> Tetromino;
}

/// Deterministic pseudo-random source. Two sources built from the same seed
/// yield the same sequence forever, so a seed sent over the wire is enough to
/// regenerate a board's pieces on the other side.
///
/// Both the generator and the mapping from draws to shapes are fixed, so the
/// sequence does not depend on the platform or on the `rand` release.
pub struct SeededSource {
    rng: ChaCha8Rng,
}

impl SeededSource {
    pub fn new(seed: i64) -> Self {
        SeededSource {
            rng: ChaCha8Rng::seed_from_u64(seed as u64),
        }
    }

    /// Seed derived from the wall clock, for boards nobody needs to replay
    pub fn from_time() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or_default();
        Self::new(seed)
    }
}

impl PieceSource for SeededSource {
    fn next_piece(&mut self) -> Tetromino {
        // Multiply-shift of a 32 bit draw onto the shape table
        let index = (u64::from(self.rng.next_u32()) * SHAPES.len() as u64) >> 32;
        SHAPES[index as usize]
    }
}

/// Scripted queue of pieces for deterministic tests.
///
/// Once every pushed piece has been drawn the script starts over from its
/// first piece.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script: Vec<Tetromino>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Tetromino>) -> Result<Self> {
        if script.is_empty() {
            return Err(BoardError::EmptyScript);
        }
        Ok(ScriptedSource { script, cursor: 0 })
    }

    /// Append pieces to the end of the script
    pub fn push(&mut self, pieces: impl IntoIterator<Item = Tetromino>) {
        self.script.extend(pieces);
    }
}

impl PieceSource for ScriptedSource {
    fn next_piece(&mut self) -> Tetromino {
        let piece = self.script[self.cursor];
        self.cursor = (self.cursor + 1) % self.script.len();
        piece
    }
}
