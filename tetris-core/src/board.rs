use serde::{Deserialize, Serialize};

use crate::error::{BoardError, Result};
use crate::piece::{MASK_SIZE, PieceSource, SeededSource, Tetromino};
use crate::state::{Grid, TetrisState, Tile};

/// Smallest accepted width and height
pub const MIN_SIZE: usize = 10;
pub const DEFAULT_WIDTH: usize = 10;
pub const DEFAULT_HEIGHT: usize = 24;

// Enum with all possible board actions
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Gravity step
    Tick,
    GoLeft,
    GoRight,
    Rotate,
    /// Hard drop
    Smash,
    /// Garbage line from the opponent
    Fill,
}

/// Callback receiving the number of rows removed by each row clearing pass
pub type CompleteHandler = Box<dyn FnMut(usize) + Send + Sync>;

/// Score for clearing `rows` rows at once in single-player mode
pub fn score_for_rows(rows: usize) -> usize {
    rows * (rows + 1)
}

/// Builder for [`Board`]
pub struct BoardBuilder {
    width: usize,
    height: usize,
    source: Option<Box<dyn PieceSource + Sync>>,
    on_complete: Option<CompleteHandler>,
}

impl BoardBuilder {
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_source(mut self, source: impl PieceSource + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_complete_handler(
        mut self,
        handler: impl FnMut(usize) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> Result<Board> {
        if self.width < MIN_SIZE || self.height < MIN_SIZE {
            return Err(BoardError::InvalidSize {
                width: self.width,
                height: self.height,
                min: MIN_SIZE,
            });
        }
        let mut source = self
            .source
            .unwrap_or_else(|| Box::new(SeededSource::from_time()));
        let current = source.next_piece();
        let next = source.next_piece();
        Ok(Board {
            width: self.width,
            height: self.height,
            grid: vec![vec![Tile::Empty; self.width]; self.height],
            current,
            next,
            x: spawn_column(self.width),
            y: 0,
            game_over: false,
            source,
            on_complete: self.on_complete,
        })
    }
}

fn spawn_column(width: usize) -> i32 {
    width as i32 / 2 - 1
}

/// Single player's board: locked grid, falling piece, preview and game-over flag.
///
/// The board is a plain state machine; every action is applied in full before
/// `apply` returns. Concurrent access goes through [`crate::SharedBoard`].
pub struct Board {
    width: usize,
    height: usize,
    grid: Grid,
    // Falling piece and the grid position of its mask's top-left corner
    current: Tetromino,
    next: Tetromino,
    x: i32,
    y: i32,
    game_over: bool,
    source: Box<dyn PieceSource + Sync>,
    on_complete: Option<CompleteHandler>,
}

impl Board {
    pub fn builder() -> BoardBuilder {
        BoardBuilder {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            source: None,
            on_complete: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn current(&self) -> Tetromino {
        self.current
    }

    /// Upcoming piece
    pub fn next(&self) -> Tetromino {
        self.next
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Apply a single action. Does nothing once the game is over.
    pub fn apply(&mut self, action: Action) {
        if self.game_over {
            return;
        }
        match action {
            Action::Tick => self.tick(),
            Action::GoLeft => self.go_left(),
            Action::GoRight => self.go_right(),
            Action::Rotate => self.rotate(),
            Action::Smash => self.smash(),
            Action::Fill => self.fill(),
        }
    }

    pub fn state(&self) -> TetrisState {
        TetrisState {
            grid: self.grid.clone(),
            current: self.current,
            next: self.next,
            offset_x: self.x,
            offset_y: self.y,
            game_over: self.game_over,
        }
    }

    /// Overwrite the whole board with a snapshot. Grid dimensions are fixed,
    /// so a snapshot of another size is rejected and the board is untouched.
    pub fn set_state(&mut self, state: TetrisState) -> Result<()> {
        let mismatch = state.height() != self.height
            || state.grid.iter().any(|row| row.len() != self.width);
        if mismatch {
            return Err(BoardError::StateSizeMismatch {
                width: self.width,
                height: self.height,
                got_width: state.width(),
                got_height: state.height(),
            });
        }
        self.grid = state.grid;
        self.current = state.current;
        self.next = state.next;
        self.x = state.offset_x;
        self.y = state.offset_y;
        self.game_over = state.game_over;
        Ok(())
    }

    /// Locked grid with the falling piece drawn on top as [`Tile::ActivePiece`]
    pub fn render(&self) -> Grid {
        let mut frame = self.grid.clone();
        for (x, y) in self.piece_cells() {
            if let Some(tile) = self.tile_mut_in(&mut frame, x, y) {
                *tile = Tile::ActivePiece;
            }
        }
        frame
    }

    fn tile_mut_in<'a>(&self, frame: &'a mut Grid, x: i32, y: i32) -> Option<&'a mut Tile> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(&mut frame[y as usize][x as usize])
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    // Tile at grid position, None outside the grid
    fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        self.in_bounds(x, y)
            .then(|| self.grid[y as usize][x as usize])
    }

    fn is_locked(&self, x: i32, y: i32) -> bool {
        self.tile(x, y).is_some_and(|t| t.is_locked())
    }

    // Grid coordinates of the falling piece's occupied cells
    fn piece_cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.current
            .occupied()
            .map(|(mx, my)| (self.x + mx as i32, self.y + my as i32))
    }

    // Piece lies outside the grid or on a locked tile
    fn overlaps(&self) -> bool {
        self.piece_cells()
            .any(|(x, y)| !self.in_bounds(x, y) || self.is_locked(x, y))
    }

    // Piece cannot fall any further: it sits on the floor or on a locked tile,
    // or it already overlaps something
    fn is_resting(&self) -> bool {
        self.overlaps()
            || self
                .piece_cells()
                .any(|(x, y)| y + 1 >= self.height as i32 || self.is_locked(x, y + 1))
    }

    // (left blocked, right blocked)
    fn blocked_sides(&self) -> (bool, bool) {
        let mut left = false;
        let mut right = false;
        for (x, y) in self.piece_cells() {
            left |= x <= 0 || self.is_locked(x - 1, y);
            right |= x >= self.width as i32 - 1 || self.is_locked(x + 1, y);
        }
        (left, right)
    }

    fn tick(&mut self) {
        if self.is_resting() {
            self.settle();
        } else {
            self.y += 1;
        }
    }

    fn go_left(&mut self) {
        if !self.blocked_sides().0 {
            self.x -= 1;
        }
    }

    fn go_right(&mut self) {
        if !self.blocked_sides().1 {
            self.x += 1;
        }
    }

    // No wall kicks: a colliding rotation is simply undone
    fn rotate(&mut self) {
        let initial = self.current;
        self.current = initial.rotated();
        if self.overlaps() {
            self.current = initial;
        }
    }

    fn smash(&mut self) {
        self.y += self.drop_distance();
        self.settle();
    }

    // Rows the piece can fall before any of its columns hits the floor or a
    // locked tile
    fn drop_distance(&self) -> i32 {
        let floor = self.height as i32;
        let mut distance: Option<i32> = None;
        for mx in 0..MASK_SIZE {
            let Some(lowest) = (0..MASK_SIZE).rev().find(|&my| self.current.is_set(mx, my)) else {
                continue;
            };
            let column = self.x + mx as i32;
            let bottom = self.y + lowest as i32;
            let obstruction = (bottom + 1..floor)
                .find(|&row| self.is_locked(column, row))
                .unwrap_or(floor);
            let steps = obstruction - bottom - 1;
            distance = Some(distance.map_or(steps, |d| d.min(steps)));
        }
        distance.unwrap_or(0).max(0)
    }

    fn fill(&mut self) {
        if self.is_resting() {
            self.lock_piece();
            self.clear_rows();
            self.raise_ground();
            self.spawn_next();
        } else {
            self.raise_ground();
        }
    }

    // Lock, clear rows, bring in the next piece
    fn settle(&mut self) {
        self.lock_piece();
        self.clear_rows();
        self.spawn_next();
    }

    fn lock_piece(&mut self) {
        let cells: Vec<(i32, i32)> = self.piece_cells().collect();
        for (x, y) in cells {
            if self.in_bounds(x, y) {
                self.grid[y as usize][x as usize] = Tile::NormalBlock;
            }
        }
    }

    // Garbage rows never complete; only rows made of locked piece cells do
    fn is_row_completed(&self, row: usize) -> bool {
        self.grid[row].iter().all(|t| *t == Tile::NormalBlock)
    }

    /// Remove completed rows, compacting the rest towards the bottom.
    /// Returns the number of removed rows after notifying the handler.
    fn clear_rows(&mut self) -> usize {
        let mut completed = 0;
        for row in (0..self.height).rev() {
            if self.is_row_completed(row) {
                completed += 1;
            } else if completed > 0 {
                self.grid[row + completed] = self.grid[row].clone();
            }
        }
        for row in self.grid.iter_mut().take(completed) {
            row.fill(Tile::Empty);
        }
        if completed > 0 {
            tracing::debug!("Cleared {} row(s)", completed);
        }
        if let Some(handler) = self.on_complete.as_mut() {
            handler(completed);
        }
        completed
    }

    // Shift every row up by one and append a full garbage row at the bottom
    fn raise_ground(&mut self) {
        self.grid.remove(0);
        self.grid.push(vec![Tile::AdditionalBlock; self.width]);
    }

    fn spawn_next(&mut self) {
        self.current = self.next;
        self.next = self.source.next_piece();
        self.x = spawn_column(self.width);
        self.y = 0;
        if self.overlaps() {
            tracing::debug!("Spawned piece overlaps the stack, game over");
            self.game_over = true;
        }
    }
}
