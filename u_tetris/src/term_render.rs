use tetris_core::{Grid, Tetromino, Tile};

#[derive(Clone, PartialEq)]
pub enum TermCell {
    Tile(Tile),
    BorderVertical,
    BorderHorizontal,
    BorderTopLeft,
    BorderTopRight,
    BorderBottomLeft,
    BorderBottomRight,
    Space,
    Message(String),
}

pub trait TermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str;

    fn width(&self, cell: &TermCell) -> usize {
        match cell {
            TermCell::Tile(_) | TermCell::BorderHorizontal => 2,
            TermCell::Message(s) => s.chars().count(),
            _ => 1,
        }
    }
}

pub trait TermRender {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>>;

    fn render(&self, style: &impl TermStyle) -> Vec<String> {
        self.output(style)
            .iter()
            .map(|row| row.iter().map(|cell| style.display(cell)).collect())
            .collect()
    }
}

fn row_width(row: &[TermCell], style: &impl TermStyle) -> usize {
    row.iter().map(|cell| style.width(cell)).sum()
}

// Make all lines in block the same width by padding with TermCell::Space
pub fn pad_block_right(block: &mut [Vec<TermCell>], style: &impl TermStyle) {
    let width = block.iter().map(|row| row_width(row, style)).max().unwrap_or(0);
    for row in block.iter_mut() {
        let padding = width - row_width(row, style);
        row.extend((0..padding).map(|_| TermCell::Space));
    }
}

/// Put two blocks side by side, top aligned
pub fn beside(
    mut left: Vec<Vec<TermCell>>,
    mut right: Vec<Vec<TermCell>>,
    gap: usize,
    style: &impl TermStyle,
) -> Vec<Vec<TermCell>> {
    pad_block_right(&mut left, style);
    let left_width = left.first().map(|row| row_width(row, style)).unwrap_or(0);
    let height = left.len().max(right.len());
    left.resize(height, vec![TermCell::Space; left_width]);
    right.resize(height, Vec::new());
    left.into_iter()
        .zip(right)
        .map(|(mut line, rest)| {
            line.extend((0..gap).map(|_| TermCell::Space));
            line.extend(rest);
            line
        })
        .collect()
}

fn horizontal(cols: usize, left: TermCell, right: TermCell) -> Vec<TermCell> {
    let mut line = vec![left];
    line.extend((0..cols).map(|_| TermCell::BorderHorizontal));
    line.push(right);
    line
}

pub struct PlainTermStyle;

impl TermStyle for PlainTermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str {
        match cell {
            TermCell::Tile(Tile::Empty) => "  ",
            TermCell::Tile(Tile::AdditionalBlock) => "##",
            TermCell::Tile(_) => "[]",
            TermCell::BorderVertical => "|",
            TermCell::BorderTopLeft
            | TermCell::BorderTopRight
            | TermCell::BorderBottomLeft
            | TermCell::BorderBottomRight => "+",
            TermCell::BorderHorizontal => "--",
            TermCell::Space => " ",
            TermCell::Message(s) => s.as_str(),
        }
    }
}

pub struct AnsiTermStyle;

impl TermStyle for AnsiTermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str {
        match cell {
            TermCell::Tile(Tile::Empty) => "\x1b[0m  ",
            TermCell::Tile(Tile::NormalBlock) => "\x1b[0;37m[]",
            TermCell::Tile(Tile::ActivePiece) => "\x1b[0;36m[]",
            TermCell::Tile(Tile::AdditionalBlock) => "\x1b[0;31m##",
            TermCell::BorderVertical => "\x1b[0m│",
            TermCell::BorderTopLeft => "\x1b[0m┌",
            TermCell::BorderTopRight => "\x1b[0m┐",
            TermCell::BorderBottomLeft => "\x1b[0m└",
            TermCell::BorderHorizontal => "\x1b[0m──",
            TermCell::BorderBottomRight => "\x1b[0m┘",
            TermCell::Space => "\x1b[0m ",
            TermCell::Message(s) => s.as_str(),
        }
    }
}

/// Playing field, open at the top
pub struct Well {
    frame: Grid,
    game_over: bool,
}

impl Well {
    pub fn new(frame: Grid, game_over: bool) -> Self {
        Self { frame, game_over }
    }
}

impl TermRender for Well {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let cols = self.frame.first().map(Vec::len).unwrap_or(0);
        let mut lines: Vec<Vec<TermCell>> = self
            .frame
            .iter()
            .map(|row| row.iter().copied().map(TermCell::Tile).collect())
            .collect();
        if self.game_over && !lines.is_empty() {
            let middle = lines.len() / 2;
            let message = "GAME OVER";
            let lead = (cols * 2).saturating_sub(message.len()) / 2;
            let mut line: Vec<TermCell> = (0..lead).map(|_| TermCell::Space).collect();
            line.push(TermCell::Message(message.to_string()));
            lines[middle] = line;
            pad_block_right(&mut lines, style);
        }

        for line in &mut lines {
            line.insert(0, TermCell::BorderVertical);
            line.push(TermCell::BorderVertical);
        }
        lines.push(horizontal(cols, TermCell::BorderBottomLeft, TermCell::BorderBottomRight));
        lines
    }
}

/// Boxed view of the next piece
pub struct Preview(pub Tetromino);

impl TermRender for Preview {
    fn output(&self, _style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let cols = self.0.rows().len();
        let mut lines = vec![horizontal(cols, TermCell::BorderTopLeft, TermCell::BorderTopRight)];
        for row in self.0.rows() {
            let mut line = vec![TermCell::BorderVertical];
            line.extend(row.iter().map(|&set| {
                TermCell::Tile(if set { Tile::NormalBlock } else { Tile::Empty })
            }));
            line.push(TermCell::BorderVertical);
            lines.push(line);
        }
        lines.push(horizontal(cols, TermCell::BorderBottomLeft, TermCell::BorderBottomRight));
        lines
    }
}

/// One player's well with the preview and a caption on its right
pub struct BoardView {
    well: Well,
    preview: Preview,
    caption: Vec<String>,
}

impl BoardView {
    pub fn new(frame: Grid, next: Tetromino, game_over: bool, caption: Vec<String>) -> Self {
        Self {
            well: Well::new(frame, game_over),
            preview: Preview(next),
            caption,
        }
    }
}

impl TermRender for BoardView {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let mut panel = self.preview.output(style);
        panel.push(Vec::new());
        panel.extend(
            self.caption
                .iter()
                .map(|line| vec![TermCell::Message(line.clone())]),
        );
        beside(self.well.output(style), panel, 1, style)
    }
}

/// Local board on the left, opponent on the right
pub struct PairView {
    pub player: BoardView,
    pub opponent: BoardView,
}

impl TermRender for PairView {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        beside(self.player.output(style), self.opponent.output(style), 3, style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetris_core::piece::TETROMINO_O;

    fn empty_frame(width: usize, height: usize) -> Grid {
        vec![vec![Tile::Empty; width]; height]
    }

    #[test]
    fn test_well_render() {
        let mut frame = empty_frame(10, 12);
        frame[11] = vec![Tile::AdditionalBlock; 10];
        frame[0][4] = Tile::ActivePiece;
        let lines = Well::new(frame, false).render(&PlainTermStyle);

        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], format!("|{}[]{}|", " ".repeat(8), " ".repeat(10)));
        assert_eq!(lines[11], format!("|{}|", "##".repeat(10)));
        assert_eq!(lines[12], format!("+{}+", "--".repeat(10)));
    }

    #[test]
    fn test_game_over_message() {
        let lines = Well::new(empty_frame(10, 12), true).render(&PlainTermStyle);
        assert!(lines[6].contains("GAME OVER"));
        // Message line keeps the well width
        assert_eq!(lines[6].chars().count(), lines[0].chars().count());
    }

    #[test]
    fn test_preview_render() {
        let lines = Preview(TETROMINO_O).render(&PlainTermStyle);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[2], "|  [][]  |");
        assert_eq!(lines[4], "|        |");
    }

    #[test]
    fn test_board_view_caption() {
        let view = BoardView::new(
            empty_frame(10, 12),
            TETROMINO_O,
            false,
            vec!["Alice".to_string(), "Score: 6".to_string()],
        );
        let lines = view.render(&PlainTermStyle);
        assert_eq!(lines.len(), 13);
        assert!(lines[7].ends_with("Alice"));
        assert!(lines[8].ends_with("Score: 6"));
    }

    #[test]
    fn test_pair_view_is_side_by_side() {
        let pair = PairView {
            player: BoardView::new(empty_frame(10, 12), TETROMINO_O, false, vec!["me".to_string()]),
            opponent: BoardView::new(empty_frame(10, 12), TETROMINO_O, true, vec!["them".to_string()]),
        };
        let lines = pair.render(&PlainTermStyle);
        assert_eq!(lines.len(), 13);
        // Well and preview borders of both boards
        assert_eq!(lines[1].matches('|').count(), 8);
        assert!(lines[6].contains("GAME OVER"));
        assert!(lines[7].contains("me") && lines[7].ends_with("them"));
    }
}
