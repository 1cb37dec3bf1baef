use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use console::Term;
use tetris_core::{Action, Board, SeededSource, SharedBoard, score_for_rows};

use crate::input::{self, CONTROLS, Command};
use crate::term_render::{AnsiTermStyle, BoardView, TermRender};

pub struct SoloOptions {
    pub seed: Option<i64>,
    pub width: usize,
    pub height: usize,
    pub tick_interval: Duration,
}

/// Single player game: local gravity, score from cleared rows
pub async fn run(options: SoloOptions) -> anyhow::Result<()> {
    let score = Arc::new(AtomicUsize::new(0));
    let source = match options.seed {
        Some(seed) => SeededSource::new(seed),
        None => SeededSource::from_time(),
    };
    let board = Board::builder()
        .with_size(options.width, options.height)
        .with_source(source)
        .with_complete_handler({
            let score = score.clone();
            move |rows| {
                score.fetch_add(score_for_rows(rows), Ordering::Relaxed);
            }
        })
        .build()?;
    let board = SharedBoard::new(board);

    let (commands_tx, commands) = flume::unbounded();
    let keyboard = input::spawn_keyboard(commands_tx);

    let term = Term::stdout();
    term.hide_cursor()?;
    term.clear_screen()?;

    let mut gravity = tokio::time::interval(options.tick_interval);
    // First tick of an interval completes immediately
    gravity.tick().await;
    loop {
        draw(&term, &board, score.load(Ordering::Relaxed))?;
        tokio::select! {
            _ = gravity.tick() => board.apply(Action::Tick),
            command = commands.recv_async() => match command {
                Ok(Command::Action(action)) => board.apply(action),
                Ok(Command::Quit) | Err(_) => break,
            },
        }
    }

    keyboard.abort();
    term.show_cursor()?;
    term.write_line(&format!("Final score: {}", score.load(Ordering::Relaxed)))?;
    Ok(())
}

fn draw(term: &Term, board: &SharedBoard, score: usize) -> std::io::Result<()> {
    let mut caption = vec![
        "SOLO".to_string(),
        format!("Score: {}", score),
        String::new(),
    ];
    caption.extend(CONTROLS.iter().map(|line| line.to_string()));
    let view = BoardView::new(board.render(), board.next(), board.is_game_over(), caption);

    term.move_cursor_to(0, 0)?;
    for line in view.render(&AnsiTermStyle) {
        term.write_line(&line)?;
    }
    term.flush()
}
