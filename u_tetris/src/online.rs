use console::Term;
use tetris_arena::{Client, ClientMatch, Player};
use tetris_core::SharedBoard;

use crate::input::{self, CONTROLS, Command};
use crate::term_render::{AnsiTermStyle, BoardView, PairView, TermRender};

pub struct OnlineOptions {
    pub server: String,
    pub room: String,
    pub player: Player,
}

/// Two player game against whoever else joins the same room
pub async fn run(options: OnlineOptions) -> anyhow::Result<()> {
    let client = Client::connect(options.server.as_str(), options.player).await?;
    client.join(&options.room).await?;

    let (commands_tx, commands) = flume::unbounded();
    let keyboard = input::spawn_keyboard(commands_tx);

    let term = Term::stdout();
    term.hide_cursor()?;
    term.clear_screen()?;
    term.write_line(&format!(
        "{} is waiting for an opponent in room '{}' (q to quit)",
        client.player().name,
        options.room
    ))?;

    let start = loop {
        tokio::select! {
            start = client.wait_match_start() => break start?,
            command = commands.recv_async() => match command {
                Ok(Command::Action(_)) => {}
                Ok(Command::Quit) | Err(_) => {
                    keyboard.abort();
                    term.show_cursor()?;
                    return Ok(());
                }
            },
        }
    };
    let game = client.start_match(&start)?;
    term.clear_screen()?;

    loop {
        draw(&term, &client, &game)?;
        tokio::select! {
            update = game.updates().recv_async() => {
                if update.is_err() {
                    break;
                }
            }
            command = commands.recv_async() => match command {
                Ok(Command::Action(action)) => client.send_action(action).await,
                Ok(Command::Quit) | Err(_) => break,
            },
        }
    }

    keyboard.abort();
    term.show_cursor()?;
    Ok(())
}

fn view(board: &SharedBoard, caption: Vec<String>) -> BoardView {
    BoardView::new(board.render(), board.next(), board.is_game_over(), caption)
}

fn draw(term: &Term, client: &Client, game: &ClientMatch) -> std::io::Result<()> {
    let mut caption = vec![client.player().name.clone(), String::new()];
    caption.extend(CONTROLS.iter().map(|line| line.to_string()));
    let pair = PairView {
        player: view(game.local(), caption),
        opponent: view(game.remote(), vec![game.opponent().to_string()]),
    };

    term.move_cursor_to(0, 0)?;
    for line in pair.render(&AnsiTermStyle) {
        term.write_line(&line)?;
    }
    term.flush()
}
