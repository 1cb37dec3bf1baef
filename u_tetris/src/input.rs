use console::{Key, Term};
use tetris_core::Action;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Action(Action),
    Quit,
}

pub const CONTROLS: &[&str] = &[
    "← →   move",
    "↑ z   rotate",
    "↓     down",
    "space drop",
    "f     fill",
    "q     quit",
];

pub fn command_for(key: &Key) -> Option<Command> {
    let action = match key {
        Key::ArrowLeft => Action::GoLeft,
        Key::ArrowRight => Action::GoRight,
        Key::ArrowUp | Key::Char('z') | Key::Char('Z') => Action::Rotate,
        Key::ArrowDown => Action::Tick,
        Key::Char(' ') => Action::Smash,
        Key::Char('f') | Key::Char('F') => Action::Fill,
        Key::Char('q') | Key::Char('Q') | Key::Escape => return Some(Command::Quit),
        _ => return None,
    };
    Some(Command::Action(action))
}

/// Read keys on a blocking thread until quit is pressed or nobody listens
pub fn spawn_keyboard(sender: flume::Sender<Command>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let term = Term::stdout();
        loop {
            let key = match term.read_key() {
                Ok(key) => key,
                Err(e) => {
                    tracing::error!("Cannot read key: {}", e);
                    let _ = sender.send(Command::Quit);
                    break;
                }
            };
            let Some(command) = command_for(&key) else {
                continue;
            };
            if sender.send(command).is_err() || command == Command::Quit {
                break;
            }
        }
    })
}
