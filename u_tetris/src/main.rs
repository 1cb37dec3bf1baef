mod input;
mod online;
mod solo;
mod term_render;

use std::time::Duration;

use clap::{Parser, Subcommand};
use tetris_arena::{ArenaConfig, Player, PlayerId, Server, ServerCommand};
use tetris_core::board::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// u_tetris - two player Tetris over UDP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Host rooms for any number of matches
    Server {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8123")]
        bind: String,

        /// State broadcasts per second
        #[arg(long, default_value_t = 24)]
        fps: u32,

        /// Gravity tick period in milliseconds
        #[arg(long, default_value_t = 750)]
        tick_ms: u64,

        /// Delay between match start and the first tick in milliseconds
        #[arg(long, default_value_t = 3000)]
        start_delay_ms: u64,

        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: usize,

        #[arg(long, default_value_t = DEFAULT_HEIGHT)]
        height: usize,
    },
    /// Join a room on a server and play
    Client {
        /// Server address
        #[arg(short, long, default_value = "127.0.0.1:8123")]
        server: String,

        /// Room to join
        #[arg(short, long, default_value = "lobby")]
        room: String,

        /// Display name, random if omitted
        #[arg(short, long)]
        name: Option<String>,

        /// Player id, random if omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// Play alone
    Solo {
        /// Piece seed, time based if omitted
        #[arg(long)]
        seed: Option<i64>,

        /// Gravity tick period in milliseconds
        #[arg(long, default_value_t = 500)]
        tick_ms: u64,

        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: usize,

        #[arg(long, default_value_t = DEFAULT_HEIGHT)]
        height: usize,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // The terminal belongs to the game screen, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Mode::Server {
            bind,
            fps,
            tick_ms,
            start_delay_ms,
            width,
            height,
        } => {
            let config = ArenaConfig::default()
                .with_bind_addr(bind)
                .with_fps(fps)
                .with_tick_interval_ms(tick_ms)
                .with_start_delay_ms(start_delay_ms)
                .with_board_size(width, height);
            let server = Server::bind(config).await?;
            println!("=== u_tetris server on {} ===", server.local_addr()?);

            let stop = server.sender();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = stop.send(ServerCommand::Stop);
                }
            });
            server.run().await?;
        }
        Mode::Client {
            server,
            room,
            name,
            id,
        } => {
            let generated = Player::generate();
            let player = Player::new(
                id.map(PlayerId::new).unwrap_or(generated.id),
                name.unwrap_or(generated.name),
            );
            online::run(online::OnlineOptions {
                server,
                room,
                player,
            })
            .await?;
        }
        Mode::Solo {
            seed,
            tick_ms,
            width,
            height,
        } => {
            solo::run(solo::SoloOptions {
                seed,
                width,
                height,
                tick_interval: Duration::from_millis(tick_ms.max(1)),
            })
            .await?;
        }
    }
    Ok(())
}
