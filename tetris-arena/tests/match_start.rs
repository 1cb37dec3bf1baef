use std::time::Duration;

use tetris_arena::{ArenaConfig, Client, Player, PlayerId, Server, ServerCommand};
use tetris_core::Action;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server(config: ArenaConfig) -> (std::net::SocketAddr, flume::Sender<ServerCommand>) {
    let server = Server::bind(config.with_bind_addr("127.0.0.1:0")).await.unwrap();
    let addr = server.local_addr().unwrap();
    let commands = server.sender();
    tokio::spawn(server.run());
    (addr, commands)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_two_clients_receive_match_start() {
    let (addr, commands) = start_server(ArenaConfig::default().with_start_delay_ms(60_000)).await;

    let a = Client::connect(addr, Player::new("a", "Alice")).await.unwrap();
    let b = Client::connect(addr, Player::new("b", "Bob")).await.unwrap();
    a.join("r1").await.unwrap();
    // Give the server a moment so "a" is seated first
    tokio::time::sleep(Duration::from_millis(50)).await;
    b.join("r1").await.unwrap();

    for client in [&a, &b] {
        let start = tokio::time::timeout(TIMEOUT, client.wait_match_start())
            .await
            .unwrap()
            .unwrap();
        let mut keys: Vec<&str> = start.seeds.keys().map(PlayerId::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!((start.width, start.height), (10, 24));
    }

    commands.send(ServerCommand::Stop).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_actions_show_up_in_state_updates() {
    let config = ArenaConfig::default()
        .with_start_delay_ms(0)
        .with_tick_interval_ms(60_000)
        .with_fps(50);
    let (addr, commands) = start_server(config).await;

    let a = Client::connect(addr, Player::new("a", "Alice")).await.unwrap();
    let b = Client::connect(addr, Player::new("b", "Bob")).await.unwrap();
    a.join("r1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    b.join("r1").await.unwrap();

    let start = tokio::time::timeout(TIMEOUT, a.wait_match_start())
        .await
        .unwrap()
        .unwrap();
    let game = a.start_match(&start).unwrap();
    assert_eq!(game.opponent().as_str(), "b");

    // Hard drop on the server shows up as locked cells in the mirrored board
    a.send_action(Action::Smash).await;
    let landed = tokio::time::timeout(TIMEOUT, async {
        loop {
            game.updates().recv_async().await.unwrap();
            let state = game.local().state();
            if state.grid.iter().flatten().any(|tile| tile.is_locked()) {
                return state;
            }
        }
    })
    .await
    .unwrap();
    assert!(!landed.game_over);

    commands.send(ServerCommand::Stop).unwrap();
}
