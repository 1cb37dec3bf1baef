/// Session dispatcher: one UDP endpoint serving every room
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::UdpSocket;

use crate::config::ArenaConfig;
use crate::error::{ArenaError, Result};
use crate::protocol::{Envelope, JoinMessage, RelayMessage};
use crate::room::{MessageSender, Room};
use crate::types::{Player, PlayerId, RoomStatus};

/// Commands that can be sent to a running server
#[derive(Debug, Clone)]
pub enum ServerCommand {
    /// Player is gone; the transport layer decides when that is
    Leave(PlayerId),
    /// Stop the receive loop
    Stop,
}

/// Player addresses, shared with rooms so they can reach their players
pub(crate) struct Outbox {
    socket: Arc<UdpSocket>,
    addrs: Mutex<HashMap<PlayerId, SocketAddr>>,
}

impl Outbox {
    fn addrs(&self) -> MutexGuard<'_, HashMap<PlayerId, SocketAddr>> {
        self.addrs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, player_id: PlayerId, addr: SocketAddr) {
        self.addrs().insert(player_id, addr);
    }

    fn unregister(&self, player_id: &PlayerId) {
        self.addrs().remove(player_id);
    }

    fn len(&self) -> usize {
        self.addrs().len()
    }
}

impl MessageSender for Outbox {
    fn send(&self, player_id: &PlayerId, msg: &[u8]) -> Result<()> {
        let Some(addr) = self.addrs().get(player_id).copied() else {
            tracing::warn!("Cannot get address of player '{}'", player_id);
            return Err(ArenaError::UnknownPlayer(player_id.clone()));
        };
        // Never wait on a full socket buffer; the next broadcast carries fresher state
        self.socket.try_send_to(msg, addr)?;
        Ok(())
    }
}

/// UDP server hosting any number of named rooms.
///
/// Datagrams are handled one at a time by [`Server::run`]; rooms run their
/// own loops and reach players through the shared address registry.
pub struct Server {
    config: ArenaConfig,
    socket: Arc<UdpSocket>,
    outbox: Arc<Outbox>,
    player_rooms: HashMap<PlayerId, String>,
    rooms: HashMap<String, Arc<Room>>,
    command_tx: flume::Sender<ServerCommand>,
    command_rx: flume::Receiver<ServerCommand>,
}

impl Server {
    /// Bind the UDP endpoint. Failing to bind is fatal for the server.
    pub async fn bind(config: ArenaConfig) -> Result<Self> {
        config.validate()?;
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        tracing::info!("Server listening on {}", socket.local_addr()?);
        let outbox = Arc::new(Outbox {
            socket: socket.clone(),
            addrs: Mutex::new(HashMap::new()),
        });
        let (command_tx, command_rx) = flume::unbounded();
        Ok(Server {
            config,
            socket,
            outbox,
            player_rooms: HashMap::new(),
            rooms: HashMap::new(),
            command_tx,
            command_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Get command sender for the server
    pub fn sender(&self) -> flume::Sender<ServerCommand> {
        self.command_tx.clone()
    }

    /// Number of registered players
    pub fn player_count(&self) -> usize {
        self.player_rooms.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.get(name).cloned()
    }

    /// Receive loop. Returns on [`ServerCommand::Stop`] or when every
    /// command sender is gone.
    pub async fn run(mut self) -> Result<()> {
        let socket = self.socket.clone();
        let command_rx = self.command_rx.clone();
        let mut buf = vec![0u8; self.config.max_datagram_size];
        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => match result {
                    Ok((len, addr)) => self.handle_datagram(&buf[..len], addr),
                    Err(e) => tracing::warn!("Cannot read from udp: {}", e),
                },
                command = command_rx.recv_async() => match command {
                    Ok(ServerCommand::Leave(player_id)) => {
                        if let Err(e) = self.leave(&player_id) {
                            tracing::warn!("Cannot remove player '{}': {}", player_id, e);
                        }
                    }
                    Ok(ServerCommand::Stop) => {
                        tracing::info!("Server received Stop command, exiting");
                        break;
                    }
                    Err(_) => {
                        tracing::info!("Server command channel closed");
                        break;
                    }
                },
            }
        }
        Ok(())
    }

    /// Decode and dispatch one datagram. Bad input is logged and dropped.
    pub fn handle_datagram(&mut self, bytes: &[u8], addr: SocketAddr) {
        let envelope = match Envelope::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Cannot parse datagram from {}: {}", addr, e);
                return;
            }
        };
        tracing::debug!("Got message from {}: {:?}", addr, envelope);

        let result = match envelope {
            Envelope::Join(join) => self.handle_join(join, addr).map(|_| ()),
            Envelope::Relay(relay) => self.handle_relay(relay),
        };
        if let Err(e) = result {
            tracing::warn!("Dropped message from {}: {}", addr, e);
        }
    }

    fn handle_join(&mut self, join: JoinMessage, addr: SocketAddr) -> Result<RoomStatus> {
        let JoinMessage {
            player_id,
            name,
            room: room_name,
        } = join;
        if self.player_rooms.contains_key(&player_id) {
            return Err(ArenaError::AlreadyJoined(player_id));
        }

        let room = self
            .rooms
            .entry(room_name.clone())
            .or_insert_with(|| {
                tracing::info!("Creating room '{}'", room_name);
                Arc::new(Room::new(room_name.clone(), self.config.clone(), self.outbox.clone()))
            })
            .clone();

        // The address must be known before joining: a second join sends the
        // match start to both players right away
        self.outbox.register(player_id.clone(), addr);
        self.player_rooms.insert(player_id.clone(), room_name.clone());

        match room.join(Player::new(player_id.clone(), name)) {
            Ok(status) => Ok(status),
            Err(e) => {
                self.outbox.unregister(&player_id);
                self.player_rooms.remove(&player_id);
                if room.is_empty() {
                    self.rooms.remove(&room_name);
                }
                Err(e)
            }
        }
    }

    fn handle_relay(&mut self, relay: RelayMessage) -> Result<()> {
        let room_name = self
            .player_rooms
            .get(&relay.player_id)
            .ok_or_else(|| ArenaError::UnknownPlayer(relay.player_id.clone()))?;
        let room = self
            .rooms
            .get(room_name)
            .ok_or_else(|| ArenaError::UnknownRoom(room_name.clone()))?;
        room.on_action(&relay.player_id, &relay.payload);
        Ok(())
    }

    /// Remove a player from its room and from every registry
    pub fn leave(&mut self, player_id: &PlayerId) -> Result<()> {
        let room_name = self
            .player_rooms
            .remove(player_id)
            .ok_or_else(|| ArenaError::UnknownPlayer(player_id.clone()))?;

        let room = self
            .rooms
            .get(&room_name)
            .cloned()
            .ok_or_else(|| ArenaError::UnknownRoom(room_name.clone()));
        // Loops are stopped before the address goes, so no broadcast is left
        // to miss it
        let status = room.and_then(|room| room.leave(player_id));
        self.outbox.unregister(player_id);
        if status? == RoomStatus::Empty {
            tracing::info!("Removing empty room '{}'", room_name);
            self.rooms.remove(&room_name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;
    use tetris_core::Action;

    async fn test_server() -> Server {
        let config = ArenaConfig::default()
            .with_bind_addr("127.0.0.1:0")
            .with_start_delay_ms(60_000);
        Server::bind(config).await.unwrap()
    }

    async fn peer() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    fn join(server: &mut Server, peer: &UdpSocket, id: &str, room: &str) {
        let bytes = Envelope::join(PlayerId::new(id), format!("name-{}", id), room)
            .encode()
            .unwrap();
        server.handle_datagram(&bytes, peer.local_addr().unwrap());
    }

    async fn recv_message(peer: &UdpSocket) -> ServerMessage {
        let mut buf = vec![0u8; 64 * 1024];
        let (len, _) = tokio::time::timeout(std::time::Duration::from_secs(5), peer.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        ServerMessage::decode(&buf[..len]).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_join_registers_player_and_room() {
        let mut server = test_server().await;
        let a = peer().await;
        join(&mut server, &a, "a", "r1");
        assert_eq!(server.player_count(), 1);
        assert_eq!(server.room_count(), 1);
        assert_eq!(server.room("r1").unwrap().status(), RoomStatus::AwaitingSecond);
        assert_eq!(server.outbox.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_second_join_sends_match_start() {
        let mut server = test_server().await;
        let (a, b) = (peer().await, peer().await);
        join(&mut server, &a, "a", "r1");
        join(&mut server, &b, "b", "r1");
        for socket in [&a, &b] {
            match recv_message(socket).await {
                ServerMessage::MatchStart(start) => assert_eq!(start.seeds.len(), 2),
                other => panic!("Expected match start, got {:?}", other),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_rejected_join_leaves_no_trace() {
        let mut server = test_server().await;
        let a = peer().await;
        let bytes = Envelope::join(PlayerId::new("a"), "", "r1").encode().unwrap();
        server.handle_datagram(&bytes, a.local_addr().unwrap());
        assert_eq!(server.player_count(), 0);
        assert_eq!(server.room_count(), 0);
        assert_eq!(server.outbox.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_full_room_rolls_back_only_the_late_player() {
        let mut server = test_server().await;
        let (a, b, c) = (peer().await, peer().await, peer().await);
        join(&mut server, &a, "a", "r1");
        join(&mut server, &b, "b", "r1");
        join(&mut server, &c, "c", "r1");
        assert_eq!(server.player_count(), 2);
        assert_eq!(server.outbox.len(), 2);
        assert_eq!(server.room("r1").unwrap().players().len(), 2);

        // Duplicate join does not disturb the seated player
        join(&mut server, &a, "a", "other");
        assert_eq!(server.room_count(), 1);
        assert_eq!(server.player_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_relay_routes_action() {
        let mut server = test_server().await;
        let (a, b) = (peer().await, peer().await);
        join(&mut server, &a, "a", "r1");
        join(&mut server, &b, "b", "r1");

        let bytes = Envelope::action(PlayerId::new("b"), Action::Tick).encode().unwrap();
        server.handle_datagram(&bytes, b.local_addr().unwrap());
        let room = server.room("r1").unwrap();
        assert_eq!(room.board_state(&PlayerId::new("b")).unwrap().offset_y, 1);
        assert_eq!(room.board_state(&PlayerId::new("a")).unwrap().offset_y, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_bad_datagrams_are_ignored() {
        let mut server = test_server().await;
        let a = peer().await;
        let addr = a.local_addr().unwrap();
        server.handle_datagram(b"garbage", addr);
        server.handle_datagram(&[], addr);
        let relay = Envelope::action(PlayerId::new("ghost"), Action::Smash).encode().unwrap();
        server.handle_datagram(&relay, addr);
        assert_eq!(server.player_count(), 0);
        assert_eq!(server.room_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_leave_cleans_registries() {
        let mut server = test_server().await;
        let (a, b) = (peer().await, peer().await);
        join(&mut server, &a, "a", "r1");
        join(&mut server, &b, "b", "r1");

        server.leave(&PlayerId::new("a")).unwrap();
        assert_eq!(server.player_count(), 1);
        assert_eq!(server.outbox.len(), 1);
        assert_eq!(server.room("r1").unwrap().status(), RoomStatus::AwaitingSecond);

        server.leave(&PlayerId::new("b")).unwrap();
        assert_eq!(server.player_count(), 0);
        assert_eq!(server.outbox.len(), 0);
        assert_eq!(server.room_count(), 0);

        assert!(matches!(
            server.leave(&PlayerId::new("b")),
            Err(ArenaError::UnknownPlayer(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_leave_during_running_match_stops_traffic() {
        let config = ArenaConfig::default()
            .with_bind_addr("127.0.0.1:0")
            .with_start_delay_ms(0)
            .with_fps(100);
        let mut server = Server::bind(config).await.unwrap();
        let (a, b) = (peer().await, peer().await);
        join(&mut server, &a, "a", "r1");
        join(&mut server, &b, "b", "r1");

        // Broadcasts are flowing to the leaving player
        recv_message(&a).await;
        recv_message(&a).await;

        server.leave(&PlayerId::new("a")).unwrap();
        let room = server.room("r1").unwrap();
        assert_eq!(room.status(), RoomStatus::AwaitingSecond);
        assert!(room.board_state(&PlayerId::new("b")).is_none());
        assert_eq!(server.outbox.len(), 1);

        // Drain what was in flight, then nothing more arrives
        let mut buf = vec![0u8; 64 * 1024];
        while let Ok(Ok(_)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), a.recv_from(&mut buf)).await
        {}
        let late =
            tokio::time::timeout(std::time::Duration::from_millis(100), a.recv_from(&mut buf)).await;
        assert!(late.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_send_to_unknown_player_fails() {
        let server = test_server().await;
        let result = server.outbox.send(&PlayerId::new("nobody"), b"hello");
        assert!(matches!(result, Err(ArenaError::UnknownPlayer(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_run_stops_on_command() {
        let server = test_server().await;
        let sender = server.sender();
        let handle = tokio::spawn(server.run());
        sender.send(ServerCommand::Stop).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_bind_rejects_small_board() {
        let config = ArenaConfig::default()
            .with_bind_addr("127.0.0.1:0")
            .with_board_size(5, 5);
        assert!(matches!(
            Server::bind(config).await,
            Err(ArenaError::Board(tetris_core::BoardError::InvalidSize { .. }))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_bind_failure_is_an_error() {
        let config = ArenaConfig::default().with_bind_addr("not an address");
        assert!(Server::bind(config).await.is_err());
    }
}
