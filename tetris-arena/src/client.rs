//! Client side of the arena: joins a room and mirrors the server's boards.
//!
//! The server is authoritative. A [`ClientMatch`] holds two display boards,
//! one for the local player and one for the opponent, which are overwritten
//! with every state update the server broadcasts.

use std::sync::Arc;

use tetris_core::{Action, Board, SeededSource, SharedBoard};
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::task::JoinHandle;

use crate::error::{ArenaError, Result};
use crate::protocol::{Envelope, MatchStart, ServerMessage, StateUpdate};
use crate::types::{Player, PlayerId};

/// Receive buffer, one datagram per message
const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// Connection to an arena server
pub struct Client {
    player: Player,
    socket: Arc<UdpSocket>,
}

impl Client {
    /// Bind an ephemeral local socket and connect it to the server
    pub async fn connect(server: impl ToSocketAddrs, player: Player) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(server).await?;
        tracing::info!(
            "Player '{}' ({}) connected from {} to {}",
            player.name,
            player.id,
            socket.local_addr()?,
            socket.peer_addr()?
        );
        Ok(Client {
            player,
            socket: Arc::new(socket),
        })
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Ask the server to seat this player in `room`
    pub async fn join(&self, room: &str) -> Result<()> {
        let envelope = Envelope::join(self.player.id.clone(), self.player.name.clone(), room);
        self.send(&envelope).await
    }

    /// Relay an action to this player's board on the server.
    ///
    /// Delivery is best effort: a failed send is logged and dropped.
    pub async fn send_action(&self, action: Action) {
        let envelope = Envelope::action(self.player.id.clone(), action);
        if let Err(e) = self.send(&envelope).await {
            tracing::warn!("Cannot send {:?}: {}", action, e);
        }
    }

    async fn send(&self, envelope: &Envelope) -> Result<()> {
        let bytes = envelope.encode()?;
        self.socket.send(&bytes).await?;
        Ok(())
    }

    /// Wait for the match to start, skipping anything else the server sends
    pub async fn wait_match_start(&self) -> Result<MatchStart> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            match recv_message(&self.socket, &mut buf).await? {
                ServerMessage::MatchStart(start) => return Ok(start),
                other => tracing::debug!("Waiting for match start, skipped {:?}", other),
            }
        }
    }

    /// Build the display boards for a started match and start mirroring
    /// server updates into them
    pub fn start_match(&self, start: &MatchStart) -> Result<ClientMatch> {
        let me = self.player.id.clone();
        let opponent = start
            .opponent_of(&me)
            .cloned()
            .ok_or_else(|| ArenaError::Protocol("match start without opponent".to_string()))?;
        let local_seed = start
            .seeds
            .get(&me)
            .copied()
            .ok_or_else(|| ArenaError::Protocol(format!("match start without seed for '{}'", me)))?;
        let remote_seed = start.seeds.get(&opponent).copied().unwrap_or_default();

        let display = |seed: i64| -> Result<SharedBoard> {
            let board = Board::builder()
                .with_size(start.width, start.height)
                .with_source(SeededSource::new(seed))
                .build()?;
            Ok(SharedBoard::new(board))
        };
        let local = display(local_seed)?;
        let remote = display(remote_seed)?;

        let (updates_tx, updates_rx) = flume::bounded(1);
        let listener = tokio::spawn(listen(
            self.socket.clone(),
            me,
            opponent.clone(),
            local.clone(),
            remote.clone(),
            updates_tx,
        ));

        tracing::info!("Match started against '{}'", opponent);
        Ok(ClientMatch {
            opponent,
            local,
            remote,
            updates: updates_rx,
            listener,
        })
    }
}

async fn recv_message(socket: &UdpSocket, buf: &mut [u8]) -> Result<ServerMessage> {
    loop {
        let len = socket.recv(buf).await?;
        match ServerMessage::decode(&buf[..len]) {
            Ok(message) => return Ok(message),
            Err(e) => tracing::warn!("Cannot parse server message: {}", e),
        }
    }
}

async fn listen(
    socket: Arc<UdpSocket>,
    me: PlayerId,
    opponent: PlayerId,
    local: SharedBoard,
    remote: SharedBoard,
    updates: flume::Sender<()>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let message = match recv_message(&socket, &mut buf).await {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Cannot read from server: {}", e);
                continue;
            }
        };
        match message {
            ServerMessage::StateUpdate(StateUpdate { states }) => {
                for (player_id, state) in states {
                    let board = if player_id == me {
                        &local
                    } else if player_id == opponent {
                        &remote
                    } else {
                        tracing::warn!("State update for unknown player '{}'", player_id);
                        continue;
                    };
                    if let Err(e) = board.set_state(state) {
                        tracing::warn!("Cannot apply state of '{}': {}", player_id, e);
                    }
                }
                // A pending notification already covers this update
                let _ = updates.try_send(());
            }
            ServerMessage::MatchStart(_) => {
                tracing::debug!("Ignored repeated match start");
            }
        }
    }
}

/// Display side of a running match
pub struct ClientMatch {
    opponent: PlayerId,
    local: SharedBoard,
    remote: SharedBoard,
    updates: flume::Receiver<()>,
    listener: JoinHandle<()>,
}

impl ClientMatch {
    pub fn opponent(&self) -> &PlayerId {
        &self.opponent
    }

    /// This player's board as last reported by the server
    pub fn local(&self) -> &SharedBoard {
        &self.local
    }

    pub fn remote(&self) -> &SharedBoard {
        &self.remote
    }

    /// Signalled after each applied state update
    pub fn updates(&self) -> &flume::Receiver<()> {
        &self.updates
    }
}

impl Drop for ClientMatch {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
