/// Two-player match coordination
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tetris_core::{Action, Board, SeededSource, SharedBoard, TetrisState};
use tokio::task::JoinHandle;

use crate::config::ArenaConfig;
use crate::error::{ArenaError, Result};
use crate::protocol::{self, MatchStart, ServerMessage, StateUpdate};
use crate::types::{Player, PlayerId, RoomStatus};

/// Outbound delivery of an encoded message to a player
pub trait MessageSender: Send + Sync {
    fn send(&self, player_id: &PlayerId, msg: &[u8]) -> Result<()>;
}

/// Rows cleared on the board of the given slot
type GarbageEvent = (usize, usize);

/// Running match: both boards plus the channel their row clears arrive on.
///
/// Boards never call each other. A board's completion handler only queues a
/// garbage event; whoever mutated a board drains the queue afterwards and
/// feeds the sibling board under its own lock.
struct Match {
    players: [PlayerId; 2],
    boards: [SharedBoard; 2],
    garbage_rx: flume::Receiver<GarbageEvent>,
}

impl Match {
    fn new(players: [PlayerId; 2], seeds: [i64; 2], config: &ArenaConfig) -> Result<Self> {
        let (garbage_tx, garbage_rx) = flume::unbounded();
        let build = |slot: usize| -> Result<SharedBoard> {
            let tx = garbage_tx.clone();
            let board = Board::builder()
                .with_size(config.width, config.height)
                .with_source(SeededSource::new(seeds[slot]))
                .with_complete_handler(move |rows| {
                    if rows > 0 {
                        let _ = tx.send((slot, rows));
                    }
                })
                .build()?;
            Ok(SharedBoard::new(board))
        };
        let boards = [build(0)?, build(1)?];
        Ok(Match {
            players,
            boards,
            garbage_rx,
        })
    }

    fn slot_of(&self, player_id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|id| id == player_id)
    }

    fn apply(&self, slot: usize, action: Action) {
        self.boards[slot].apply(action);
        self.flush_garbage();
    }

    fn tick(&self) {
        for board in &self.boards {
            board.apply(Action::Tick);
        }
        self.flush_garbage();
    }

    // Garbage landing on a board may complete rows there in turn, so keep
    // draining until the queue is empty
    fn flush_garbage(&self) {
        while let Ok((slot, rows)) = self.garbage_rx.try_recv() {
            let sibling = 1 - slot;
            tracing::debug!(
                "Player '{}' cleared {} row(s), filling board of '{}'",
                self.players[slot],
                rows,
                self.players[sibling]
            );
            self.boards[sibling].apply_repeated(Action::Fill, rows);
        }
    }

    fn state_update(&self) -> StateUpdate {
        self.flush_garbage();
        let states = self
            .players
            .iter()
            .cloned()
            .zip(self.boards.iter().map(SharedBoard::state))
            .collect::<HashMap<PlayerId, TetrisState>>();
        StateUpdate { states }
    }

    fn broadcast(&self, room: &str, sender: &dyn MessageSender) {
        let message = ServerMessage::StateUpdate(self.state_update());
        match message.encode() {
            Ok(bytes) => send_to_all(room, sender, &self.players, &bytes, "state update"),
            Err(e) => tracing::error!("Room '{}' cannot encode state update: {}", room, e),
        }
    }
}

fn send_to_all(room: &str, sender: &dyn MessageSender, players: &[PlayerId], bytes: &[u8], what: &str) {
    for player_id in players {
        if let Err(e) = sender.send(player_id, bytes) {
            tracing::warn!(
                "Room '{}' cannot send {} to player '{}': {}",
                room,
                what,
                player_id,
                e
            );
        }
    }
}

struct RoomInner {
    rng: ChaCha8Rng,
    // Slot one is always filled before slot two
    slots: [Option<Player>; 2],
    game: Option<Arc<Match>>,
    loops: Vec<JoinHandle<()>>,
}

impl RoomInner {
    fn status(&self) -> RoomStatus {
        match (&self.slots[0], &self.slots[1]) {
            (None, _) => RoomStatus::Empty,
            (Some(_), None) => RoomStatus::AwaitingSecond,
            (Some(_), Some(_)) => RoomStatus::Running,
        }
    }

    // Loops go first so none of them outlives the boards it drives
    fn stop_game(&mut self) {
        for handle in self.loops.drain(..) {
            handle.abort();
        }
        self.game = None;
    }
}

/// Match between two players: two boards, a gravity loop and a broadcast loop
pub struct Room {
    name: String,
    config: ArenaConfig,
    sender: Arc<dyn MessageSender>,
    inner: Mutex<RoomInner>,
}

impl Room {
    pub fn new(name: impl Into<String>, config: ArenaConfig, sender: Arc<dyn MessageSender>) -> Self {
        Self::with_rng(name, config, sender, ChaCha8Rng::from_rng(&mut rand::rng()))
    }

    /// Room whose board seeds are derived from `seed`
    pub fn with_seed(
        name: impl Into<String>,
        config: ArenaConfig,
        sender: Arc<dyn MessageSender>,
        seed: u64,
    ) -> Self {
        Self::with_rng(name, config, sender, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(
        name: impl Into<String>,
        config: ArenaConfig,
        sender: Arc<dyn MessageSender>,
        rng: ChaCha8Rng,
    ) -> Self {
        Room {
            name: name.into(),
            config,
            sender,
            inner: Mutex::new(RoomInner {
                rng,
                slots: [None, None],
                game: None,
                loops: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RoomInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> RoomStatus {
        self.lock().status()
    }

    /// Occupants in slot order
    pub fn players(&self) -> Vec<Player> {
        self.lock().slots.iter().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.status() == RoomStatus::Empty
    }

    /// Snapshot of a player's board while the match runs
    pub fn board_state(&self, player_id: &PlayerId) -> Option<TetrisState> {
        let game = self.lock().game.clone()?;
        let slot = game.slot_of(player_id)?;
        Some(game.boards[slot].state())
    }

    /// Seat a player. Filling the second seat starts the match.
    ///
    /// Must be called from within a tokio runtime.
    pub fn join(&self, player: Player) -> Result<RoomStatus> {
        if player.id.is_empty() || player.name.is_empty() {
            return Err(ArenaError::InvalidPlayer(
                "player id or name cannot be empty".to_string(),
            ));
        }

        let mut inner = self.lock();
        if inner.slots.iter().flatten().any(|p| *p == player) {
            return Err(ArenaError::AlreadyJoined(player.id));
        }
        let Some(slot) = inner.slots.iter().position(Option::is_none) else {
            return Err(ArenaError::RoomFull(self.name.clone()));
        };
        tracing::info!(
            "Player '{}' ({}) joined room '{}' in slot {}",
            player.name,
            player.id,
            self.name,
            slot + 1
        );
        inner.slots[slot] = Some(player);

        if inner.status() == RoomStatus::Running {
            if let Err(e) = self.start_game(&mut inner) {
                tracing::error!("Room '{}' cannot start match: {}", self.name, e);
                inner.slots[slot] = None;
                inner.stop_game();
                return Err(e);
            }
        }
        Ok(inner.status())
    }

    /// Vacate a player's seat and tear the match down
    pub fn leave(&self, player_id: &PlayerId) -> Result<RoomStatus> {
        let mut inner = self.lock();
        let Some(slot) = inner
            .slots
            .iter()
            .position(|p| p.as_ref().is_some_and(|p| &p.id == player_id))
        else {
            return Err(ArenaError::NotInRoom {
                player: player_id.clone(),
                room: self.name.clone(),
            });
        };

        let promoted = inner.slots[1].take();
        if slot == 0 {
            inner.slots[0] = promoted;
        }
        inner.stop_game();
        tracing::info!(
            "Player '{}' left room '{}', room is {}",
            player_id,
            self.name,
            inner.status()
        );
        Ok(inner.status())
    }

    /// Route an encoded action from a player to that player's board
    pub fn on_action(&self, player_id: &PlayerId, payload: &[u8]) {
        let action = match protocol::decode_action(payload) {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!(
                    "Room '{}' cannot parse action from player '{}': {}",
                    self.name,
                    player_id,
                    e
                );
                return;
            }
        };

        let Some(game) = self.lock().game.clone() else {
            tracing::debug!(
                "Room '{}' ignored {:?} from '{}': no match running",
                self.name,
                action,
                player_id
            );
            return;
        };
        match game.slot_of(player_id) {
            Some(slot) => game.apply(slot, action),
            None => tracing::warn!(
                "Room '{}' unrecognized player id: {}",
                self.name,
                player_id
            ),
        }
    }

    fn start_game(&self, inner: &mut RoomInner) -> Result<()> {
        let players = match &inner.slots {
            [Some(first), Some(second)] => [first.id.clone(), second.id.clone()],
            _ => return Err(ArenaError::Protocol("match needs two players".to_string())),
        };
        let seeds: [i64; 2] = [inner.rng.random(), inner.rng.random()];
        let game = Arc::new(Match::new(players.clone(), seeds, &self.config)?);

        let start = ServerMessage::MatchStart(MatchStart {
            seeds: players.iter().cloned().zip(seeds).collect(),
            tick_rate_fps: self.config.fps,
            width: self.config.width,
            height: self.config.height,
        });
        let bytes = start.encode()?;
        send_to_all(&self.name, self.sender.as_ref(), &players, &bytes, "match start");
        tracing::info!(
            "Room '{}' started match between '{}' and '{}'",
            self.name,
            players[0],
            players[1]
        );

        inner.loops = vec![self.spawn_tick_loop(game.clone()), self.spawn_broadcast_loop(game.clone())];
        inner.game = Some(game);
        Ok(())
    }

    fn spawn_tick_loop(&self, game: Arc<Match>) -> JoinHandle<()> {
        let delay = self.config.start_delay();
        let period = self.config.tick_interval();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut interval = tokio::time::interval(period);
            // First tick of an interval completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                game.tick();
            }
        })
    }

    fn spawn_broadcast_loop(&self, game: Arc<Match>) -> JoinHandle<()> {
        let delay = self.config.start_delay();
        let period = self.config.broadcast_interval();
        let sender = self.sender.clone();
        let room = self.name.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                game.broadcast(&room, sender.as_ref());
            }
        })
    }
}

impl Drop for Room {
    fn drop(&mut self) {
        self.lock().stop_game();
    }
}
