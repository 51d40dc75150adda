//! One intent/snapshot interface over both game modes.
//!
//! Callers send [`Intent`]s and subscribe to [`WorldUpdate`]s without knowing whether the
//! simulation runs in-process (a chapter task or an arena) or on a remote server.

use crate::domain::ports::Clock;
use crate::domain::state::EntityId;
use crate::use_cases::chapter::{ChapterSession, chapter_task};
use crate::use_cases::registry::ArenaHandle;
use crate::use_cases::types::{ArenaEvent, ChapterCommand, Intent, WorldUpdate};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

#[derive(Debug)]
pub enum TransportError {
    /// The simulation behind the transport is gone.
    Closed,
    /// The intent queue is full; the intent was dropped.
    Full,
    /// The intent does not exist in this transport's game mode.
    Unsupported(&'static str),
    Connect(String),
    Protocol(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Closed => f.write_str("transport closed"),
            TransportError::Full => f.write_str("intent queue full"),
            TransportError::Unsupported(intent) => write!(f, "`{intent}` is not supported here"),
            TransportError::Connect(e) => write!(f, "connect failed: {e}"),
            TransportError::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl<T> From<TrySendError<T>> for TransportError {
    fn from(e: TrySendError<T>) -> Self {
        match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Closed(_) => TransportError::Closed,
        }
    }
}

pub trait Transport: Send + Sync {
    /// Queues an intent without waiting.
    fn send(&self, intent: Intent) -> Result<(), TransportError>;

    /// Subscribes to world snapshots from now on.
    fn snapshots(&self) -> broadcast::Receiver<WorldUpdate>;
}

fn intent_name(intent: &Intent) -> &'static str {
    match intent {
        Intent::Join { .. } => "join",
        Intent::MoveTo { .. } => "move",
        Intent::Shoot { .. } => "shoot",
        Intent::Input(_) => "input",
        Intent::Ability => "ability",
        Intent::Restart => "restart",
        Intent::Leave => "leave",
    }
}

/// In-process transport to a chapter session. Dropping it ends the session.
pub struct LocalTransport {
    command_tx: mpsc::Sender<ChapterCommand>,
    world_tx: broadcast::Sender<WorldUpdate>,
}

impl LocalTransport {
    /// Spawns the chapter task for `session` and returns its transport.
    pub fn spawn(
        session: ChapterSession,
        command_capacity: usize,
        world_capacity: usize,
        tick_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(command_capacity);
        let (world_tx, _world_rx) = broadcast::channel(world_capacity);
        tokio::spawn(chapter_task(
            session,
            command_rx,
            world_tx.clone(),
            tick_interval,
            clock,
        ));
        Self {
            command_tx,
            world_tx,
        }
    }
}

impl Transport for LocalTransport {
    fn send(&self, intent: Intent) -> Result<(), TransportError> {
        let command = match intent {
            Intent::Input(input) => ChapterCommand::Input(input),
            Intent::Ability => ChapterCommand::Ability,
            Intent::Restart => ChapterCommand::Restart,
            other => return Err(TransportError::Unsupported(intent_name(&other))),
        };
        Ok(self.command_tx.try_send(command)?)
    }

    fn snapshots(&self) -> broadcast::Receiver<WorldUpdate> {
        self.world_tx.subscribe()
    }
}

/// In-process transport for one player of an arena.
pub struct ArenaTransport {
    player_id: EntityId,
    arena: ArenaHandle,
}

impl ArenaTransport {
    pub fn new(player_id: EntityId, arena: ArenaHandle) -> Self {
        Self { player_id, arena }
    }

    pub fn player_id(&self) -> EntityId {
        self.player_id
    }
}

impl Transport for ArenaTransport {
    fn send(&self, intent: Intent) -> Result<(), TransportError> {
        let player_id = self.player_id;
        let event = match intent {
            Intent::Join { kind } => ArenaEvent::Join { player_id, kind },
            Intent::MoveTo { x, y, angle } => ArenaEvent::MoveTo {
                player_id,
                x,
                y,
                angle,
            },
            Intent::Shoot { angle, speed } => ArenaEvent::Shoot {
                player_id,
                angle,
                speed,
            },
            Intent::Leave => ArenaEvent::Leave { player_id },
            other => return Err(TransportError::Unsupported(intent_name(&other))),
        };

        match self.arena.input_tx.try_send(event) {
            // A dropped leave would strand the tank, so wait for room instead.
            Err(TrySendError::Full(event @ ArenaEvent::Leave { .. })) => {
                debug!(player_id, "input queue full; deferring leave");
                let input_tx = self.arena.input_tx.clone();
                tokio::spawn(async move {
                    let _ = input_tx.send(event).await;
                });
                Ok(())
            }
            result => Ok(result?),
        }
    }

    fn snapshots(&self) -> broadcast::Receiver<WorldUpdate> {
        self.arena.world_tx.subscribe()
    }
}
