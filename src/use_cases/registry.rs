// Arena orchestration for spawning and managing PvP worlds.

use crate::domain::ports::Clock;
use crate::domain::state::MapBounds;
use crate::domain::tuning::GameTuning;
use crate::use_cases::arena::{Arena, arena_task};
use crate::use_cases::types::{ArenaEvent, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

/// Shared configuration for spawning arena worlds.
#[derive(Debug, Clone)]
pub struct ArenaSettings {
    /// Capacity for inbound player intents.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Fixed tick interval for the world loop.
    pub tick_interval: Duration,
    pub bounds: MapBounds,
    pub tuning: GameTuning,
}

/// Errors returned by arena registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// Arena already exists and cannot be re-created.
    AlreadyExists,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::AlreadyExists => f.write_str("arena already exists"),
        }
    }
}

impl std::error::Error for ArenaError {}

/// Per-arena channels.
#[derive(Clone)]
pub struct ArenaHandle {
    /// Identifier clients use to target this arena.
    pub arena_id: Arc<str>,
    /// Sender for intents into the arena world task.
    pub input_tx: mpsc::Sender<ArenaEvent>,
    /// Broadcast sender for raw world updates.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world updates.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized world update.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    /// Stops the world task when the arena is removed.
    shutdown: Arc<Notify>,
}

/// Thread-safe registry for active arenas.
pub struct ArenaRegistry {
    /// Global settings applied to newly created arenas.
    settings: ArenaSettings,
    clock: Arc<dyn Clock>,
    /// Map of arena id to active handle.
    arenas: RwLock<HashMap<String, ArenaHandle>>,
}

impl ArenaRegistry {
    pub fn new(settings: ArenaSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            arenas: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new arena and spawns its world task.
    pub async fn create_arena(&self, arena_id: String) -> Result<ArenaHandle, ArenaError> {
        let mut arenas = self.arenas.write().await;
        if arenas.contains_key(&arena_id) {
            return Err(ArenaError::AlreadyExists);
        }

        let (input_tx, input_rx) =
            mpsc::channel::<ArenaEvent>(self.settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(self.settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let shutdown = Arc::new(Notify::new());

        let arena = Arena::new(
            self.settings.bounds,
            self.settings.tuning,
            rand::random::<u64>(),
            self.clock.now_millis(),
        );
        tokio::spawn(arena_task(
            arena,
            input_rx,
            world_tx.clone(),
            self.settings.tick_interval,
            self.clock.clone(),
            shutdown.clone(),
        ));

        let handle = ArenaHandle {
            arena_id: Arc::from(arena_id.as_str()),
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            shutdown,
        };
        info!(arena_id = %arena_id, "arena created");
        arenas.insert(arena_id, handle.clone());
        Ok(handle)
    }

    /// Returns an arena handle for the provided id, if it exists.
    pub async fn get_arena(&self, arena_id: &str) -> Option<ArenaHandle> {
        let arenas = self.arenas.read().await;
        arenas.get(arena_id).cloned()
    }

    /// Removes the arena and stops its world task. Returns false when it did not exist.
    pub async fn remove_arena(&self, arena_id: &str) -> bool {
        let removed = self.arenas.write().await.remove(arena_id);
        match removed {
            Some(handle) => {
                handle.shutdown.notify_one();
                info!(arena_id, "arena removed");
                true
            }
            None => false,
        }
    }

    pub async fn arena_ids(&self) -> Vec<String> {
        self.arenas.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::TankKind;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StepClock(AtomicU64);

    impl Clock for StepClock {
        fn now_millis(&self) -> u64 {
            self.0.fetch_add(16, Ordering::SeqCst)
        }
    }

    fn registry() -> ArenaRegistry {
        ArenaRegistry::new(
            ArenaSettings {
                input_channel_capacity: 16,
                world_broadcast_capacity: 256,
                tick_interval: Duration::from_millis(5),
                bounds: MapBounds::new(800.0, 600.0),
                tuning: GameTuning::default(),
            },
            Arc::new(StepClock(AtomicU64::new(0))),
        )
    }

    #[tokio::test]
    async fn when_arena_id_is_taken_then_create_fails() {
        let registry = registry();
        registry.create_arena("a".to_string()).await.expect("first");
        assert_eq!(
            registry.create_arena("a".to_string()).await.err(),
            Some(ArenaError::AlreadyExists)
        );
        assert!(registry.get_arena("a").await.is_some());
        assert!(registry.get_arena("b").await.is_none());
    }

    #[tokio::test]
    async fn when_arena_is_removed_then_its_world_stops_broadcasting() {
        let registry = registry();
        let handle = registry.create_arena("a".to_string()).await.expect("create");
        let mut world_rx = handle.world_tx.subscribe();
        handle
            .input_tx
            .send(ArenaEvent::Join {
                player_id: 1,
                kind: TankKind::Assault,
            })
            .await
            .expect("join");
        world_rx.recv().await.expect("arena is ticking");

        assert!(registry.remove_arena("a").await);
        assert!(!registry.remove_arena("a").await);
        assert!(registry.arena_ids().await.is_empty());

        // The world task drops its sender clone on exit; ours keeps the channel open, so
        // wait for the ticks to stop instead of for a close.
        tokio::time::sleep(Duration::from_millis(50)).await;
        while world_rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(world_rx.try_recv().is_err());
    }
}
