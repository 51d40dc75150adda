use crate::domain::ports::{AudioSink, Clock};
use crate::domain::state::MapBounds;
use crate::domain::tuning::GameTuning;
use crate::use_cases::ArenaRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Parameters for chapter sessions started over the websocket.
#[derive(Debug, Clone)]
pub struct ChapterSettings {
    pub command_channel_capacity: usize,
    pub world_broadcast_capacity: usize,
    pub tick_interval: Duration,
    pub bounds: MapBounds,
    pub tuning: GameTuning,
}

#[derive(Clone)]
pub struct AppState {
    // Owns the set of live PvP arenas.
    pub arena_registry: Arc<ArenaRegistry>,
    // Arena used when a client does not name one.
    pub default_arena_id: Arc<str>,
    pub chapter: ChapterSettings,
    pub clock: Arc<dyn Clock>,
    // Handed to every chapter session.
    pub audio: Arc<dyn AudioSink>,
}
