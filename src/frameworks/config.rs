use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("TANK_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn tick_interval() -> Duration {
    let millis = env::var("TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(1000 / 60);
    Duration::from_millis(millis)
}

// Playfield size shared by arenas and chapters.
pub fn arena_size() -> (f32, f32) {
    let read = |key: &str, default: f32| {
        env::var(key)
            .ok()
            .and_then(|value| value.parse::<f32>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(default)
    };
    (read("ARENA_WIDTH", 800.0), read("ARENA_HEIGHT", 600.0))
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
// Chapter inputs are held state, so a short queue is enough.
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_ARENA_ID: &str = "default";
