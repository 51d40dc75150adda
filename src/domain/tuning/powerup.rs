use crate::domain::state::PowerupKind;

/// Gameplay tuning for powerup spawning and effects.
#[derive(Debug, Clone, Copy)]
pub struct PowerupTuning {
    /// Minimum time between two spawns, in milliseconds.
    pub spawn_interval_ms: u64,

    /// Cap on uncollected powerups lying on the map.
    pub max_active: usize,

    /// Time an uncollected powerup stays on the map, in milliseconds.
    pub pickup_lifetime_ms: u64,

    pub pickup_radius: f32,

    /// Distance kept from the map edges when spawning.
    pub edge_margin: f32,
}

impl Default for PowerupTuning {
    fn default() -> Self {
        Self {
            spawn_interval_ms: 10_000,
            max_active: 3,
            pickup_lifetime_ms: 10_000,
            pickup_radius: 30.0,
            edge_margin: 50.0,
        }
    }
}

/// Value and effect duration for one powerup type. A zero duration means instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerupProfile {
    pub value: f32,
    pub duration_ms: u64,
    pub color: &'static str,
}

pub fn profile(kind: PowerupKind) -> PowerupProfile {
    match kind {
        PowerupKind::Health => PowerupProfile {
            value: 30.0,
            duration_ms: 0,
            color: "#00FF00",
        },
        PowerupKind::Speed => PowerupProfile {
            value: 1.5,
            duration_ms: 5000,
            color: "#0088FF",
        },
        PowerupKind::Damage => PowerupProfile {
            value: 1.5,
            duration_ms: 7000,
            color: "#FF0000",
        },
        PowerupKind::Shield => PowerupProfile {
            value: 2.0,
            duration_ms: 4000,
            color: "#FFFF00",
        },
        PowerupKind::RapidFire => PowerupProfile {
            value: 0.5,
            duration_ms: 6000,
            color: "#FF00FF",
        },
    }
}
