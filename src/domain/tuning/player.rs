/// Gameplay tuning for player-controlled tanks.

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Half extent of the tank box used against map blocks and map bounds.
    pub half_extent: f32,

    /// Health regained per tick once out of combat.
    pub health_regen: f32,

    /// Time without being hit before regeneration starts, in milliseconds.
    pub out_of_combat_ms: u64,

    /// Attempts when searching for a free spawn point.
    pub spawn_attempts: u32,

    pub score_per_kill: u32,

    /// Chapter spawn point.
    pub spawn_point: (f32, f32),

    /// Invulnerability after spawning, in milliseconds.
    pub spawn_protection_ms: u64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            half_extent: 20.0,
            health_regen: 0.05,
            out_of_combat_ms: 5000,
            spawn_attempts: 100,
            score_per_kill: 100,
            spawn_point: (50.0, 550.0),
            spawn_protection_ms: 2000,
        }
    }
}
