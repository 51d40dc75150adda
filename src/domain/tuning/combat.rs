/// Gameplay tuning for projectiles and hit resolution.

#[derive(Debug, Clone, Copy)]
pub struct CombatTuning {
    /// Projectile-center to tank-center distance that counts as a hit.
    pub hit_radius: f32,

    /// Lifetime in milliseconds before a projectile is despawned.
    pub projectile_lifetime_ms: u64,

    /// Edge length of the projectile box used against map blocks.
    pub projectile_box: f32,

    /// Whether projectiles may damage tanks on the shooter's own team.
    pub friendly_fire: bool,

    /// Share of a projectile's damage dealt to other tanks inside its explosion radius.
    pub splash_factor: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            hit_radius: 25.0,
            projectile_lifetime_ms: 3000,
            projectile_box: 5.0,
            friendly_fire: false,
            splash_factor: 0.5,
        }
    }
}
