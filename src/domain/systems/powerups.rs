//! Powerup spawning, pickup and timed effects.
//!
//! Effects are keyed by player id and powerup type. Picking up a second powerup of a type that
//! is already active replaces the running effect (new value, new expiry) instead of stacking.

use crate::domain::state::{
    ActiveEffect, EntityId, MapBounds, Powerup, PowerupKind, PowerupSnapshot, Tank,
};
use crate::domain::tuning::powerup::{PowerupTuning, profile};
use rand::Rng;
use rand::rngs::SmallRng;
use std::collections::HashMap;
use tracing::{debug, info};

/// Read access to per-player multipliers, used by combat and movement.
pub trait EffectQuery {
    /// Multiplier for `kind` on `player_id`; 1.0 when no effect is active.
    fn effect_value(&self, player_id: EntityId, kind: PowerupKind, now: u64) -> f32;
}

/// Used where no powerups exist.
pub struct NoEffects;

impl EffectQuery for NoEffects {
    fn effect_value(&self, _player_id: EntityId, _kind: PowerupKind, _now: u64) -> f32 {
        1.0
    }
}

pub struct PowerupManager {
    tuning: PowerupTuning,
    powerups: Vec<Powerup>,
    effects: HashMap<EntityId, Vec<ActiveEffect>>,
    last_spawn: u64,
    next_id: EntityId,
    rng: SmallRng,
}

impl PowerupManager {
    pub fn new(tuning: PowerupTuning, now: u64, rng: SmallRng) -> Self {
        Self {
            tuning,
            powerups: Vec::new(),
            effects: HashMap::new(),
            last_spawn: now,
            next_id: 1,
            rng,
        }
    }

    /// Spawns on schedule and drops expired pickups and effects.
    ///
    /// Returns the powerup spawned on this call, if any.
    pub fn update(&mut self, bounds: MapBounds, now: u64) -> Option<Powerup> {
        let uncollected = self.powerups.iter().filter(|p| !p.collected).count();
        let due = now.saturating_sub(self.last_spawn) > self.tuning.spawn_interval_ms;
        let spawned = if due && uncollected < self.tuning.max_active {
            self.last_spawn = now;
            Some(self.spawn_powerup(bounds, now))
        } else {
            None
        };

        let lifetime = self.tuning.pickup_lifetime_ms;
        self.powerups.retain(|p| {
            if p.collected {
                // Instant pickups have no expiry and are done once applied.
                return p.expires_at.is_some_and(|at| now <= at);
            }
            now.saturating_sub(p.created_at) < lifetime
        });

        for effects in self.effects.values_mut() {
            effects.retain(|effect| effect.expires_at > now);
        }
        self.effects.retain(|_, effects| !effects.is_empty());

        spawned
    }

    /// Places a random powerup away from the map edges.
    pub fn spawn_powerup(&mut self, bounds: MapBounds, now: u64) -> Powerup {
        let kind = PowerupKind::ALL[self.rng.random_range(0..PowerupKind::ALL.len())];
        let settings = profile(kind);
        let margin = self.tuning.edge_margin;
        let x = margin + self.rng.random::<f32>() * (bounds.width - 2.0 * margin).max(0.0);
        let y = margin + self.rng.random::<f32>() * (bounds.height - 2.0 * margin).max(0.0);

        let powerup = Powerup {
            id: self.next_id,
            kind,
            x,
            y,
            created_at: now,
            value: settings.value,
            duration_ms: settings.duration_ms,
            collected: false,
            collected_by: None,
            expires_at: None,
        };
        self.next_id += 1;
        debug!(powerup_id = powerup.id, ?kind, x, y, "powerup spawned");
        self.powerups.push(powerup.clone());
        powerup
    }

    /// Collects at most one powerup under the player and applies it.
    pub fn check_collisions(&mut self, player: &mut Tank, now: u64) -> Option<Powerup> {
        let radius = self.tuning.pickup_radius;
        let powerup = self.powerups.iter_mut().find(|p| {
            !p.collected && crate::domain::math::distance(p.x, p.y, player.x, player.y) < radius
        })?;

        powerup.collected = true;
        powerup.collected_by = Some(player.id);

        if powerup.duration_ms > 0 {
            let expires_at = now + powerup.duration_ms;
            powerup.expires_at = Some(expires_at);
            let effect = ActiveEffect {
                kind: powerup.kind,
                value: powerup.value,
                expires_at,
            };
            let effects = self.effects.entry(player.id).or_default();
            match effects.iter_mut().find(|e| e.kind == effect.kind) {
                Some(existing) => *existing = effect,
                None => effects.push(effect),
            }
        } else {
            apply_instant(player, powerup.kind, powerup.value);
        }

        info!(
            player_id = player.id,
            powerup_id = powerup.id,
            kind = ?powerup.kind,
            "powerup collected"
        );
        Some(powerup.clone())
    }

    pub fn has_effect(&self, player_id: EntityId, kind: PowerupKind, now: u64) -> bool {
        self.find_effect(player_id, kind, now).is_some()
    }

    pub fn get_effect_value(&self, player_id: EntityId, kind: PowerupKind, now: u64) -> f32 {
        self.find_effect(player_id, kind, now)
            .map_or(1.0, |effect| effect.value)
    }

    pub fn player_effects(&self, player_id: EntityId, now: u64) -> Vec<ActiveEffect> {
        self.effects
            .get(&player_id)
            .map(|effects| {
                effects
                    .iter()
                    .filter(|e| e.expires_at > now)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn active_powerups(&self) -> impl Iterator<Item = &Powerup> {
        self.powerups.iter().filter(|p| !p.collected)
    }

    pub fn snapshots(&self) -> Vec<PowerupSnapshot> {
        self.active_powerups().map(PowerupSnapshot::from).collect()
    }

    pub fn remove_player(&mut self, player_id: EntityId) {
        self.effects.remove(&player_id);
    }

    pub fn clear_all(&mut self, now: u64) {
        self.powerups.clear();
        self.effects.clear();
        self.last_spawn = now;
    }

    fn find_effect(&self, player_id: EntityId, kind: PowerupKind, now: u64) -> Option<&ActiveEffect> {
        self.effects
            .get(&player_id)?
            .iter()
            .find(|e| e.kind == kind && e.expires_at > now)
    }
}

impl EffectQuery for PowerupManager {
    fn effect_value(&self, player_id: EntityId, kind: PowerupKind, now: u64) -> f32 {
        self.get_effect_value(player_id, kind, now)
    }
}

fn apply_instant(player: &mut Tank, kind: PowerupKind, value: f32) {
    match kind {
        PowerupKind::Health => player.heal(value),
        // Timed types never reach here; their duration is non-zero.
        PowerupKind::Speed | PowerupKind::Damage | PowerupKind::Shield | PowerupKind::RapidFire => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::TankKind;
    use crate::domain::state::Team;
    use rand::SeedableRng;

    fn manager(now: u64) -> PowerupManager {
        PowerupManager::new(PowerupTuning::default(), now, SmallRng::seed_from_u64(7))
    }

    fn place(manager: &mut PowerupManager, kind: PowerupKind, x: f32, y: f32, now: u64) -> EntityId {
        let settings = profile(kind);
        let id = manager.next_id;
        manager.next_id += 1;
        manager.powerups.push(Powerup {
            id,
            kind,
            x,
            y,
            created_at: now,
            value: settings.value,
            duration_ms: settings.duration_ms,
            collected: false,
            collected_by: None,
            expires_at: None,
        });
        id
    }

    fn player() -> Tank {
        Tank::new(1, TankKind::Assault, Team::Players, 100.0, 100.0)
    }

    #[test]
    fn when_speed_is_collected_then_effect_expires_at_duration() {
        let mut manager = manager(0);
        let mut tank = player();
        place(&mut manager, PowerupKind::Speed, 100.0, 100.0, 0);

        let collected = manager.check_collisions(&mut tank, 0).expect("collected");
        assert_eq!(collected.kind, PowerupKind::Speed);
        assert!(manager.has_effect(1, PowerupKind::Speed, 4999));
        assert!(!manager.has_effect(1, PowerupKind::Speed, 5001));
    }

    #[test]
    fn when_no_effect_is_active_then_value_defaults_to_one() {
        let manager = manager(0);
        assert_eq!(manager.get_effect_value(1, PowerupKind::Damage, 0), 1.0);
    }

    #[test]
    fn when_health_is_collected_then_health_is_clamped_to_archetype_max() {
        let mut manager = manager(0);
        let mut tank = player();
        tank.health = 90.0;
        place(&mut manager, PowerupKind::Health, 110.0, 100.0, 0);

        manager.check_collisions(&mut tank, 0).expect("collected");
        assert_eq!(tank.health, 100.0);
        assert!(!manager.has_effect(1, PowerupKind::Health, 1));
    }

    #[test]
    fn when_two_powerups_overlap_player_then_only_one_is_collected_per_call() {
        let mut manager = manager(0);
        let mut tank = player();
        place(&mut manager, PowerupKind::Damage, 100.0, 100.0, 0);
        place(&mut manager, PowerupKind::Shield, 105.0, 100.0, 0);

        assert!(manager.check_collisions(&mut tank, 0).is_some());
        assert_eq!(manager.active_powerups().count(), 1);
        assert!(manager.check_collisions(&mut tank, 0).is_some());
        assert_eq!(manager.active_powerups().count(), 0);
        assert!(manager.has_effect(1, PowerupKind::Damage, 10));
        assert!(manager.has_effect(1, PowerupKind::Shield, 10));
    }

    #[test]
    fn when_powerup_is_outside_pickup_radius_then_nothing_is_collected() {
        let mut manager = manager(0);
        let mut tank = player();
        place(&mut manager, PowerupKind::Speed, 131.0, 100.0, 0);
        assert!(manager.check_collisions(&mut tank, 0).is_none());
    }

    #[test]
    fn when_same_type_is_collected_twice_then_later_pickup_replaces_effect() {
        let mut manager = manager(0);
        let mut tank = player();
        place(&mut manager, PowerupKind::Speed, 100.0, 100.0, 0);
        manager.check_collisions(&mut tank, 0);
        place(&mut manager, PowerupKind::Speed, 100.0, 100.0, 3000);
        manager.check_collisions(&mut tank, 3000);

        let effects = manager.player_effects(1, 3000);
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].expires_at, 8000);
        assert!(manager.has_effect(1, PowerupKind::Speed, 7000));
    }

    #[test]
    fn when_spawn_interval_elapses_then_spawns_until_cap() {
        let tuning = PowerupTuning {
            spawn_interval_ms: 1000,
            ..PowerupTuning::default()
        };
        let mut manager = PowerupManager::new(tuning, 0, SmallRng::seed_from_u64(3));
        let bounds = MapBounds::new(800.0, 600.0);

        assert!(manager.update(bounds, 1000).is_none());
        let mut now = 1001;
        for _ in 0..3 {
            let spawned = manager.update(bounds, now).expect("spawned");
            assert!(spawned.x >= 50.0 && spawned.x <= 750.0);
            assert!(spawned.y >= 50.0 && spawned.y <= 550.0);
            now += 1001;
        }
        // Cap reached; every pickup is still within its lifetime.
        assert!(manager.update(bounds, now).is_none());
        assert_eq!(manager.active_powerups().count(), 3);
    }

    #[test]
    fn when_uncollected_powerup_outlives_duration_then_it_is_removed() {
        let mut manager = manager(0);
        let bounds = MapBounds::new(800.0, 600.0);
        manager.spawn_powerup(bounds, 0);
        manager.last_spawn = 20_000;

        manager.update(bounds, 9_999);
        assert_eq!(manager.active_powerups().count(), 1);
        manager.update(bounds, 10_000);
        assert_eq!(manager.active_powerups().count(), 0);
    }

    #[test]
    fn when_cleared_then_effects_and_pickups_are_gone() {
        let mut manager = manager(0);
        let mut tank = player();
        place(&mut manager, PowerupKind::Shield, 100.0, 100.0, 0);
        manager.check_collisions(&mut tank, 0);
        place(&mut manager, PowerupKind::Speed, 400.0, 400.0, 0);

        manager.clear_all(100);
        assert!(!manager.has_effect(1, PowerupKind::Shield, 200));
        assert_eq!(manager.active_powerups().count(), 0);
    }
}
