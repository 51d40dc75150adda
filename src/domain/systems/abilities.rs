// Per-tank special ability slot: cooldown tracking, timed modifiers and instant effects.

use crate::domain::catalog::{AbilityEffect, SpecialAbility, TankKind};
use crate::domain::math::distance;
use crate::domain::state::{EntityId, Projectile, Tank};
use crate::domain::systems::combat::TargetView;
use tracing::info;

/// What an activation asks the driver to do right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// A modifier that stays on until the ability duration ends.
    Timed(AbilityEffect),
    /// A one-shot effect the driver resolves this tick.
    Instant(AbilityEffect),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilitySlot {
    ability: Option<SpecialAbility>,
    activated_at: Option<u64>,
}

impl AbilitySlot {
    pub fn for_kind(kind: TankKind) -> Self {
        Self {
            ability: kind.archetype().ability,
            activated_at: None,
        }
    }

    pub fn ability(&self) -> Option<&SpecialAbility> {
        self.ability.as_ref()
    }

    /// Milliseconds until the ability can be used again; 0 when ready.
    pub fn cooldown_remaining(&self, now: u64) -> u64 {
        match (self.ability, self.activated_at) {
            (Some(ability), Some(at)) => (at + ability.cooldown_ms).saturating_sub(now),
            _ => 0,
        }
    }

    pub fn try_activate(&mut self, tank_id: EntityId, now: u64) -> Option<Activation> {
        let ability = self.ability?;
        if self.cooldown_remaining(now) > 0 {
            return None;
        }
        self.activated_at = Some(now);
        info!(tank_id, ability = ability.name, "ability activated");

        Some(match ability.effect {
            effect @ (AbilityEffect::ReloadBoost { .. }
            | AbilityEffect::Scope { .. }
            | AbilityEffect::Afterburner { .. }) => Activation::Timed(effect),
            effect @ (AbilityEffect::Shockwave { .. } | AbilityEffect::ClusterBomb { .. }) => {
                Activation::Instant(effect)
            }
        })
    }

    fn active_effect(&self, now: u64) -> Option<AbilityEffect> {
        let ability = self.ability?;
        let at = self.activated_at?;
        (now < at + ability.duration_ms).then_some(ability.effect)
    }

    pub fn is_active(&self, now: u64) -> bool {
        self.active_effect(now).is_some()
    }

    pub fn reload_multiplier(&self, now: u64) -> f32 {
        match self.active_effect(now) {
            Some(AbilityEffect::ReloadBoost { reload_multiplier }) => reload_multiplier,
            _ => 1.0,
        }
    }

    pub fn speed_multiplier(&self, now: u64) -> f32 {
        match self.active_effect(now) {
            Some(AbilityEffect::Afterburner {
                speed_multiplier, ..
            }) => speed_multiplier,
            _ => 1.0,
        }
    }

    pub fn damage_multiplier(&self, now: u64) -> f32 {
        match self.active_effect(now) {
            Some(AbilityEffect::Scope {
                damage_multiplier, ..
            }) => damage_multiplier,
            _ => 1.0,
        }
    }

    /// Reach multiplier; projectiles live a fixed time, so reach scales projectile speed.
    pub fn range_multiplier(&self, now: u64) -> f32 {
        match self.active_effect(now) {
            Some(AbilityEffect::Scope {
                range_multiplier, ..
            }) => range_multiplier,
            _ => 1.0,
        }
    }

    pub fn invulnerable(&self, now: u64) -> bool {
        matches!(
            self.active_effect(now),
            Some(AbilityEffect::Afterburner {
                invincible: true,
                ..
            })
        )
    }

    /// Forgets any activation, so the ability is ready and nothing is running.
    pub fn reset(&mut self) {
        self.activated_at = None;
    }
}

/// Targets within `radius` of the origin that a shockwave affects.
pub fn shockwave_targets(
    origin_x: f32,
    origin_y: f32,
    radius: f32,
    targets: &[TargetView],
) -> Vec<EntityId> {
    targets
        .iter()
        .filter(|t| !t.invulnerable && distance(origin_x, origin_y, t.x, t.y) <= radius)
        .map(|t| t.id)
        .collect()
}

/// Fires `count` projectiles fanned evenly across `spread` radians around `aim`.
pub fn cluster_volley(
    shooter: &Tank,
    aim: f32,
    count: u32,
    spread: f32,
    next_id: &mut EntityId,
    now: u64,
) -> Vec<Projectile> {
    let weapon = shooter.archetype().weapon;
    let step = if count > 1 {
        spread / (count - 1) as f32
    } else {
        0.0
    };
    let first = if count > 1 { aim - spread / 2.0 } else { aim };

    (0..count)
        .map(|i| {
            let id = *next_id;
            *next_id += 1;
            Projectile {
                id,
                owner_id: shooter.id,
                team: shooter.team,
                x: shooter.x,
                y: shooter.y,
                angle: first + step * i as f32,
                speed: weapon.projectile_speed,
                damage: weapon.damage,
                explosion_radius: weapon.explosion_radius,
                created_at: now,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Team;

    #[test]
    fn when_on_cooldown_then_activation_is_refused() {
        let mut slot = AbilitySlot::for_kind(TankKind::Assault);
        assert!(matches!(
            slot.try_activate(1, 1_000),
            Some(Activation::Timed(AbilityEffect::ReloadBoost { .. }))
        ));
        assert_eq!(slot.cooldown_remaining(5_000), 6_000);
        assert!(slot.try_activate(1, 10_999).is_none());
        assert!(slot.try_activate(1, 11_000).is_some());
    }

    #[test]
    fn when_timed_ability_runs_then_modifiers_apply_until_duration_ends() {
        let mut slot = AbilitySlot::for_kind(TankKind::Scout);
        slot.try_activate(1, 0);
        assert_eq!(slot.speed_multiplier(1_999), 1.8);
        assert!(slot.invulnerable(1_999));
        assert_eq!(slot.speed_multiplier(2_000), 1.0);
        assert!(!slot.invulnerable(2_000));

        let mut sniper = AbilitySlot::for_kind(TankKind::Sniper);
        sniper.try_activate(2, 0);
        assert_eq!(sniper.damage_multiplier(100), 1.8);
        assert_eq!(sniper.range_multiplier(100), 1.5);
        assert_eq!(sniper.reload_multiplier(100), 1.0);
    }

    #[test]
    fn when_reset_then_cooldown_and_effect_are_cleared() {
        let mut slot = AbilitySlot::for_kind(TankKind::Assault);
        slot.try_activate(1, 0);
        slot.reset();
        assert_eq!(slot.cooldown_remaining(10), 0);
        assert!(!slot.is_active(10));
        assert_eq!(slot.reload_multiplier(10), 1.0);
    }

    #[test]
    fn when_heavy_activates_then_shockwave_is_instant() {
        let mut slot = AbilitySlot::for_kind(TankKind::Heavy);
        let activation = slot.try_activate(1, 0);
        assert_eq!(
            activation,
            Some(Activation::Instant(AbilityEffect::Shockwave {
                radius: 150.0,
                damage: 15.0,
                knockback: 100.0,
            }))
        );

        let near = Tank::new(2, TankKind::Assault, Team::Enemies, 100.0, 0.0);
        let far = Tank::new(3, TankKind::Assault, Team::Enemies, 200.0, 0.0);
        let targets = [TargetView::of(&near, false), TargetView::of(&far, false)];
        assert_eq!(shockwave_targets(0.0, 0.0, 150.0, &targets), vec![2]);
    }

    #[test]
    fn when_cluster_bomb_fires_then_volley_fans_around_aim() {
        let shooter = Tank::new(1, TankKind::Demolisher, Team::Players, 100.0, 100.0);
        let mut next_id = 10;
        let volley = cluster_volley(&shooter, 1.0, 5, 0.6, &mut next_id, 50);
        assert_eq!(volley.len(), 5);
        assert_eq!(next_id, 15);
        assert!((volley[0].angle - 0.7).abs() < 1e-6);
        assert!((volley[2].angle - 1.0).abs() < 1e-6);
        assert!((volley[4].angle - 1.3).abs() < 1e-6);
        assert!(volley.iter().all(|p| p.explosion_radius == Some(80.0)));
    }
}
