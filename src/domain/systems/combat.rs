//! Projectile movement and hit resolution.
//!
//! Combat is the only system that removes projectiles. It never mutates tanks directly: hits
//! are returned as [`HitEvent`]s so each driver applies damage through whoever owns the
//! victim (the enemy engine for enemies, the session or arena for players).

use crate::domain::math::distance;
use crate::domain::state::{EntityId, MapBlock, MapBounds, PowerupKind, Projectile, Tank, Team};
use crate::domain::systems::map::projectile_block_hit;
use crate::domain::systems::powerups::EffectQuery;
use crate::domain::tuning::combat::CombatTuning;
use tracing::{debug, info};

/// What combat needs to know about a potential victim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    pub id: EntityId,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub invulnerable: bool,
}

impl TargetView {
    pub fn of(tank: &Tank, invulnerable: bool) -> Self {
        Self {
            id: tank.id,
            team: tank.team,
            x: tank.x,
            y: tank.y,
            invulnerable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitEvent {
    pub projectile_id: EntityId,
    pub shooter_id: EntityId,
    pub victim_id: EntityId,
    pub x: f32,
    pub y: f32,
    /// Final damage after the shooter's DAMAGE and the victim's SHIELD multipliers.
    pub damage: f32,
    /// True for explosion damage to a tank near the impact point.
    pub splash: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockHit {
    pub projectile_id: EntityId,
    pub x: f32,
    pub y: f32,
    pub destroyed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Default)]
pub struct CombatOutcome {
    pub hits: Vec<HitEvent>,
    pub block_hits: Vec<BlockHit>,
    pub explosions: Vec<Explosion>,
}

impl CombatOutcome {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.block_hits.is_empty() && self.explosions.is_empty()
    }
}

pub fn is_hostile(shooter_team: Team, target_team: Team, friendly_fire: bool) -> bool {
    match (shooter_team, target_team) {
        (Team::FreeForAll, _) | (_, Team::FreeForAll) => true,
        (a, b) => a != b || friendly_fire,
    }
}

/// Moves every projectile one tick along its heading and drops the ones that left the map
/// or outlived the configured lifetime. Returns how many were dropped.
pub fn advance_projectiles(
    projectiles: &mut Vec<Projectile>,
    bounds: MapBounds,
    now: u64,
    tuning: &CombatTuning,
) -> usize {
    for p in projectiles.iter_mut() {
        p.x += p.angle.cos() * p.speed;
        p.y += p.angle.sin() * p.speed;
    }

    let before = projectiles.len();
    projectiles.retain(|p| {
        bounds.contains(p.x, p.y)
            && p.x.is_finite()
            && p.y.is_finite()
            && now.saturating_sub(p.created_at) < tuning.projectile_lifetime_ms
    });
    before - projectiles.len()
}

fn scaled_damage(
    base: f32,
    shooter_id: EntityId,
    victim_id: EntityId,
    effects: &dyn EffectQuery,
    now: u64,
) -> f32 {
    let boost = effects.effect_value(shooter_id, PowerupKind::Damage, now);
    let shield = effects.effect_value(victim_id, PowerupKind::Shield, now);
    if shield > 0.0 {
        base * boost / shield
    } else {
        base * boost
    }
}

/// Resolves projectile impacts against tanks and blocks.
///
/// `targets` should only hold living tanks. A projectile hits the first hostile target whose
/// center lies within the hit radius, otherwise the first block its box overlaps; either way
/// it is removed. Destructible blocks lose the projectile's damage in health and disappear at
/// zero. Explosive projectiles also splash every other hostile target within their radius.
pub fn resolve_hits(
    projectiles: &mut Vec<Projectile>,
    targets: &[TargetView],
    blocks: &mut Vec<MapBlock>,
    effects: &dyn EffectQuery,
    now: u64,
    tuning: &CombatTuning,
) -> CombatOutcome {
    let mut outcome = CombatOutcome::default();

    projectiles.retain(|p| {
        let victim = targets.iter().find(|t| {
            t.id != p.owner_id
                && is_hostile(p.team, t.team, tuning.friendly_fire)
                && distance(p.x, p.y, t.x, t.y) < tuning.hit_radius
        });

        let direct_victim = match victim {
            Some(t) => {
                let damage = if t.invulnerable {
                    0.0
                } else {
                    scaled_damage(p.damage, p.owner_id, t.id, effects, now)
                };
                info!(
                    projectile_id = p.id,
                    shooter_id = p.owner_id,
                    victim_id = t.id,
                    damage,
                    "tank hit"
                );
                outcome.hits.push(HitEvent {
                    projectile_id: p.id,
                    shooter_id: p.owner_id,
                    victim_id: t.id,
                    x: p.x,
                    y: p.y,
                    damage,
                    splash: false,
                });
                Some(t.id)
            }
            None => {
                let Some(index) = projectile_block_hit(p.x, p.y, tuning.projectile_box, blocks)
                else {
                    return true;
                };
                let block = &mut blocks[index];
                let mut destroyed = false;
                if block.is_destructible() {
                    block.health -= p.damage;
                    if block.health <= 0.0 {
                        destroyed = true;
                        blocks.remove(index);
                    }
                }
                debug!(projectile_id = p.id, destroyed, "block hit");
                outcome.block_hits.push(BlockHit {
                    projectile_id: p.id,
                    x: p.x,
                    y: p.y,
                    destroyed,
                });
                None
            }
        };

        if let Some(radius) = p.explosion_radius {
            outcome.explosions.push(Explosion {
                x: p.x,
                y: p.y,
                radius,
            });
            for t in targets.iter().filter(|t| {
                Some(t.id) != direct_victim
                    && t.id != p.owner_id
                    && !t.invulnerable
                    && is_hostile(p.team, t.team, tuning.friendly_fire)
                    && distance(p.x, p.y, t.x, t.y) <= radius
            }) {
                let splash = p.damage * tuning.splash_factor;
                outcome.hits.push(HitEvent {
                    projectile_id: p.id,
                    shooter_id: p.owner_id,
                    victim_id: t.id,
                    x: t.x,
                    y: t.y,
                    damage: scaled_damage(splash, p.owner_id, t.id, effects, now),
                    splash: true,
                });
            }
        }

        false
    });

    outcome
}

/// Applies hits to the tanks they name and returns the ids defeated by these hits.
pub fn apply_hits(hits: &[HitEvent], tanks: &mut [Tank], now: u64) -> Vec<EntityId> {
    let mut defeated = Vec::new();
    for hit in hits {
        if let Some(tank) = tanks.iter_mut().find(|t| t.id == hit.victim_id) {
            if tank.apply_damage(hit.damage, now) {
                info!(victim_id = tank.id, shooter_id = hit.shooter_id, "tank defeated");
                defeated.push(tank.id);
            }
        }
    }
    defeated
}
