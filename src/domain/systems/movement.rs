// Player-driven movement and firing for chapter mode.

use crate::domain::math::normalize_angle;
use crate::domain::state::{EntityId, MapBlock, MapBounds, PlayerInput, Projectile, Tank};
use crate::domain::systems::map::tank_collides;
use rand::Rng;
use rand::rngs::SmallRng;

/// Combined multipliers from powerups and the active ability for one firing attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireModifiers {
    pub reload: f32,
    pub damage: f32,
    pub projectile_speed: f32,
}

impl Default for FireModifiers {
    fn default() -> Self {
        Self {
            reload: 1.0,
            damage: 1.0,
            projectile_speed: 1.0,
        }
    }
}

/// Moves `tank` one tick along the input direction and faces it along the aim angle.
///
/// Direction vectors longer than 1 are normalized. The result is clamped to the map interior;
/// a step that would overlap a block is retried per axis so the tank slides along obstacles,
/// and dropped when both axes collide. Returns true when the position changed.
pub fn move_player(
    tank: &mut Tank,
    input: &PlayerInput,
    speed_multiplier: f32,
    bounds: MapBounds,
    half_extent: f32,
    blocks: &[MapBlock],
) -> bool {
    if input.aim.is_finite() {
        tank.angle = normalize_angle(input.aim);
    }

    let (mut dx, mut dy) = (input.move_x, input.move_y);
    if !dx.is_finite() || !dy.is_finite() {
        return false;
    }
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        return false;
    }
    if len > 1.0 {
        dx /= len;
        dy /= len;
    }

    let speed = tank.archetype().speed * speed_multiplier;
    let clamp_x = |x: f32| x.clamp(half_extent, (bounds.width - half_extent).max(half_extent));
    let clamp_y = |y: f32| y.clamp(half_extent, (bounds.height - half_extent).max(half_extent));
    let nx = clamp_x(tank.x + dx * speed);
    let ny = clamp_y(tank.y + dy * speed);

    let (x, y) = if !tank_collides(nx, ny, half_extent, blocks) {
        (nx, ny)
    } else if !tank_collides(nx, tank.y, half_extent, blocks) {
        (nx, tank.y)
    } else if !tank_collides(tank.x, ny, half_extent, blocks) {
        (tank.x, ny)
    } else {
        return false;
    };

    let moved = x != tank.x || y != tank.y;
    tank.x = x;
    tank.y = y;
    moved
}

/// Fires along `aim` with the archetype's spread once the modified reload has elapsed.
pub fn try_fire(
    tank: &mut Tank,
    aim: f32,
    modifiers: FireModifiers,
    now: u64,
    next_id: &mut EntityId,
    rng: &mut SmallRng,
) -> Option<Projectile> {
    if !tank.is_alive() || !aim.is_finite() {
        return None;
    }
    let archetype = tank.archetype();
    let reload_ms = archetype.reload_ms() * modifiers.reload;
    if tank.last_shot != 0 && now.saturating_sub(tank.last_shot) as f32 <= reload_ms {
        return None;
    }

    let weapon = archetype.weapon;
    let angle = aim + rng.random_range(-weapon.spread..=weapon.spread);
    let id = *next_id;
    *next_id += 1;
    tank.last_shot = now;

    Some(Projectile {
        id,
        owner_id: tank.id,
        team: tank.team,
        x: tank.x + aim.cos() * archetype.barrel_length,
        y: tank.y + aim.sin() * archetype.barrel_length,
        angle,
        speed: weapon.projectile_speed * modifiers.projectile_speed,
        damage: weapon.damage * modifiers.damage,
        explosion_radius: weapon.explosion_radius,
        created_at: now,
    })
}
