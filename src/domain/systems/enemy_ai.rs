//! Enemy behavior engine for chapter missions.
//!
//! Owns every enemy of a chapter. Each AI step re-evaluates the behavior state of an enemy once
//! its randomized hysteresis window has elapsed, then runs the per-state handler (steering,
//! aiming, firing) and clamps the result to the map. Calls faster than the configured update
//! interval are no-ops, which keeps AI cost independent of the caller's tick rate.

use crate::domain::catalog::TankKind;
use crate::domain::math::{angle_delta, angle_to, distance, rotate_towards};
use crate::domain::state::{
    Behavior, Enemy, EnemySnapshot, EntityId, MapBounds, Projectile, Tank, Team, Variant,
};
use crate::domain::tuning::enemy::{Difficulty, DifficultySettings, EnemyTuning};
use rand::Rng;
use rand::rngs::SmallRng;
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use tracing::{debug, info, warn};

/// Enemy ids start here so they never collide with player ids.
pub const ENEMY_ID_BASE: EntityId = 1_000_000;

/// Result of one [`EnemyManager::update_enemies`] call.
pub struct EnemyUpdate<'a> {
    pub enemies: &'a [Enemy],
    /// Projectiles fired during this step; empty when the call was throttled.
    pub projectiles: Vec<Projectile>,
}

pub struct EnemyManager {
    tuning: EnemyTuning,
    difficulty: Difficulty,
    settings: DifficultySettings,
    bounds: MapBounds,
    enemies: Vec<Enemy>,
    last_update: Option<u64>,
    // Last known player position, used to face the attacker on hit.
    target: Option<(f32, f32)>,
    next_enemy_id: EntityId,
    next_projectile_id: EntityId,
    rng: SmallRng,
}

// Per-step context shared by the state handlers.
struct StepCtx<'a> {
    tuning: &'a EnemyTuning,
    bounds: MapBounds,
    settings: &'a DifficultySettings,
    rng: &'a mut SmallRng,
    now: u64,
    player: (f32, f32),
    next_projectile_id: &'a mut EntityId,
    fired: &'a mut Vec<Projectile>,
}

impl EnemyManager {
    pub fn new(difficulty: Difficulty, bounds: MapBounds, tuning: EnemyTuning, rng: SmallRng) -> Self {
        Self {
            tuning,
            difficulty,
            settings: difficulty.settings(),
            bounds,
            enemies: Vec::new(),
            last_update: None,
            target: None,
            next_enemy_id: ENEMY_ID_BASE,
            // Projectile ids are namespaced by the high bit so they never clash with players'.
            next_projectile_id: 1 << 62,
            rng,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn live_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_alive()).count()
    }

    pub fn snapshots(&self) -> Vec<EnemySnapshot> {
        self.enemies
            .iter()
            .filter(|e| e.is_alive())
            .map(EnemySnapshot::from)
            .collect()
    }

    pub fn clear(&mut self) {
        self.enemies.clear();
        self.last_update = None;
        self.target = None;
        self.next_enemy_id = ENEMY_ID_BASE;
    }

    /// Replaces the roster with a fresh set of enemies placed away from `player`.
    ///
    /// Each enemy gets up to `max_spawn_attempts` rejection-sampled positions; one that finds
    /// no valid spot is not spawned, so the result may hold fewer enemies than the difficulty
    /// asks for. Archetypes are drawn from `roster` in order (ASSAULT when empty), and with the
    /// difficulty's boss chance the last enemy is promoted to a boss.
    pub fn spawn_enemies(&mut self, player: &Tank, roster: &[TankKind], now: u64) -> &[Enemy] {
        self.clear();
        self.target = Some((player.x, player.y));

        let requested = self.settings.enemy_count;
        let margin = self.tuning.map_margin;
        for i in 0..requested {
            let kind = if roster.is_empty() {
                TankKind::Assault
            } else {
                roster[i % roster.len()]
            };

            let mut placed = None;
            for _ in 0..self.tuning.max_spawn_attempts {
                let x = self.rng.random_range(margin..=(self.bounds.width - margin).max(margin));
                let y = self.rng.random_range(margin..=(self.bounds.height - margin).max(margin));
                if distance(x, y, player.x, player.y) <= self.tuning.min_player_distance {
                    continue;
                }
                let crowded = self.enemies.iter().any(|e| {
                    distance(x, y, e.tank.x, e.tank.y) < self.tuning.min_enemy_spacing
                });
                if !crowded {
                    placed = Some((x, y));
                    break;
                }
            }

            match placed {
                Some((x, y)) => {
                    self.spawn_enemy_at(kind, x, y, now);
                }
                None => debug!(index = i, "no valid spawn position; skipping enemy"),
            }
        }

        if self.enemies.len() < requested {
            warn!(
                requested,
                spawned = self.enemies.len(),
                "spawned fewer enemies than requested"
            );
        }

        if !self.enemies.is_empty() && self.rng.random_bool(self.settings.boss_chance) {
            let last = self.enemies.len() - 1;
            self.promote_to_boss(last);
        }

        info!(
            difficulty = ?self.difficulty,
            count = self.enemies.len(),
            "enemies spawned"
        );
        &self.enemies
    }

    /// Adds one enemy at an explicit position and returns its id.
    pub fn spawn_enemy_at(&mut self, kind: TankKind, x: f32, y: f32, now: u64) -> EntityId {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;

        let variant = Variant::for_kind(kind);
        let modifiers = variant.modifiers();
        let mut tank = Tank::new(id, kind, Team::Enemies, x, y);
        tank.angle = self.rng.random_range(0.0..TAU);
        tank.max_health = kind.archetype().max_health * modifiers.health;
        tank.health = tank.max_health;

        let interval = self
            .rng
            .random_range(self.tuning.behavior_interval_min_ms..=self.tuning.behavior_interval_max_ms);

        self.enemies.push(Enemy {
            tank,
            behavior: Behavior::Patrol,
            variant,
            is_boss: false,
            speed: self.settings.base_speed * modifiers.speed,
            // Zero makes the first AI step pick a behavior right away.
            last_behavior_change: 0,
            behavior_change_interval: interval,
            patrol_point: (x, y),
            flank_point: None,
            flank_anchor: None,
            retreat_heading: None,
        });
        debug!(enemy_id = id, %kind, ?variant, x, y, now, "enemy spawned");
        id
    }

    /// Advances every living enemy by one AI step.
    ///
    /// Returns the unchanged roster and no projectiles when called again within the update
    /// interval. Dead enemies stay in the roster but are skipped.
    pub fn update_enemies(&mut self, player: &Tank, now: u64) -> EnemyUpdate<'_> {
        if let Some(last) = self.last_update {
            if now.saturating_sub(last) < self.tuning.update_interval_ms {
                return EnemyUpdate {
                    enemies: &self.enemies,
                    projectiles: Vec::new(),
                };
            }
        }
        self.last_update = Some(now);
        self.target = Some((player.x, player.y));

        let mut fired = Vec::new();
        let Self {
            tuning,
            settings,
            bounds,
            enemies,
            next_projectile_id,
            rng,
            ..
        } = self;

        let mut ctx = StepCtx {
            tuning,
            bounds: *bounds,
            settings,
            rng,
            now,
            player: (player.x, player.y),
            next_projectile_id,
            fired: &mut fired,
        };

        for enemy in enemies.iter_mut() {
            if !enemy.is_alive() {
                continue;
            }
            let before = (enemy.tank.x, enemy.tank.y, enemy.tank.angle);

            step_enemy(enemy, &mut ctx);
            enforce_map_boundary(enemy, &mut ctx);

            // Isolate a bad step to this enemy instead of poisoning the tick.
            if !enemy.tank.has_finite_position() {
                warn!(enemy_id = enemy.id(), "non-finite enemy state; reverting step");
                (enemy.tank.x, enemy.tank.y, enemy.tank.angle) = before;
            }
        }

        EnemyUpdate {
            enemies: &self.enemies,
            projectiles: fired,
        }
    }

    /// Applies a hit to an enemy and maybe forces a reactive behavior switch.
    ///
    /// Returns true when this hit destroyed the enemy.
    pub fn handle_enemy_hit(&mut self, enemy_id: EntityId, damage: f32, now: u64) -> bool {
        let Some(enemy) = self.enemies.iter_mut().find(|e| e.id() == enemy_id) else {
            return false;
        };
        if !enemy.is_alive() {
            return false;
        }

        let killed = enemy.tank.apply_damage(damage, now);
        if killed || enemy.is_boss {
            return killed;
        }

        if self.rng.random_bool(self.tuning.hit_reaction_chance) {
            let next = if self.rng.random_bool(self.tuning.hit_retreat_chance) {
                Behavior::Retreat
            } else {
                Behavior::Attack
            };
            set_behavior(enemy, next, None);

            if next == Behavior::Attack {
                if let Some((px, py)) = self.target {
                    let bearing = angle_to(enemy.tank.x, enemy.tank.y, px, py);
                    enemy.tank.angle =
                        rotate_towards(enemy.tank.angle, bearing, self.tuning.hit_turn_step);
                }
            }
            debug!(enemy_id, behavior = ?next, "enemy reacted to hit");
        }
        false
    }

    /// Pushes an enemy directly away from `(from_x, from_y)`, keeping it inside the map.
    pub fn knock_back(&mut self, enemy_id: EntityId, from_x: f32, from_y: f32, amount: f32) {
        let margin = self.tuning.map_margin;
        let bounds = self.bounds;
        if let Some(enemy) = self.enemies.iter_mut().find(|e| e.id() == enemy_id) {
            let away = angle_to(from_x, from_y, enemy.tank.x, enemy.tank.y);
            enemy.tank.x = (enemy.tank.x + away.cos() * amount)
                .clamp(margin, (bounds.width - margin).max(margin));
            enemy.tank.y = (enemy.tank.y + away.sin() * amount)
                .clamp(margin, (bounds.height - margin).max(margin));
        }
    }

    fn promote_to_boss(&mut self, index: usize) {
        let multiplier = self.tuning.boss_health_multiplier;
        let enemy = &mut self.enemies[index];
        enemy.is_boss = true;
        enemy.behavior = Behavior::Boss;
        enemy.tank.max_health *= multiplier;
        enemy.tank.health = enemy.tank.max_health;
        info!(enemy_id = enemy.id(), "boss promoted");
    }
}

/// Picks the next behavior for a distance band given a uniform roll in `[0, 1)`.
pub fn behavior_for_roll(distance_to_player: f32, roll: f64, tuning: &EnemyTuning) -> Behavior {
    if distance_to_player < tuning.close_range {
        if roll < 0.6 {
            Behavior::Attack
        } else if roll < 0.8 {
            Behavior::Retreat
        } else {
            Behavior::Flank
        }
    } else if distance_to_player < tuning.medium_range {
        if roll < 0.5 {
            Behavior::Chase
        } else if roll < 0.8 {
            Behavior::Flank
        } else {
            Behavior::Attack
        }
    } else if roll < 0.7 {
        Behavior::Chase
    } else {
        Behavior::Patrol
    }
}

fn set_behavior(enemy: &mut Enemy, next: Behavior, now: Option<u64>) {
    if enemy.behavior != next {
        enemy.retreat_heading = None;
        if next != Behavior::Flank {
            enemy.flank_point = None;
            enemy.flank_anchor = None;
        }
    }
    enemy.behavior = next;
    if let Some(now) = now {
        enemy.last_behavior_change = now;
    }
}

fn step_enemy(enemy: &mut Enemy, ctx: &mut StepCtx<'_>) {
    let (px, py) = ctx.player;
    let distance_to_player = distance(enemy.tank.x, enemy.tank.y, px, py);

    let due = ctx.now.saturating_sub(enemy.last_behavior_change) > enemy.behavior_change_interval;
    if enemy.behavior != Behavior::Boss && due {
        let roll = ctx.rng.random::<f64>();
        let next = behavior_for_roll(distance_to_player, roll, ctx.tuning);
        let previous = enemy.behavior;
        set_behavior(enemy, next, Some(ctx.now));
        if next == Behavior::Flank {
            assign_flank_point(enemy, ctx);
        }
        if previous != next {
            debug!(enemy_id = enemy.id(), from = ?previous, to = ?next, "behavior changed");
        }
    }

    match enemy.behavior {
        Behavior::Patrol => patrol(enemy, ctx),
        Behavior::Chase => chase(enemy, ctx, distance_to_player),
        Behavior::Attack => attack(enemy, ctx),
        Behavior::Retreat => retreat(enemy, ctx, distance_to_player),
        Behavior::Flank => flank(enemy, ctx),
        Behavior::Boss => boss(enemy, ctx, distance_to_player),
    }
}

fn move_forward(tank: &mut Tank, speed: f32) {
    tank.x += tank.angle.cos() * speed;
    tank.y += tank.angle.sin() * speed;
}

fn is_aimed(tank: &Tank, bearing: f32, tolerance: f32) -> bool {
    angle_delta(tank.angle, bearing).abs() < tolerance
}

fn patrol(enemy: &mut Enemy, ctx: &mut StepCtx<'_>) {
    let (wx, wy) = enemy.patrol_point;
    if distance(enemy.tank.x, enemy.tank.y, wx, wy) < ctx.tuning.patrol_arrival_radius {
        let margin = ctx.tuning.map_margin;
        let half = ctx.tuning.patrol_box / 2.0;
        let x = enemy.tank.x + ctx.rng.random_range(-half..half);
        let y = enemy.tank.y + ctx.rng.random_range(-half..half);
        enemy.patrol_point = (
            x.clamp(margin, (ctx.bounds.width - margin).max(margin)),
            y.clamp(margin, (ctx.bounds.height - margin).max(margin)),
        );
        return;
    }

    let bearing = angle_to(enemy.tank.x, enemy.tank.y, wx, wy);
    enemy.tank.angle = rotate_towards(enemy.tank.angle, bearing, ctx.tuning.turn_rate);
    move_forward(&mut enemy.tank, enemy.speed * ctx.tuning.patrol_speed_factor);
}

fn chase(enemy: &mut Enemy, ctx: &mut StepCtx<'_>, distance_to_player: f32) {
    if distance_to_player <= ctx.tuning.chase_attack_distance {
        set_behavior(enemy, Behavior::Attack, Some(ctx.now));
        return;
    }

    let (px, py) = ctx.player;
    let bearing = angle_to(enemy.tank.x, enemy.tank.y, px, py);
    enemy.tank.angle = rotate_towards(enemy.tank.angle, bearing, ctx.tuning.turn_rate);
    let factor = match enemy.variant {
        Variant::Scout => ctx.tuning.scout_chase_speed_factor,
        Variant::Normal | Variant::Heavy | Variant::Sniper => ctx.tuning.chase_speed_factor,
    };
    move_forward(&mut enemy.tank, enemy.speed * factor);
}

fn attack(enemy: &mut Enemy, ctx: &mut StepCtx<'_>) {
    let (px, py) = ctx.player;
    let bearing = angle_to(enemy.tank.x, enemy.tank.y, px, py);
    enemy.tank.angle = rotate_towards(enemy.tank.angle, bearing, ctx.tuning.attack_turn_rate);

    if is_aimed(&enemy.tank, bearing, ctx.tuning.aim_tolerance) {
        attempt_fire(enemy, ctx, ctx.tuning.attack_reload_multiplier);
    }

    if ctx.rng.random_bool(ctx.tuning.attack_jitter_chance) {
        let jitter = ctx.tuning.attack_jitter;
        enemy.tank.x += ctx.rng.random_range(-jitter..jitter);
        enemy.tank.y += ctx.rng.random_range(-jitter..jitter);
    }
}

fn retreat(enemy: &mut Enemy, ctx: &mut StepCtx<'_>, distance_to_player: f32) {
    let (px, py) = ctx.player;
    let away = angle_to(px, py, enemy.tank.x, enemy.tank.y);
    let heading = enemy.retreat_heading.unwrap_or(away);
    enemy.tank.angle = rotate_towards(enemy.tank.angle, heading, ctx.tuning.attack_turn_rate);
    move_forward(&mut enemy.tank, enemy.speed * ctx.tuning.retreat_speed_factor);

    if distance_to_player > ctx.tuning.retreat_give_up_distance
        && ctx.rng.random_bool(ctx.tuning.retreat_give_up_chance)
    {
        set_behavior(enemy, Behavior::Patrol, Some(ctx.now));
    }
}

fn flank(enemy: &mut Enemy, ctx: &mut StepCtx<'_>) {
    let (px, py) = ctx.player;
    let stale = match enemy.flank_anchor {
        Some((ax, ay)) => distance(ax, ay, px, py) > ctx.tuning.flank_invalidate_distance,
        None => true,
    };
    if enemy.flank_point.is_none() || stale {
        assign_flank_point(enemy, ctx);
    }
    let Some((fx, fy)) = enemy.flank_point else {
        return;
    };

    if distance(enemy.tank.x, enemy.tank.y, fx, fy) > ctx.tuning.flank_arrival_radius {
        let bearing = angle_to(enemy.tank.x, enemy.tank.y, fx, fy);
        enemy.tank.angle = rotate_towards(enemy.tank.angle, bearing, ctx.tuning.turn_rate);
        move_forward(&mut enemy.tank, enemy.speed * ctx.tuning.flank_speed_factor);
        return;
    }

    // A point the weapon cannot reach from is useless; pick another.
    if distance(enemy.tank.x, enemy.tank.y, px, py) > enemy.tank.archetype().weapon.range {
        assign_flank_point(enemy, ctx);
        return;
    }

    // Holding the flank point: face the player and shoot, then relocate after a shot.
    let bearing = angle_to(enemy.tank.x, enemy.tank.y, px, py);
    enemy.tank.angle = rotate_towards(enemy.tank.angle, bearing, ctx.tuning.attack_turn_rate);
    if is_aimed(&enemy.tank, bearing, ctx.tuning.aim_tolerance)
        && attempt_fire(enemy, ctx, ctx.tuning.flank_reload_multiplier)
    {
        assign_flank_point(enemy, ctx);
    }
}

fn boss(enemy: &mut Enemy, ctx: &mut StepCtx<'_>, distance_to_player: f32) {
    let (px, py) = ctx.player;
    let bearing = angle_to(enemy.tank.x, enemy.tank.y, px, py);
    if distance_to_player > ctx.tuning.boss_engage_distance {
        enemy.tank.angle = rotate_towards(enemy.tank.angle, bearing, ctx.tuning.turn_rate);
        move_forward(&mut enemy.tank, enemy.speed * ctx.tuning.boss_speed_factor);
    } else {
        enemy.tank.angle = rotate_towards(enemy.tank.angle, bearing, ctx.tuning.attack_turn_rate);
    }

    if is_aimed(&enemy.tank, bearing, ctx.tuning.aim_tolerance) {
        attempt_fire(enemy, ctx, ctx.tuning.boss_reload_multiplier);
    }
}

fn assign_flank_point(enemy: &mut Enemy, ctx: &mut StepCtx<'_>) {
    let (px, py) = ctx.player;
    let bearing = angle_to(enemy.tank.x, enemy.tank.y, px, py);
    let side = if ctx.rng.random_bool(0.5) { FRAC_PI_2 } else { -FRAC_PI_2 };
    let flank_angle = bearing + side;
    // Arriving anywhere inside the arrival radius must still leave the player in range.
    let in_range = enemy.tank.archetype().weapon.range - ctx.tuning.flank_arrival_radius;
    let max_reach = ctx
        .tuning
        .flank_max_distance
        .min(in_range)
        .max(ctx.tuning.flank_min_distance);
    let reach = ctx
        .rng
        .random_range(ctx.tuning.flank_min_distance..=max_reach);
    enemy.flank_point = Some((px + flank_angle.cos() * reach, py + flank_angle.sin() * reach));
    enemy.flank_anchor = Some((px, py));
}

/// Shared firing routine. Returns true when a projectile was emitted.
fn attempt_fire(enemy: &mut Enemy, ctx: &mut StepCtx<'_>, state_reload_multiplier: f32) -> bool {
    let archetype = enemy.tank.archetype();
    let modifiers = enemy.variant.modifiers();

    let reload_ms = archetype.reload_ms() * modifiers.reload * state_reload_multiplier;
    let since_last = ctx.now.saturating_sub(enemy.tank.last_shot) as f32;
    if since_last <= reload_ms {
        return false;
    }

    let (px, py) = ctx.player;
    let range = archetype.weapon.range;
    let distance_to_player = distance(enemy.tank.x, enemy.tank.y, px, py);
    if distance_to_player > range {
        return false;
    }

    let mut inaccuracy = match enemy.variant {
        Variant::Sniper => (distance_to_player / range) * ctx.tuning.sniper_inaccuracy,
        Variant::Normal | Variant::Scout | Variant::Heavy => {
            let moving = matches!(enemy.behavior, Behavior::Chase | Behavior::Flank);
            (distance_to_player / range) * ctx.tuning.base_inaccuracy
                + if moving { ctx.tuning.moving_inaccuracy } else { 0.0 }
        }
    };
    inaccuracy = inaccuracy.max(ctx.tuning.min_inaccuracy);

    let spread = ctx.rng.random_range(-0.5..0.5) * inaccuracy;
    let angle = angle_to(enemy.tank.x, enemy.tank.y, px, py) + spread;
    let damage = archetype.weapon.damage * modifiers.damage * ctx.settings.damage_modifier;

    let id = *ctx.next_projectile_id;
    *ctx.next_projectile_id += 1;
    ctx.fired.push(Projectile {
        id,
        owner_id: enemy.id(),
        team: Team::Enemies,
        x: enemy.tank.x,
        y: enemy.tank.y,
        angle,
        speed: archetype.weapon.projectile_speed,
        damage,
        explosion_radius: archetype.weapon.explosion_radius,
        created_at: ctx.now,
    });
    enemy.tank.last_shot = ctx.now;
    true
}

fn enforce_map_boundary(enemy: &mut Enemy, ctx: &mut StepCtx<'_>) {
    let margin = ctx.tuning.map_margin;
    let bounds = ctx.bounds;
    let retreating = enemy.behavior == Behavior::Retreat;
    // Headings are in +Y-down screen space: 0 points right, π/2 points down.
    let mut bounce = None;

    if enemy.tank.x < margin {
        enemy.tank.x = margin;
        bounce = Some(-FRAC_PI_2);
    } else if enemy.tank.x > bounds.width - margin {
        enemy.tank.x = bounds.width - margin;
        bounce = Some(FRAC_PI_2);
    }

    if enemy.tank.y < margin {
        enemy.tank.y = margin;
        bounce = Some(0.0);
    } else if enemy.tank.y > bounds.height - margin {
        enemy.tank.y = bounds.height - margin;
        bounce = Some(PI);
    }

    if retreating {
        // The redirect only lives while the enemy is pinned to a wall; off the wall it steers
        // away from the player again.
        let current = enemy.retreat_heading;
        enemy.retreat_heading = bounce.map(|start| match current {
            Some(heading) if angle_delta(start + FRAC_PI_2, heading).abs() <= FRAC_PI_2 => heading,
            // Any heading within the half-plane facing away from the wall.
            _ => start + ctx.rng.random_range(0.0..PI),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn bounds() -> MapBounds {
        MapBounds::new(800.0, 600.0)
    }

    fn manager(difficulty: Difficulty, seed: u64) -> EnemyManager {
        EnemyManager::new(
            difficulty,
            bounds(),
            EnemyTuning::default(),
            SmallRng::seed_from_u64(seed),
        )
    }

    fn player_at(x: f32, y: f32) -> Tank {
        Tank::new(1, TankKind::Assault, Team::Players, x, y)
    }

    fn lock_behavior(manager: &mut EnemyManager, id: EntityId, behavior: Behavior) {
        let enemy = manager
            .enemies
            .iter_mut()
            .find(|e| e.id() == id)
            .expect("enemy exists");
        enemy.behavior = behavior;
        enemy.behavior_change_interval = u64::MAX;
    }

    #[test]
    fn when_spawning_then_enemies_respect_player_distance_and_spacing() {
        for (difficulty, expected) in [
            (Difficulty::Easy, 5),
            (Difficulty::Medium, 8),
            (Difficulty::Hard, 10),
        ] {
            let mut manager = EnemyManager::new(
                difficulty,
                MapBounds::new(2000.0, 2000.0),
                EnemyTuning::default(),
                SmallRng::seed_from_u64(11),
            );
            let player = player_at(1000.0, 1000.0);
            let enemies = manager.spawn_enemies(&player, &[], 0);
            assert_eq!(enemies.len(), expected);

            for (i, a) in enemies.iter().enumerate() {
                assert!(distance(a.tank.x, a.tank.y, player.x, player.y) > 200.0);
                assert_eq!(a.behavior == Behavior::Boss, a.is_boss);
                assert_eq!(a.patrol_point, (a.tank.x, a.tank.y));
                assert!(a.behavior_change_interval >= 3000 && a.behavior_change_interval <= 5000);
                for b in &enemies[i + 1..] {
                    assert!(distance(a.tank.x, a.tank.y, b.tank.x, b.tank.y) >= 100.0);
                }
            }
        }
    }

    #[test]
    fn when_map_is_too_small_then_spawn_silently_returns_fewer_enemies() {
        let mut manager = EnemyManager::new(
            Difficulty::Hard,
            MapBounds::new(300.0, 300.0),
            EnemyTuning::default(),
            SmallRng::seed_from_u64(5),
        );
        let player = player_at(150.0, 150.0);
        // Every interior point is within 200 units of the player.
        let enemies = manager.spawn_enemies(&player, &[], 0);
        assert!(enemies.is_empty());
    }

    #[test]
    fn when_roster_is_given_then_archetypes_cycle_and_variants_follow() {
        let mut manager = EnemyManager::new(
            Difficulty::Easy,
            MapBounds::new(2000.0, 2000.0),
            EnemyTuning::default(),
            SmallRng::seed_from_u64(2),
        );
        let player = player_at(1000.0, 1000.0);
        let enemies = manager.spawn_enemies(&player, &[TankKind::Scout, TankKind::Sniper], 0);
        assert_eq!(enemies[0].tank.kind, TankKind::Scout);
        assert_eq!(enemies[0].variant, Variant::Scout);
        assert_eq!(enemies[1].tank.kind, TankKind::Sniper);
        assert_eq!(enemies[1].variant, Variant::Sniper);
        assert_eq!(enemies[2].tank.kind, TankKind::Scout);
        // Scout speed is the easy base speed with the scout modifier.
        assert!((enemies[0].speed - 1.5 * 1.5).abs() < 1e-6);
    }

    #[test]
    fn when_called_twice_within_interval_then_second_call_is_a_no_op() {
        let mut manager = manager(Difficulty::Medium, 3);
        let player = player_at(400.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 450.0, 300.0, 0);
        lock_behavior(&mut manager, id, Behavior::Attack);

        manager.update_enemies(&player, 10_000);
        let before = manager.enemies().to_vec();
        let second = manager.update_enemies(&player, 10_050);
        assert!(second.projectiles.is_empty());
        assert_eq!(second.enemies, before.as_slice());
    }

    #[test]
    fn when_simulating_many_steps_then_enemies_stay_inside_margins() {
        let mut manager = manager(Difficulty::Hard, 17);
        let mut player = player_at(60.0, 60.0);
        manager.spawn_enemies(&player, &[TankKind::Scout, TankKind::Heavy], 0);

        let mut now = 1_000;
        for step in 0..2_000 {
            // Drag the player around the corners to provoke retreats into walls.
            player.x = if (step / 200) % 2 == 0 { 60.0 } else { 740.0 };
            player.y = if (step / 300) % 2 == 0 { 60.0 } else { 540.0 };
            manager.update_enemies(&player, now);
            for enemy in manager.enemies() {
                assert!(enemy.tank.x >= 50.0 && enemy.tank.x <= 750.0);
                assert!(enemy.tank.y >= 50.0 && enemy.tank.y <= 550.0);
                assert!(enemy.tank.angle >= 0.0 && enemy.tank.angle < TAU);
            }
            now += 100;
        }
    }

    // Parks a flanking enemy on its flank point so every step takes the firing branch.
    fn pin_to_flank_point(manager: &mut EnemyManager, player: &Tank) {
        let enemy = &mut manager.enemies[0];
        enemy.flank_point = Some((enemy.tank.x, enemy.tank.y));
        enemy.flank_anchor = Some((player.x, player.y));
    }

    #[test]
    fn when_firing_in_any_state_then_shots_respect_variant_and_state_reload() {
        let tuning = EnemyTuning::default();
        for kind in [
            TankKind::Assault,
            TankKind::Scout,
            TankKind::Heavy,
            TankKind::Sniper,
        ] {
            for (behavior, state_multiplier) in [
                (Behavior::Attack, tuning.attack_reload_multiplier),
                (Behavior::Flank, tuning.flank_reload_multiplier),
                (Behavior::Boss, tuning.boss_reload_multiplier),
            ] {
                let mut manager = manager(Difficulty::Medium, 23);
                let player = player_at(400.0, 300.0);
                let id = manager.spawn_enemy_at(kind, 400.0, 200.0, 0);
                lock_behavior(&mut manager, id, behavior);
                let reload = kind.archetype().reload_ms()
                    * Variant::for_kind(kind).modifiers().reload
                    * state_multiplier;

                let mut shots = Vec::new();
                let mut now = 5_000;
                for _ in 0..200 {
                    if behavior == Behavior::Flank {
                        pin_to_flank_point(&mut manager, &player);
                    }
                    let update = manager.update_enemies(&player, now);
                    shots.extend(update.projectiles.iter().map(|p| p.created_at));
                    now += 100;
                }

                assert!(
                    shots.len() >= 3,
                    "{kind} in {behavior:?}: only {} shots",
                    shots.len()
                );
                for pair in shots.windows(2) {
                    let gap = (pair[1] - pair[0]) as f32;
                    assert!(gap > reload, "{kind} in {behavior:?}: gap {gap} <= {reload}");
                }
            }
        }
    }

    #[test]
    fn when_sniper_is_out_of_range_then_it_never_fires_until_in_range() {
        let mut manager = manager(Difficulty::Medium, 29);
        let mut player = player_at(700.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Sniper, 100.0, 300.0, 0);
        lock_behavior(&mut manager, id, Behavior::Attack);

        let mut now = 1_000;
        for _ in 0..300 {
            let update = manager.update_enemies(&player, now);
            assert!(update.projectiles.is_empty());
            now += 100;
        }

        player.x = 500.0;
        // Sniper reload: 1.8 s * 1.5 variant * 0.8 attack.
        let reload_cycle = (1800.0_f32 * 1.5 * 0.8) as u64;
        let deadline = now + reload_cycle;
        let mut fired = false;
        while now <= deadline {
            if !manager.update_enemies(&player, now).projectiles.is_empty() {
                fired = true;
                break;
            }
            now += 100;
        }
        assert!(fired);
    }

    #[test]
    fn when_enemy_fires_then_damage_includes_variant_and_difficulty() {
        let mut manager = manager(Difficulty::Hard, 31);
        let player = player_at(400.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 400.0, 250.0, 0);
        lock_behavior(&mut manager, id, Behavior::Attack);

        let mut projectiles = Vec::new();
        let mut now = 5_000;
        while projectiles.is_empty() && now < 20_000 {
            projectiles = manager.update_enemies(&player, now).projectiles;
            now += 100;
        }
        let shot = projectiles.first().expect("enemy fired");
        assert_eq!(shot.owner_id, id);
        assert_eq!(shot.team, Team::Enemies);
        assert!((shot.damage - 20.0 * 1.2).abs() < 1e-4);
        assert_eq!(shot.speed, 10.0);
    }

    #[test]
    fn when_rolling_behaviors_then_distance_bands_match_weights() {
        let tuning = EnemyTuning::default();
        assert_eq!(behavior_for_roll(100.0, 0.59, &tuning), Behavior::Attack);
        assert_eq!(behavior_for_roll(100.0, 0.61, &tuning), Behavior::Retreat);
        assert_eq!(behavior_for_roll(100.0, 0.85, &tuning), Behavior::Flank);
        assert_eq!(behavior_for_roll(200.0, 0.49, &tuning), Behavior::Chase);
        assert_eq!(behavior_for_roll(300.0, 0.79, &tuning), Behavior::Flank);
        assert_eq!(behavior_for_roll(399.0, 0.95, &tuning), Behavior::Attack);
        assert_eq!(behavior_for_roll(400.0, 0.69, &tuning), Behavior::Chase);
        assert_eq!(behavior_for_roll(900.0, 0.71, &tuning), Behavior::Patrol);
    }

    #[test]
    fn when_chasing_inside_attack_distance_then_switches_to_attack() {
        let mut manager = manager(Difficulty::Easy, 37);
        let player = player_at(400.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 400.0, 420.0, 0);
        lock_behavior(&mut manager, id, Behavior::Chase);

        manager.update_enemies(&player, 1_000);
        assert_eq!(manager.enemies()[0].behavior, Behavior::Attack);
        assert_eq!(manager.enemies()[0].last_behavior_change, 1_000);
    }

    #[test]
    fn when_flanking_then_flank_point_sits_beside_player() {
        let mut manager = manager(Difficulty::Easy, 41);
        let player = player_at(400.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 400.0, 100.0, 0);
        lock_behavior(&mut manager, id, Behavior::Flank);

        manager.update_enemies(&player, 1_000);
        let enemy = &manager.enemies()[0];
        let (fx, fy) = enemy.flank_point.expect("flank point assigned");
        let reach = distance(fx, fy, player.x, player.y);
        assert!((150.0..=250.0).contains(&reach));
        // Perpendicular to the enemy-player line, which is vertical here.
        assert!((fy - player.y).abs() < 1.0);
    }

    #[test]
    fn when_player_moves_past_invalidate_distance_then_flank_point_is_recomputed() {
        let mut manager = manager(Difficulty::Easy, 67);
        let mut player = player_at(400.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 400.0, 100.0, 0);
        lock_behavior(&mut manager, id, Behavior::Flank);

        manager.update_enemies(&player, 1_000);
        let first_point = manager.enemies()[0].flank_point.expect("flank point assigned");
        assert_eq!(manager.enemies()[0].flank_anchor, Some((400.0, 300.0)));

        // A small move keeps the point.
        player.x = 450.0;
        manager.update_enemies(&player, 1_100);
        assert_eq!(manager.enemies()[0].flank_point, Some(first_point));

        player.x = 550.0;
        manager.update_enemies(&player, 1_200);
        let enemy = &manager.enemies()[0];
        assert_eq!(enemy.flank_anchor, Some((550.0, 300.0)));
        assert_ne!(enemy.flank_point, Some(first_point));
    }

    #[test]
    fn when_flank_point_is_far_then_enemy_closes_in_and_holds_once_arrived() {
        let mut manager = manager(Difficulty::Easy, 71);
        let player = player_at(400.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 400.0, 100.0, 0);
        lock_behavior(&mut manager, id, Behavior::Flank);
        manager.enemies[0].flank_point = Some((200.0, 100.0));
        manager.enemies[0].flank_anchor = Some((400.0, 300.0));
        manager.enemies[0].tank.angle = PI;

        let mut now = 1_000;
        for _ in 0..20 {
            manager.update_enemies(&player, now);
            now += 100;
        }
        let enemy = &manager.enemies()[0];
        assert_eq!(enemy.flank_point, Some((200.0, 100.0)));
        assert!(distance(enemy.tank.x, enemy.tank.y, 200.0, 100.0) < 190.0);

        // Inside the arrival radius the enemy stops and only turns to shoot.
        pin_to_flank_point(&mut manager, &player);
        let parked = (manager.enemies[0].tank.x, manager.enemies[0].tank.y);
        manager.update_enemies(&player, now);
        let enemy = &manager.enemies()[0];
        assert_eq!((enemy.tank.x, enemy.tank.y), parked);
    }

    #[test]
    fn when_flank_point_is_out_of_weapon_range_then_a_reachable_one_is_picked() {
        let tuning = EnemyTuning::default();
        let mut manager = manager(Difficulty::Easy, 73);
        let player = player_at(400.0, 300.0);
        // Scout range is 250; this spot is 270 away.
        let id = manager.spawn_enemy_at(TankKind::Scout, 130.0, 300.0, 0);
        lock_behavior(&mut manager, id, Behavior::Flank);
        pin_to_flank_point(&mut manager, &player);

        manager.update_enemies(&player, 1_000);
        let enemy = &manager.enemies()[0];
        let (fx, fy) = enemy.flank_point.expect("flank point");
        assert_ne!((fx, fy), (130.0, 300.0));
        let reach = distance(fx, fy, player.x, player.y);
        let range = TankKind::Scout.archetype().weapon.range;
        assert!(reach >= tuning.flank_min_distance - 1e-3);
        assert!(reach <= range - tuning.flank_arrival_radius + 1e-3, "reach {reach}");
    }

    #[test]
    fn when_retreat_leaves_the_wall_then_it_steers_away_from_player_again() {
        let tuning = EnemyTuning {
            retreat_give_up_chance: 0.0,
            ..EnemyTuning::default()
        };
        let mut manager = EnemyManager::new(
            Difficulty::Easy,
            MapBounds::new(2000.0, 2000.0),
            tuning,
            SmallRng::seed_from_u64(79),
        );
        let player = player_at(1000.0, 1000.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 500.0, 1000.0, 0);
        lock_behavior(&mut manager, id, Behavior::Retreat);
        // Left over from an earlier bounce, and pointing straight at the player.
        manager.enemies[0].retreat_heading = Some(0.0);
        manager.enemies[0].tank.angle = PI;

        let mut now = 1_000;
        for _ in 0..50 {
            manager.update_enemies(&player, now);
            now += 100;
        }
        let enemy = &manager.enemies()[0];
        assert_eq!(enemy.retreat_heading, None);
        let gap = distance(enemy.tank.x, enemy.tank.y, player.x, player.y);
        assert!(gap > 500.0, "retreating enemy closed in to {gap}");
    }

    #[test]
    fn when_map_is_narrower_than_both_margins_then_knock_back_pins_to_margin() {
        let mut manager = EnemyManager::new(
            Difficulty::Easy,
            MapBounds::new(80.0, 80.0),
            EnemyTuning::default(),
            SmallRng::seed_from_u64(83),
        );
        let id = manager.spawn_enemy_at(TankKind::Assault, 40.0, 40.0, 0);
        manager.knock_back(id, 20.0, 40.0, 100.0);
        let enemy = &manager.enemies()[0];
        assert_eq!((enemy.tank.x, enemy.tank.y), (50.0, 50.0));
    }

    #[test]
    fn when_retreating_into_wall_then_heading_turns_away_from_wall() {
        let mut manager = manager(Difficulty::Easy, 43);
        let player = player_at(300.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 50.5, 300.0, 0);
        lock_behavior(&mut manager, id, Behavior::Retreat);
        manager.enemies[0].tank.angle = PI;

        manager.update_enemies(&player, 1_000);
        let enemy = &manager.enemies()[0];
        assert_eq!(enemy.tank.x, 50.0);
        let heading = enemy.retreat_heading.expect("wall bounce recorded");
        assert!(heading.cos() >= 0.0, "heading {heading} should point away from the left wall");
    }

    #[test]
    fn when_enemy_is_dead_then_it_is_skipped_but_kept() {
        let mut manager = manager(Difficulty::Easy, 47);
        let player = player_at(400.0, 300.0);
        let id = manager.spawn_enemy_at(TankKind::Assault, 400.0, 250.0, 0);
        lock_behavior(&mut manager, id, Behavior::Attack);
        assert!(manager.handle_enemy_hit(id, 500.0, 10));

        let update = manager.update_enemies(&player, 1_000);
        assert!(update.projectiles.is_empty());
        assert_eq!(update.enemies.len(), 1);
        assert_eq!(manager.live_count(), 0);
        assert!(manager.snapshots().is_empty());
    }

    #[test]
    fn when_hit_then_health_drops_and_hit_time_is_recorded() {
        let mut manager = manager(Difficulty::Easy, 53);
        let id = manager.spawn_enemy_at(TankKind::Assault, 400.0, 250.0, 0);

        assert!(!manager.handle_enemy_hit(id, 30.0, 1_234));
        let enemy = &manager.enemies()[0];
        assert_eq!(enemy.tank.health, 70.0);
        assert_eq!(enemy.tank.last_hit_at, 1_234);
        assert!(!manager.handle_enemy_hit(9, 30.0, 1_300));
    }

    #[test]
    fn when_boss_is_hit_then_behavior_never_changes() {
        let mut manager = manager(Difficulty::Hard, 59);
        let id = manager.spawn_enemy_at(TankKind::Heavy, 400.0, 250.0, 0);
        manager.promote_to_boss(0);
        assert_eq!(manager.enemies()[0].tank.max_health, 150.0 * 1.5 * 3.0);

        for i in 0..50 {
            manager.handle_enemy_hit(id, 1.0, 100 + i);
            assert_eq!(manager.enemies()[0].behavior, Behavior::Boss);
        }
    }

    #[test]
    fn when_non_boss_is_hit_repeatedly_then_some_hits_force_a_reaction() {
        let mut manager = manager(Difficulty::Medium, 61);
        let id = manager.spawn_enemy_at(TankKind::Heavy, 400.0, 250.0, 0);
        let mut reactions = 0;
        for i in 0..100 {
            manager.enemies[0].behavior = Behavior::Patrol;
            manager.handle_enemy_hit(id, 0.01, 100 + i);
            let behavior = manager.enemies()[0].behavior;
            assert!(matches!(
                behavior,
                Behavior::Patrol | Behavior::Retreat | Behavior::Attack
            ));
            if behavior != Behavior::Patrol {
                reactions += 1;
            }
        }
        assert!(reactions > 5 && reactions < 60, "reactions: {reactions}");
    }
}
