//! Single-player chapter session: one player tank against the enemy engine.
//!
//! A session is a plain synchronous state machine driven by `tick(now, input)`; the async
//! `chapter_task` wraps it in a fixed-rate loop for the local transport.

use crate::domain::catalog::{AbilityEffect, TankKind};
use crate::domain::math::distance;
use crate::domain::ports::{AudioSink, Clock, SoundCue};
use crate::domain::state::{
    BlockSnapshot, EntityId, MapBlock, MapBounds, PlayerInput, Powerup, PowerupKind, Projectile,
    ProjectileSnapshot, Tank, TankSnapshot, Team,
};
use crate::domain::systems::abilities::{
    AbilitySlot, Activation, cluster_volley, shockwave_targets,
};
use crate::domain::systems::combat::{
    CombatOutcome, HitEvent, TargetView, advance_projectiles, apply_hits, resolve_hits,
};
use crate::domain::systems::enemy_ai::EnemyManager;
use crate::domain::systems::map::generate_map;
use crate::domain::systems::movement::{FireModifiers, move_player, try_fire};
use crate::domain::systems::powerups::PowerupManager;
use crate::domain::tuning::GameTuning;
use crate::domain::tuning::enemy::Difficulty;
use crate::domain::tuning::map::MapTuning;
use crate::use_cases::types::{ChapterCommand, MatchStatus, WorldUpdate};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info};

/// The single player of a chapter.
pub const PLAYER_ID: EntityId = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Drive within capture distance of the flag once.
    ReachFlag,
    /// No enemy left alive.
    DestroyAll,
    /// Stay alive for the given time since the chapter started.
    Survive { duration_ms: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterConfig {
    pub chapter: u8,
    pub name: String,
    pub difficulty: Difficulty,
    pub player_kind: TankKind,
    /// Enemy archetypes, cycled in order while spawning.
    pub roster: Vec<TankKind>,
    /// All of them must hold to win. Empty means DESTROY_ALL.
    pub objectives: Vec<Objective>,
    pub bounds: MapBounds,
    pub seed: u64,
}

impl ChapterConfig {
    /// One of the three built-in chapters, numbered from 1.
    pub fn preset(chapter: u8, player_kind: TankKind) -> Option<Self> {
        let difficulty = match chapter {
            1 => Difficulty::Easy,
            2 => Difficulty::Medium,
            3 => Difficulty::Hard,
            _ => return None,
        };
        Some(Self::for_difficulty(difficulty, player_kind))
    }

    /// The built-in chapter played at `difficulty`.
    pub fn for_difficulty(difficulty: Difficulty, player_kind: TankKind) -> Self {
        use TankKind::*;

        let (chapter, name, roster, objectives) = match difficulty {
            Difficulty::Easy => (1, "Training Grounds", vec![Assault], vec![Objective::ReachFlag]),
            Difficulty::Medium => (
                2,
                "Urban Warfare",
                vec![Assault, Sniper, Scout],
                vec![Objective::ReachFlag, Objective::DestroyAll],
            ),
            Difficulty::Hard => (
                3,
                "Desert Storm",
                vec![Assault, Heavy, Sniper, Demolisher],
                vec![
                    Objective::ReachFlag,
                    Objective::Survive {
                        duration_ms: 120_000,
                    },
                ],
            ),
        };

        Self {
            chapter,
            name: name.to_string(),
            difficulty,
            player_kind,
            roster,
            objectives,
            bounds: MapBounds::new(800.0, 600.0),
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_bounds(mut self, bounds: MapBounds) -> Self {
        self.bounds = bounds;
        self
    }
}

/// What happened during one tick, for callers that react to events.
#[derive(Debug, Default)]
pub struct TickReport {
    pub hits: Vec<HitEvent>,
    /// Enemies whose death was accounted this tick.
    pub kills: Vec<EntityId>,
    pub collected: Option<Powerup>,
    pub status: MatchStatus,
}

pub struct ChapterSession {
    config: ChapterConfig,
    tuning: GameTuning,
    audio: Arc<dyn AudioSink>,
    rng: SmallRng,
    player: Tank,
    ability: AbilitySlot,
    spawned_at: u64,
    started_at: u64,
    enemies: EnemyManager,
    powerups: PowerupManager,
    player_projectiles: Vec<Projectile>,
    enemy_projectiles: Vec<Projectile>,
    blocks: Vec<MapBlock>,
    counted_dead: HashSet<EntityId>,
    next_projectile_id: EntityId,
    score: u32,
    kills: u32,
    tick: u64,
    status: MatchStatus,
    flag_reached: bool,
}

impl ChapterSession {
    pub fn new(
        config: ChapterConfig,
        tuning: GameTuning,
        audio: Arc<dyn AudioSink>,
        now: u64,
    ) -> Self {
        let seed = config.seed;
        Self::build(config, tuning, audio, seed, now)
    }

    fn build(
        config: ChapterConfig,
        tuning: GameTuning,
        audio: Arc<dyn AudioSink>,
        seed: u64,
        now: u64,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let (spawn_x, spawn_y) = tuning.player.spawn_point;
        let player = Tank::new(PLAYER_ID, config.player_kind, Team::Players, spawn_x, spawn_y);

        // Chapter maps are bounded by the canvas edge, not by walls.
        let map_tuning = MapTuning {
            border_walls: false,
            ..tuning.map
        };
        let keep_clear = [tuning.player.spawn_point, tuning.chapter.flag_position];
        let blocks = generate_map(config.bounds, &map_tuning, &keep_clear, &mut rng);

        let mut enemies = EnemyManager::new(
            config.difficulty,
            config.bounds,
            tuning.enemy,
            SmallRng::seed_from_u64(rng.random::<u64>()),
        );
        enemies.spawn_enemies(&player, &config.roster, now);
        let powerups = PowerupManager::new(
            tuning.powerup,
            now,
            SmallRng::seed_from_u64(rng.random::<u64>()),
        );

        info!(
            chapter = config.chapter,
            difficulty = ?config.difficulty,
            player_kind = %config.player_kind,
            enemies = enemies.live_count(),
            "chapter started"
        );

        Self {
            ability: AbilitySlot::for_kind(config.player_kind),
            config,
            tuning,
            audio,
            rng,
            player,
            spawned_at: now,
            started_at: now,
            enemies,
            powerups,
            player_projectiles: Vec::new(),
            enemy_projectiles: Vec::new(),
            blocks,
            counted_dead: HashSet::new(),
            next_projectile_id: 1,
            score: 0,
            kills: 0,
            tick: 0,
            status: MatchStatus::Running,
            flag_reached: false,
        }
    }

    /// Rebuilds the chapter from scratch on a fresh layout. Every cooldown, effect and
    /// pending projectile of the previous run is dropped.
    pub fn restart(&mut self, now: u64) {
        let seed = self.rng.random::<u64>();
        let config = self.config.clone();
        *self = Self::build(config, self.tuning, self.audio.clone(), seed, now);
        info!(chapter = self.config.chapter, "chapter restarted");
    }

    pub fn config(&self) -> &ChapterConfig {
        &self.config
    }

    pub fn player(&self) -> &Tank {
        &self.player
    }

    pub fn ability(&self) -> &AbilitySlot {
        &self.ability
    }

    pub fn enemy_engine(&self) -> &EnemyManager {
        &self.enemies
    }

    /// Direct access for scripted damage; deaths are still accounted on the next tick.
    pub fn enemy_engine_mut(&mut self) -> &mut EnemyManager {
        &mut self.enemies
    }

    pub fn powerups(&self) -> &PowerupManager {
        &self.powerups
    }

    pub fn blocks(&self) -> &[MapBlock] {
        &self.blocks
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn flag_reached(&self) -> bool {
        self.flag_reached
    }

    /// Advances the chapter by one simulation tick. A finished chapter ignores ticks until it
    /// is restarted.
    pub fn tick(&mut self, now: u64, input: &PlayerInput) -> TickReport {
        let mut report = TickReport {
            status: self.status,
            ..TickReport::default()
        };
        if self.status != MatchStatus::Running {
            return report;
        }
        self.tick += 1;

        if input.ability && self.player.is_alive() {
            self.activate_ability(now, input.aim);
        }

        let speed = self
            .powerups
            .get_effect_value(PLAYER_ID, PowerupKind::Speed, now)
            * self.ability.speed_multiplier(now);
        if self.player.is_alive() {
            move_player(
                &mut self.player,
                input,
                speed,
                self.config.bounds,
                self.tuning.player.half_extent,
                &self.blocks,
            );
        }

        if input.shoot {
            let modifiers = FireModifiers {
                reload: self
                    .powerups
                    .get_effect_value(PLAYER_ID, PowerupKind::RapidFire, now)
                    * self.ability.reload_multiplier(now),
                damage: self.ability.damage_multiplier(now),
                projectile_speed: self.ability.range_multiplier(now),
            };
            if let Some(shot) = try_fire(
                &mut self.player,
                input.aim,
                modifiers,
                now,
                &mut self.next_projectile_id,
                &mut self.rng,
            ) {
                self.player_projectiles.push(shot);
                self.audio.play(SoundCue::Shot);
            }
        }

        let update = self.enemies.update_enemies(&self.player, now);
        if !update.projectiles.is_empty() {
            self.audio.play(SoundCue::Shot);
        }
        self.enemy_projectiles.extend(update.projectiles);

        self.powerups.update(self.config.bounds, now);
        if let Some(powerup) = self.powerups.check_collisions(&mut self.player, now) {
            self.audio.play(SoundCue::PowerupCollected);
            report.collected = Some(powerup);
        }

        self.resolve_combat(now, &mut report);
        self.account_kills(&mut report);
        self.regenerate(now);
        self.evaluate_objectives(now);

        report.status = self.status;
        report
    }

    fn activate_ability(&mut self, now: u64, aim: f32) {
        let Some(activation) = self.ability.try_activate(PLAYER_ID, now) else {
            return;
        };
        self.audio.play(SoundCue::AbilityActivated);

        match activation {
            Activation::Instant(AbilityEffect::Shockwave {
                radius,
                damage,
                knockback,
            }) => {
                let targets = self.enemy_targets();
                let (x, y) = (self.player.x, self.player.y);
                for id in shockwave_targets(x, y, radius, &targets) {
                    self.enemies.handle_enemy_hit(id, damage, now);
                    self.enemies.knock_back(id, x, y, knockback);
                }
            }
            Activation::Instant(AbilityEffect::ClusterBomb {
                projectile_count,
                spread_angle,
            }) => {
                let aim = if aim.is_finite() { aim } else { self.player.angle };
                let volley = cluster_volley(
                    &self.player,
                    aim,
                    projectile_count,
                    spread_angle,
                    &mut self.next_projectile_id,
                    now,
                );
                self.player_projectiles.extend(volley);
                self.audio.play(SoundCue::Shot);
            }
            // Timed effects are read back through the slot's multipliers.
            Activation::Timed(_) | Activation::Instant(_) => {}
        }
    }

    fn enemy_targets(&self) -> Vec<TargetView> {
        self.enemies
            .enemies()
            .iter()
            .filter(|e| e.is_alive())
            .map(|e| TargetView::of(&e.tank, false))
            .collect()
    }

    fn player_invulnerable(&self, now: u64) -> bool {
        self.ability.invulnerable(now)
            || now < self.spawned_at + self.tuning.player.spawn_protection_ms
    }

    fn resolve_combat(&mut self, now: u64, report: &mut TickReport) {
        let bounds = self.config.bounds;
        let combat = self.tuning.combat;
        advance_projectiles(&mut self.player_projectiles, bounds, now, &combat);
        advance_projectiles(&mut self.enemy_projectiles, bounds, now, &combat);

        let enemy_targets = self.enemy_targets();
        let outgoing = resolve_hits(
            &mut self.player_projectiles,
            &enemy_targets,
            &mut self.blocks,
            &self.powerups,
            now,
            &combat,
        );
        for hit in &outgoing.hits {
            self.enemies.handle_enemy_hit(hit.victim_id, hit.damage, now);
        }

        let player_target = if self.player.is_alive() {
            vec![TargetView::of(&self.player, self.player_invulnerable(now))]
        } else {
            Vec::new()
        };
        let incoming = resolve_hits(
            &mut self.enemy_projectiles,
            &player_target,
            &mut self.blocks,
            &self.powerups,
            now,
            &combat,
        );
        let defeated = apply_hits(&incoming.hits, std::slice::from_mut(&mut self.player), now);
        if !defeated.is_empty() {
            self.audio.play(SoundCue::TankDestroyed);
        }

        for outcome in [outgoing, incoming] {
            self.play_outcome(&outcome);
            report.hits.extend(outcome.hits);
        }
    }

    fn play_outcome(&self, outcome: &CombatOutcome) {
        if !outcome.hits.is_empty() || !outcome.block_hits.is_empty() {
            self.audio.play(SoundCue::Hit);
        }
        if !outcome.explosions.is_empty() {
            self.audio.play(SoundCue::Explosion);
        }
    }

    // Kills are counted on the alive-to-dead transition, whoever caused it.
    fn account_kills(&mut self, report: &mut TickReport) {
        let newly_dead: Vec<EntityId> = self
            .enemies
            .enemies()
            .iter()
            .filter(|e| !e.is_alive() && !self.counted_dead.contains(&e.id()))
            .map(|e| e.id())
            .collect();

        for id in newly_dead {
            self.counted_dead.insert(id);
            self.kills += 1;
            self.score += self.tuning.player.score_per_kill;
            self.audio.play(SoundCue::TankDestroyed);
            debug!(enemy_id = id, kills = self.kills, score = self.score, "enemy destroyed");
            report.kills.push(id);
        }
    }

    fn regenerate(&mut self, now: u64) {
        let tuning = &self.tuning.player;
        let player = &mut self.player;
        if player.is_alive()
            && player.health < player.max_health
            && now.saturating_sub(player.last_hit_at) >= tuning.out_of_combat_ms
        {
            player.heal(tuning.health_regen);
        }
    }

    fn evaluate_objectives(&mut self, now: u64) {
        if !self.player.is_alive() {
            self.finish(MatchStatus::Lost);
            return;
        }

        let flag = self.tuning.chapter;
        if !self.flag_reached && self.config.objectives.contains(&Objective::ReachFlag) {
            let (fx, fy) = flag.flag_position;
            if distance(self.player.x, self.player.y, fx, fy) <= flag.capture_distance {
                self.flag_reached = true;
                self.score += flag.flag_points;
                info!(score = self.score, "flag reached");
            }
        }

        let destroy_all = [Objective::DestroyAll];
        let objectives = if self.config.objectives.is_empty() {
            &destroy_all[..]
        } else {
            &self.config.objectives[..]
        };
        let complete = objectives.iter().all(|objective| match objective {
            Objective::ReachFlag => self.flag_reached,
            Objective::DestroyAll => self.enemies.live_count() == 0,
            Objective::Survive { duration_ms } => {
                now.saturating_sub(self.started_at) >= *duration_ms
            }
        });
        if complete {
            self.finish(MatchStatus::Won);
        }
    }

    fn finish(&mut self, status: MatchStatus) {
        self.status = status;
        self.audio.play(match status {
            MatchStatus::Won => SoundCue::MissionWon,
            _ => SoundCue::MissionLost,
        });
        info!(
            chapter = self.config.chapter,
            ?status,
            score = self.score,
            kills = self.kills,
            "chapter finished"
        );
    }

    pub fn snapshot(&self, now: u64) -> WorldUpdate {
        WorldUpdate {
            tick: self.tick,
            players: vec![TankSnapshot::new(
                &self.player,
                self.powerups.player_effects(PLAYER_ID, now),
            )],
            enemies: self.enemies.snapshots(),
            projectiles: self
                .player_projectiles
                .iter()
                .chain(&self.enemy_projectiles)
                .map(ProjectileSnapshot::from)
                .collect(),
            powerups: self.powerups.snapshots(),
            blocks: self.blocks.iter().map(BlockSnapshot::from).collect(),
            score: self.score,
            kills: self.kills,
            status: self.status,
            flag: self
                .config
                .objectives
                .contains(&Objective::ReachFlag)
                .then_some(self.tuning.chapter.flag_position),
        }
    }
}

/// Drives a chapter session at a fixed rate until its command channel closes.
///
/// The latest `Input` command is held and replayed every tick; `Ability` fires once on the
/// next tick. A snapshot is broadcast after every tick.
pub async fn chapter_task(
    mut session: ChapterSession,
    mut command_rx: mpsc::Receiver<ChapterCommand>,
    world_tx: broadcast::Sender<WorldUpdate>,
    tick_interval: Duration,
    clock: Arc<dyn Clock>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    let mut held = PlayerInput::default();
    let mut ability_requested = false;

    loop {
        interval.tick().await;

        loop {
            match command_rx.try_recv() {
                Ok(ChapterCommand::Input(input)) => held = input,
                Ok(ChapterCommand::Ability) => ability_requested = true,
                Ok(ChapterCommand::Restart) => {
                    session.restart(clock.now_millis());
                    held = PlayerInput::default();
                    ability_requested = false;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!(chapter = session.config().chapter, "chapter session closed");
                    return;
                }
            }
        }

        let now = clock.now_millis();
        let mut input = held;
        input.ability |= std::mem::take(&mut ability_requested);
        session.tick(now, &input);

        // No subscribers is fine; the session keeps running until the transport drops.
        let _ = world_tx.send(session.snapshot(now));
    }
}
