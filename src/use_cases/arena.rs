// Authoritative PvP arena: roster, projectiles, blocks and powerups for one match.

use crate::domain::math::normalize_angle;
use crate::domain::ports::Clock;
use crate::domain::state::{
    BlockSnapshot, EntityId, MapBlock, MapBounds, Projectile, ProjectileSnapshot, Tank,
    TankSnapshot, Team,
};
use crate::domain::systems::combat::{TargetView, advance_projectiles, apply_hits, resolve_hits};
use crate::domain::systems::map::{find_spawn_point, generate_map, tank_collides};
use crate::domain::systems::powerups::PowerupManager;
use crate::domain::tuning::GameTuning;
use crate::use_cases::types::{ArenaEvent, MatchStatus, WorldUpdate};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, info, warn};

pub struct Arena {
    bounds: MapBounds,
    tuning: GameTuning,
    players: Vec<Tank>,
    projectiles: Vec<Projectile>,
    blocks: Vec<MapBlock>,
    powerups: PowerupManager,
    rng: SmallRng,
    next_projectile_id: EntityId,
    tick: u64,
    defeated: u32,
}

impl Arena {
    pub fn new(bounds: MapBounds, tuning: GameTuning, seed: u64, now: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let blocks = generate_map(bounds, &tuning.map, &[], &mut rng);
        let powerups = PowerupManager::new(
            tuning.powerup,
            now,
            SmallRng::seed_from_u64(rng.random::<u64>()),
        );
        Self {
            bounds,
            tuning,
            players: Vec::new(),
            projectiles: Vec::new(),
            blocks,
            powerups,
            rng,
            next_projectile_id: 1,
            tick: 0,
            defeated: 0,
        }
    }

    pub fn players(&self) -> &[Tank] {
        &self.players
    }

    pub fn player(&self, player_id: EntityId) -> Option<&Tank> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn blocks(&self) -> &[MapBlock] {
        &self.blocks
    }

    /// Applies one intent. Returns true when the world changed and a snapshot is due.
    pub fn apply(&mut self, event: ArenaEvent, now: u64) -> bool {
        match event {
            ArenaEvent::Join { player_id, kind } => {
                if self.player(player_id).is_some() {
                    debug!(player_id, "duplicate join ignored");
                    return false;
                }
                let half = self.tuning.player.half_extent;
                let Some((x, y)) = find_spawn_point(
                    self.bounds,
                    half,
                    &self.blocks,
                    self.tuning.player.spawn_attempts,
                    &mut self.rng,
                ) else {
                    warn!(player_id, "no free spawn point; join rejected");
                    return false;
                };
                self.players
                    .push(Tank::new(player_id, kind, Team::FreeForAll, x, y));
                info!(player_id, %kind, x, y, "player joined");
                true
            }
            ArenaEvent::MoveTo {
                player_id,
                x,
                y,
                angle,
            } => {
                let half = self.tuning.player.half_extent;
                let bounds = self.bounds;
                let blocked = !x.is_finite()
                    || !y.is_finite()
                    || x < half
                    || y < half
                    || x > bounds.width - half
                    || y > bounds.height - half
                    || tank_collides(x, y, half, &self.blocks);
                let Some(tank) = self.players.iter_mut().find(|p| p.id == player_id) else {
                    return false;
                };
                // Last write wins; the facing applies even when the move is refused.
                if angle.is_finite() {
                    tank.angle = normalize_angle(angle);
                }
                if !blocked {
                    tank.x = x;
                    tank.y = y;
                }
                true
            }
            ArenaEvent::Shoot {
                player_id,
                angle,
                speed,
            } => {
                if !angle.is_finite() || !speed.is_finite() {
                    debug!(player_id, "non-finite shot dropped");
                    return false;
                }
                let Some(tank) = self.players.iter_mut().find(|p| p.id == player_id) else {
                    return false;
                };
                let archetype = tank.archetype();
                let id = self.next_projectile_id;
                self.next_projectile_id += 1;
                tank.last_shot = now;
                self.projectiles.push(Projectile {
                    id,
                    owner_id: tank.id,
                    team: tank.team,
                    x: tank.x + angle.cos() * archetype.barrel_length,
                    y: tank.y + angle.sin() * archetype.barrel_length,
                    angle,
                    speed,
                    damage: archetype.weapon.damage,
                    explosion_radius: archetype.weapon.explosion_radius,
                    created_at: now,
                });
                true
            }
            ArenaEvent::Leave { player_id } => {
                let before = self.players.len();
                self.players.retain(|p| p.id != player_id);
                self.projectiles.retain(|p| p.owner_id != player_id);
                self.powerups.remove_player(player_id);
                if self.players.len() == before {
                    return false;
                }
                info!(player_id, "player left");
                true
            }
        }
    }

    /// Advances one tick. Returns the players defeated and removed during it.
    pub fn step(&mut self, now: u64) -> Vec<EntityId> {
        self.tick += 1;
        let combat = self.tuning.combat;
        advance_projectiles(&mut self.projectiles, self.bounds, now, &combat);

        let targets: Vec<TargetView> = self
            .players
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| TargetView::of(p, false))
            .collect();
        let outcome = resolve_hits(
            &mut self.projectiles,
            &targets,
            &mut self.blocks,
            &self.powerups,
            now,
            &combat,
        );
        let defeated = apply_hits(&outcome.hits, &mut self.players, now);
        if !defeated.is_empty() {
            self.players.retain(|p| p.is_alive());
            for id in &defeated {
                self.powerups.remove_player(*id);
            }
            self.defeated += defeated.len() as u32;
        }

        self.powerups.update(self.bounds, now);
        for player in &mut self.players {
            self.powerups.check_collisions(player, now);
        }
        defeated
    }

    pub fn snapshot(&self, now: u64) -> WorldUpdate {
        WorldUpdate {
            tick: self.tick,
            players: self
                .players
                .iter()
                .map(|p| TankSnapshot::new(p, self.powerups.player_effects(p.id, now)))
                .collect(),
            enemies: Vec::new(),
            projectiles: self.projectiles.iter().map(ProjectileSnapshot::from).collect(),
            powerups: self.powerups.snapshots(),
            blocks: self.blocks.iter().map(BlockSnapshot::from).collect(),
            score: 0,
            kills: self.defeated,
            status: MatchStatus::Running,
            flag: None,
        }
    }
}

/// Fixed-rate world loop for one arena.
///
/// Drains pending intents each tick, broadcasting after every intent that changed the world,
/// then steps the simulation and broadcasts the result.
pub async fn arena_task(
    mut arena: Arena,
    mut input_rx: mpsc::Receiver<ArenaEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    tick_interval: Duration,
    clock: Arc<dyn Clock>,
    shutdown: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the arena is removed.
                break;
            }
            _ = interval.tick() => {}
        }

        loop {
            match input_rx.try_recv() {
                Ok(event) => {
                    let now = clock.now_millis();
                    if arena.apply(event, now) {
                        let _ = world_tx.send(arena.snapshot(now));
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("arena input closed; world task exiting");
                    return;
                }
            }
        }

        let now = clock.now_millis();
        arena.step(now);
        let _ = world_tx.send(arena.snapshot(now));
    }
    info!(players = arena.players().len(), "arena world task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::TankKind;
    use crate::domain::state::BlockKind;

    fn arena() -> Arena {
        Arena::new(MapBounds::new(800.0, 600.0), GameTuning::default(), 9, 0)
    }

    fn join(arena: &mut Arena, player_id: EntityId, kind: TankKind) -> (f32, f32) {
        assert!(arena.apply(ArenaEvent::Join { player_id, kind }, 0));
        let p = arena.player(player_id).expect("joined");
        (p.x, p.y)
    }

    // Puts the player on an open interior spot and clears every obstacle.
    fn place(arena: &mut Arena, player_id: EntityId, x: f32, y: f32) {
        arena.blocks.retain(|b| b.kind == BlockKind::Wall);
        assert!(arena.apply(
            ArenaEvent::MoveTo {
                player_id,
                x,
                y,
                angle: 0.0,
            },
            0,
        ));
    }

    #[test]
    fn when_player_joins_then_spawn_is_free_of_blocks() {
        let mut arena = arena();
        let (x, y) = join(&mut arena, 7, TankKind::Heavy);
        assert!(!tank_collides(x, y, 20.0, arena.blocks()));
        assert_eq!(arena.player(7).map(|p| p.max_health), Some(150.0));
        assert!(!arena.apply(
            ArenaEvent::Join {
                player_id: 7,
                kind: TankKind::Heavy,
            },
            0,
        ));
    }

    #[test]
    fn when_move_collides_then_only_the_angle_changes() {
        let mut arena = arena();
        join(&mut arena, 1, TankKind::Assault);
        place(&mut arena, 1, 300.0, 300.0);
        arena.blocks.push(MapBlock {
            x: 400.0,
            y: 300.0,
            kind: BlockKind::Rock,
            health: f32::INFINITY,
        });

        arena.apply(
            ArenaEvent::MoveTo {
                player_id: 1,
                x: 420.0,
                y: 320.0,
                angle: 1.0,
            },
            0,
        );
        let p = arena.player(1).expect("player");
        assert_eq!((p.x, p.y), (300.0, 300.0));
        assert_eq!(p.angle, 1.0);
    }

    #[test]
    fn when_shots_land_then_victim_is_damaged_and_removed_at_zero() {
        let mut arena = arena();
        join(&mut arena, 1, TankKind::Sniper);
        join(&mut arena, 2, TankKind::Scout);
        place(&mut arena, 1, 200.0, 300.0);
        place(&mut arena, 2, 300.0, 300.0);

        // Sniper damage 35 against 70 health: two hits defeat the scout.
        for round in 0..2u64 {
            arena.apply(
                ArenaEvent::Shoot {
                    player_id: 1,
                    angle: 0.0,
                    speed: 10.0,
                },
                round * 1_000,
            );
            let mut defeated = Vec::new();
            for t in 0..10 {
                defeated.extend(arena.step(round * 1_000 + t));
            }
            if round == 0 {
                assert_eq!(arena.player(2).map(|p| p.health), Some(35.0));
                assert!(defeated.is_empty());
            } else {
                assert_eq!(defeated, vec![2]);
            }
        }

        assert!(arena.player(2).is_none());
        assert_eq!(arena.snapshot(5_000).kills, 1);
    }

    #[test]
    fn when_shot_is_not_finite_then_it_is_dropped() {
        let mut arena = arena();
        join(&mut arena, 1, TankKind::Assault);
        assert!(!arena.apply(
            ArenaEvent::Shoot {
                player_id: 1,
                angle: f32::NAN,
                speed: 10.0,
            },
            0,
        ));
        assert!(arena.projectiles().is_empty());
    }

    #[test]
    fn when_player_leaves_then_their_projectiles_go_too() {
        let mut arena = arena();
        join(&mut arena, 1, TankKind::Assault);
        arena.apply(
            ArenaEvent::Shoot {
                player_id: 1,
                angle: 0.0,
                speed: 1.0,
            },
            0,
        );
        assert!(arena.apply(ArenaEvent::Leave { player_id: 1 }, 0));
        assert!(arena.players().is_empty());
        assert!(arena.projectiles().is_empty());
        assert!(!arena.apply(ArenaEvent::Leave { player_id: 1 }, 0));
    }

    struct StepClock(std::sync::atomic::AtomicU64);

    impl Clock for StepClock {
        fn now_millis(&self) -> u64 {
            self.0.fetch_add(16, std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn when_intent_arrives_then_snapshot_includes_the_player() {
        let (input_tx, input_rx) = mpsc::channel(16);
        let (world_tx, mut world_rx) = broadcast::channel(1024);
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(arena_task(
            arena(),
            input_rx,
            world_tx,
            Duration::from_millis(1),
            Arc::new(StepClock(std::sync::atomic::AtomicU64::new(0))),
            shutdown.clone(),
        ));

        input_tx
            .send(ArenaEvent::Join {
                player_id: 5,
                kind: TankKind::Scout,
            })
            .await
            .expect("send join");

        let update = loop {
            let update = world_rx.recv().await.expect("snapshot");
            if !update.players.is_empty() {
                break update;
            }
        };
        assert_eq!(update.players[0].id, 5);
        assert!(!update.blocks.is_empty());

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("task stops")
            .expect("task did not panic");
    }
}
