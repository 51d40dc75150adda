// Use-case level inputs/outputs for the session drivers.

use crate::domain::{
    BlockSnapshot, EnemySnapshot, EntityId, PlayerInput, PowerupSnapshot, ProjectileSnapshot,
    TankKind, TankSnapshot,
};

/// A player's intent as seen by a transport, independent of the mode behind it.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Join { kind: TankKind },
    MoveTo { x: f32, y: f32, angle: f32 },
    Shoot { angle: f32, speed: f32 },
    Input(PlayerInput),
    Ability,
    Restart,
    Leave,
}

/// Events consumed by an arena world task.
#[derive(Debug, Clone, PartialEq)]
pub enum ArenaEvent {
    Join { player_id: EntityId, kind: TankKind },
    MoveTo { player_id: EntityId, x: f32, y: f32, angle: f32 },
    Shoot { player_id: EntityId, angle: f32, speed: f32 },
    Leave { player_id: EntityId },
}

/// Commands consumed by a chapter task.
#[derive(Debug, Clone, PartialEq)]
pub enum ChapterCommand {
    /// Latest held input; replaces the previous one.
    Input(PlayerInput),
    /// Fire the special ability on the next tick.
    Ability,
    Restart,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchStatus {
    #[default]
    Running,
    Won,
    Lost,
}

/// Full read-only snapshot handed to renderers every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldUpdate {
    pub tick: u64,
    pub players: Vec<TankSnapshot>,
    pub enemies: Vec<EnemySnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub powerups: Vec<PowerupSnapshot>,
    pub blocks: Vec<BlockSnapshot>,
    pub score: u32,
    pub kills: u32,
    pub status: MatchStatus,
    pub flag: Option<(f32, f32)>,
}
