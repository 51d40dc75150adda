// Domain-level simulation entities and input/snapshot types.

use super::catalog::{TankArchetype, TankKind};
use serde::{Deserialize, Serialize};

pub type EntityId = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub width: f32,
    pub height: f32,
}

impl MapBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && x <= self.width && y >= 0.0 && y <= self.height
    }
}

/// Which side a tank or projectile fights for.
///
/// `FreeForAll` is used in PvP where every tank is hostile to every other tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Players,
    Enemies,
    FreeForAll,
}

/// Normalized control intent for a player tank in chapter mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    pub move_x: f32,
    pub move_y: f32,
    pub aim: f32,
    pub shoot: bool,
    pub ability: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tank {
    pub id: EntityId,
    pub kind: TankKind,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    /// Facing in radians, kept in `[0, 2π)`.
    pub angle: f32,
    pub health: f32,
    pub max_health: f32,
    pub last_shot: u64,
    pub last_hit_at: u64,
    pub defeated: bool,
}

impl Tank {
    pub fn new(id: EntityId, kind: TankKind, team: Team, x: f32, y: f32) -> Self {
        let max_health = kind.archetype().max_health;
        Self {
            id,
            kind,
            team,
            x,
            y,
            angle: 0.0,
            health: max_health,
            max_health,
            last_shot: 0,
            last_hit_at: 0,
            defeated: false,
        }
    }

    pub fn archetype(&self) -> &'static TankArchetype {
        self.kind.archetype()
    }

    pub fn is_alive(&self) -> bool {
        !self.defeated && self.health > 0.0
    }

    /// Subtracts `amount` and flags the tank defeated once health reaches zero.
    ///
    /// Returns true only on the hit that defeats the tank.
    pub fn apply_damage(&mut self, amount: f32, now: u64) -> bool {
        if self.defeated {
            return false;
        }
        self.health -= amount;
        self.last_hit_at = now;
        if self.health <= 0.0 {
            self.defeated = true;
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: f32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn has_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.angle.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Behavior {
    Patrol,
    Chase,
    Attack,
    Retreat,
    Flank,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Normal,
    Scout,
    Heavy,
    Sniper,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantModifiers {
    pub speed: f32,
    pub health: f32,
    pub damage: f32,
    pub reload: f32,
}

impl Variant {
    pub fn modifiers(self) -> VariantModifiers {
        match self {
            Variant::Normal => VariantModifiers {
                speed: 1.0,
                health: 1.0,
                damage: 1.0,
                reload: 1.0,
            },
            Variant::Scout => VariantModifiers {
                speed: 1.5,
                health: 0.8,
                damage: 0.8,
                reload: 0.7,
            },
            Variant::Heavy => VariantModifiers {
                speed: 0.7,
                health: 1.5,
                damage: 1.3,
                reload: 1.2,
            },
            Variant::Sniper => VariantModifiers {
                speed: 0.8,
                health: 0.9,
                damage: 1.5,
                reload: 1.5,
            },
        }
    }

    /// Variant that matches an archetype's role.
    pub fn for_kind(kind: TankKind) -> Self {
        match kind {
            TankKind::Scout => Variant::Scout,
            TankKind::Heavy => Variant::Heavy,
            TankKind::Sniper => Variant::Sniper,
            TankKind::Assault | TankKind::Demolisher => Variant::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub tank: Tank,
    pub behavior: Behavior,
    pub variant: Variant,
    pub is_boss: bool,
    /// Movement speed per AI step after difficulty and variant modifiers.
    pub speed: f32,
    pub last_behavior_change: u64,
    pub behavior_change_interval: u64,
    pub patrol_point: (f32, f32),
    pub flank_point: Option<(f32, f32)>,
    /// Player position the current flank point was computed against.
    pub flank_anchor: Option<(f32, f32)>,
    /// Heading forced by a wall bounce while retreating.
    pub retreat_heading: Option<f32>,
}

impl Enemy {
    pub fn id(&self) -> EntityId {
        self.tank.id
    }

    pub fn is_alive(&self) -> bool {
        self.tank.is_alive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Units travelled per tick.
    pub speed: f32,
    pub damage: f32,
    pub explosion_radius: Option<f32>,
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerupKind {
    Health,
    Speed,
    Damage,
    Shield,
    RapidFire,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 5] = [
        PowerupKind::Health,
        PowerupKind::Speed,
        PowerupKind::Damage,
        PowerupKind::Shield,
        PowerupKind::RapidFire,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Powerup {
    pub id: EntityId,
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
    pub created_at: u64,
    pub value: f32,
    pub duration_ms: u64,
    pub collected: bool,
    pub collected_by: Option<EntityId>,
    pub expires_at: Option<u64>,
}

/// A timed stat modifier attached to a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEffect {
    pub kind: PowerupKind,
    pub value: f32,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Wall,
    Crate,
    Rock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapBlock {
    pub x: f32,
    pub y: f32,
    pub kind: BlockKind,
    /// `f32::INFINITY` marks an indestructible block.
    pub health: f32,
}

impl MapBlock {
    pub fn is_destructible(&self) -> bool {
        self.health.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankSnapshot {
    pub id: EntityId,
    pub kind: TankKind,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub health: f32,
    pub max_health: f32,
    pub effects: Vec<ActiveEffect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemySnapshot {
    pub id: EntityId,
    pub kind: TankKind,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub health: f32,
    pub max_health: f32,
    pub behavior: Behavior,
    pub variant: Variant,
    pub is_boss: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSnapshot {
    pub id: EntityId,
    pub owner_id: EntityId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub explosive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerupSnapshot {
    pub id: EntityId,
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockSnapshot {
    pub x: f32,
    pub y: f32,
    pub kind: BlockKind,
    pub health: Option<f32>,
}

impl From<&Enemy> for EnemySnapshot {
    fn from(e: &Enemy) -> Self {
        Self {
            id: e.tank.id,
            kind: e.tank.kind,
            x: e.tank.x,
            y: e.tank.y,
            angle: e.tank.angle,
            health: e.tank.health,
            max_health: e.tank.max_health,
            behavior: e.behavior,
            variant: e.variant,
            is_boss: e.is_boss,
        }
    }
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            x: p.x,
            y: p.y,
            angle: p.angle,
            explosive: p.explosion_radius.is_some(),
        }
    }
}

impl From<&Powerup> for PowerupSnapshot {
    fn from(p: &Powerup) -> Self {
        Self {
            id: p.id,
            kind: p.kind,
            x: p.x,
            y: p.y,
        }
    }
}

impl From<&MapBlock> for BlockSnapshot {
    fn from(b: &MapBlock) -> Self {
        Self {
            x: b.x,
            y: b.y,
            kind: b.kind,
            // Infinity is not representable in JSON, so indestructible blocks carry None.
            health: b.is_destructible().then_some(b.health),
        }
    }
}

impl TankSnapshot {
    pub fn new(tank: &Tank, effects: Vec<ActiveEffect>) -> Self {
        Self {
            id: tank.id,
            kind: tank.kind,
            x: tank.x,
            y: tank.y,
            angle: tank.angle,
            health: tank.health,
            max_health: tank.max_health,
            effects,
        }
    }
}
