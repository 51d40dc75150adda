// Wire protocol DTOs and conversions for public game server messages.
// Ids travel as strings; enemy and projectile ids exceed what JS numbers hold exactly.

use crate::domain::state::{
    ActiveEffect, Behavior, BlockKind, BlockSnapshot, EnemySnapshot, EntityId, PlayerInput,
    PowerupKind, PowerupSnapshot, ProjectileSnapshot, TankSnapshot, Variant,
};
use crate::domain::{CatalogError, TankKind};
use crate::use_cases::{Intent, MatchStatus, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: String },
    // Snapshot of the world for a given tick.
    WorldUpdate(WorldUpdateDto),
    // A message the server understood but refused.
    Rejected { reason: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message; picks the tank archetype.
    Join(JoinPayload),
    // PvP: absolute position and facing computed by the client.
    Move(MovePayload),
    // PvP: fire one projectile.
    Shoot(ShootPayload),
    // Chapter: held control state, replayed every tick until replaced.
    Input(PlayerInputDto),
    Ability,
    Restart,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub tank_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePayload {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub angle: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShootPayload {
    pub angle: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerInputDto {
    #[serde(default)]
    pub move_x: f32,
    #[serde(default)]
    pub move_y: f32,
    #[serde(default)]
    pub aim: f32,
    #[serde(default)]
    pub shoot: bool,
    #[serde(default)]
    pub ability: bool,
}

impl From<PlayerInputDto> for PlayerInput {
    fn from(input: PlayerInputDto) -> Self {
        Self {
            move_x: input.move_x,
            move_y: input.move_y,
            aim: input.aim,
            shoot: input.shoot,
            ability: input.ability,
        }
    }
}

impl From<PlayerInput> for PlayerInputDto {
    fn from(input: PlayerInput) -> Self {
        Self {
            move_x: input.move_x,
            move_y: input.move_y,
            aim: input.aim,
            shoot: input.shoot,
            ability: input.ability,
        }
    }
}

impl JoinPayload {
    /// Archetype requested by the client; ASSAULT when none is given.
    pub fn tank_kind(&self) -> Result<TankKind, CatalogError> {
        match self.tank_type.as_deref() {
            Some(key) => key.parse(),
            None => Ok(TankKind::Assault),
        }
    }
}

impl ClientMessage {
    /// Maps a client message onto a transport intent. Join carries the parsed archetype.
    pub fn into_intent(self) -> Result<Intent, CatalogError> {
        Ok(match self {
            ClientMessage::Join(payload) => Intent::Join {
                kind: payload.tank_kind()?,
            },
            ClientMessage::Move(m) => Intent::MoveTo {
                x: m.x,
                y: m.y,
                angle: m.angle,
            },
            ClientMessage::Shoot(s) => Intent::Shoot {
                angle: s.angle,
                speed: s.speed,
            },
            ClientMessage::Input(input) => Intent::Input(input.into()),
            ClientMessage::Ability => Intent::Ability,
            ClientMessage::Restart => Intent::Restart,
        })
    }

    /// Wire form of an intent. Leaving has none; the client just closes the socket.
    pub fn from_intent(intent: &Intent) -> Option<Self> {
        Some(match *intent {
            Intent::Join { kind } => ClientMessage::Join(JoinPayload {
                tank_type: Some(kind.key().to_string()),
            }),
            Intent::MoveTo { x, y, angle } => ClientMessage::Move(MovePayload { x, y, angle }),
            Intent::Shoot { angle, speed } => ClientMessage::Shoot(ShootPayload { angle, speed }),
            Intent::Input(input) => ClientMessage::Input(input.into()),
            Intent::Ability => ClientMessage::Ability,
            Intent::Restart => ClientMessage::Restart,
            Intent::Leave => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatusDto {
    Running,
    Won,
    Lost,
}

impl From<MatchStatus> for MatchStatusDto {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Running => MatchStatusDto::Running,
            MatchStatus::Won => MatchStatusDto::Won,
            MatchStatus::Lost => MatchStatusDto::Lost,
        }
    }
}

impl From<MatchStatusDto> for MatchStatus {
    fn from(status: MatchStatusDto) -> Self {
        match status {
            MatchStatusDto::Running => MatchStatus::Running,
            MatchStatusDto::Won => MatchStatus::Won,
            MatchStatusDto::Lost => MatchStatus::Lost,
        }
    }
}

/// Snapshot of the world sent to clients on each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub players: Vec<TankStateDto>,
    #[serde(default)]
    pub enemies: Vec<EnemyStateDto>,
    #[serde(default)]
    pub projectiles: Vec<ProjectileStateDto>,
    #[serde(default)]
    pub powerups: Vec<PowerupStateDto>,
    #[serde(default)]
    pub blocks: Vec<BlockStateDto>,
    pub score: u32,
    pub kills: u32,
    pub status: MatchStatusDto,
    #[serde(default)]
    pub flag: Option<PointDto>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointDto {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDto {
    pub kind: PowerupKind,
    pub value: f32,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TankStateDto {
    pub id: String,
    pub tank_type: TankKind,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub health: f32,
    pub max_health: f32,
    #[serde(default)]
    pub effects: Vec<EffectDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyStateDto {
    pub id: String,
    pub tank_type: TankKind,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub health: f32,
    pub max_health: f32,
    pub behavior: Behavior,
    pub variant: Variant,
    pub is_boss: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileStateDto {
    pub id: String,
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    #[serde(default)]
    pub explosive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerupStateDto {
    pub id: String,
    pub kind: PowerupKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStateDto {
    pub x: f32,
    pub y: f32,
    pub kind: BlockKind,
    /// Absent for indestructible blocks.
    #[serde(default)]
    pub health: Option<f32>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            players: update
                .players
                .into_iter()
                .map(|p| TankStateDto {
                    id: p.id.to_string(),
                    tank_type: p.kind,
                    x: p.x,
                    y: p.y,
                    angle: p.angle,
                    health: p.health,
                    max_health: p.max_health,
                    effects: p
                        .effects
                        .into_iter()
                        .map(|e| EffectDto {
                            kind: e.kind,
                            value: e.value,
                            expires_at: e.expires_at,
                        })
                        .collect(),
                })
                .collect(),
            enemies: update
                .enemies
                .into_iter()
                .map(|e| EnemyStateDto {
                    id: e.id.to_string(),
                    tank_type: e.kind,
                    x: e.x,
                    y: e.y,
                    angle: e.angle,
                    health: e.health,
                    max_health: e.max_health,
                    behavior: e.behavior,
                    variant: e.variant,
                    is_boss: e.is_boss,
                })
                .collect(),
            projectiles: update
                .projectiles
                .into_iter()
                .map(|p| ProjectileStateDto {
                    id: p.id.to_string(),
                    owner_id: p.owner_id.to_string(),
                    x: p.x,
                    y: p.y,
                    angle: p.angle,
                    explosive: p.explosive,
                })
                .collect(),
            powerups: update
                .powerups
                .into_iter()
                .map(|p| PowerupStateDto {
                    id: p.id.to_string(),
                    kind: p.kind,
                    x: p.x,
                    y: p.y,
                })
                .collect(),
            blocks: update
                .blocks
                .into_iter()
                .map(|b| BlockStateDto {
                    x: b.x,
                    y: b.y,
                    kind: b.kind,
                    health: b.health,
                })
                .collect(),
            score: update.score,
            kills: update.kills,
            status: update.status.into(),
            flag: update.flag.map(|(x, y)| PointDto { x, y }),
        }
    }
}

pub fn parse_id(id: &str) -> Result<EntityId, String> {
    id.parse().map_err(|_| format!("invalid id `{id}`"))
}

impl TryFrom<WorldUpdateDto> for WorldUpdate {
    type Error = String;

    fn try_from(dto: WorldUpdateDto) -> Result<Self, Self::Error> {
        let players = dto
            .players
            .into_iter()
            .map(|p| {
                Ok(TankSnapshot {
                    id: parse_id(&p.id)?,
                    kind: p.tank_type,
                    x: p.x,
                    y: p.y,
                    angle: p.angle,
                    health: p.health,
                    max_health: p.max_health,
                    effects: p
                        .effects
                        .into_iter()
                        .map(|e| ActiveEffect {
                            kind: e.kind,
                            value: e.value,
                            expires_at: e.expires_at,
                        })
                        .collect(),
                })
            })
            .collect::<Result<_, String>>()?;

        let enemies = dto
            .enemies
            .into_iter()
            .map(|e| {
                Ok(EnemySnapshot {
                    id: parse_id(&e.id)?,
                    kind: e.tank_type,
                    x: e.x,
                    y: e.y,
                    angle: e.angle,
                    health: e.health,
                    max_health: e.max_health,
                    behavior: e.behavior,
                    variant: e.variant,
                    is_boss: e.is_boss,
                })
            })
            .collect::<Result<_, String>>()?;

        let projectiles = dto
            .projectiles
            .into_iter()
            .map(|p| {
                Ok(ProjectileSnapshot {
                    id: parse_id(&p.id)?,
                    owner_id: parse_id(&p.owner_id)?,
                    x: p.x,
                    y: p.y,
                    angle: p.angle,
                    explosive: p.explosive,
                })
            })
            .collect::<Result<_, String>>()?;

        let powerups = dto
            .powerups
            .into_iter()
            .map(|p| {
                Ok(PowerupSnapshot {
                    id: parse_id(&p.id)?,
                    kind: p.kind,
                    x: p.x,
                    y: p.y,
                })
            })
            .collect::<Result<_, String>>()?;

        Ok(WorldUpdate {
            tick: dto.tick,
            players,
            enemies,
            projectiles,
            powerups,
            blocks: dto
                .blocks
                .into_iter()
                .map(|b| BlockSnapshot {
                    x: b.x,
                    y: b.y,
                    kind: b.kind,
                    health: b.health,
                })
                .collect(),
            score: dto.score,
            kills: dto.kills,
            status: dto.status.into(),
            flag: dto.flag.map(|p| (p.x, p.y)),
        })
    }
}
