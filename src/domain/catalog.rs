//! Static tank archetypes.
//!
//! Archetypes are keyed by [`TankKind`]. String keys are parsed once at the boundary, so every
//! lookup after that is total and a missing archetype cannot reach the simulation.

use super::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TankKind {
    Sniper,
    Assault,
    Heavy,
    Scout,
    Demolisher,
}

impl TankKind {
    pub const ALL: [TankKind; 5] = [
        TankKind::Sniper,
        TankKind::Assault,
        TankKind::Heavy,
        TankKind::Scout,
        TankKind::Demolisher,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TankKind::Sniper => "SNIPER",
            TankKind::Assault => "ASSAULT",
            TankKind::Heavy => "HEAVY",
            TankKind::Scout => "SCOUT",
            TankKind::Demolisher => "DEMOLISHER",
        }
    }

    pub fn archetype(self) -> &'static TankArchetype {
        match self {
            TankKind::Sniper => &SNIPER,
            TankKind::Assault => &ASSAULT,
            TankKind::Heavy => &HEAVY,
            TankKind::Scout => &SCOUT,
            TankKind::Demolisher => &DEMOLISHER,
        }
    }
}

impl fmt::Display for TankKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TankKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TankKind::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CatalogError::UnknownTankType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weapon {
    pub damage: f32,
    /// Units travelled per simulation tick.
    pub projectile_speed: f32,
    pub range: f32,
    /// Maximum angular spread in radians.
    pub spread: f32,
    pub projectile_size: f32,
    pub explosion_radius: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbilityEffect {
    ReloadBoost { reload_multiplier: f32 },
    Scope { damage_multiplier: f32, range_multiplier: f32 },
    Afterburner { speed_multiplier: f32, invincible: bool },
    Shockwave { radius: f32, damage: f32, knockback: f32 },
    ClusterBomb { projectile_count: u32, spread_angle: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialAbility {
    pub name: &'static str,
    pub cooldown_ms: u64,
    pub duration_ms: u64,
    pub effect: AbilityEffect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankArchetype {
    pub name: &'static str,
    pub max_health: f32,
    /// Units per simulation tick.
    pub speed: f32,
    /// Radians per simulation tick.
    pub turn_speed: f32,
    pub width: f32,
    pub height: f32,
    pub barrel_length: f32,
    pub weapon: Weapon,
    pub reload_seconds: f32,
    pub ability: Option<SpecialAbility>,
    pub color: &'static str,
}

impl TankArchetype {
    pub fn reload_ms(&self) -> f32 {
        self.reload_seconds * 1000.0
    }
}

static SNIPER: TankArchetype = TankArchetype {
    name: "Sniper",
    max_health: 80.0,
    speed: 2.5,
    turn_speed: 0.1,
    width: 38.0,
    height: 38.0,
    barrel_length: 35.0,
    weapon: Weapon {
        damage: 35.0,
        projectile_speed: 12.0,
        range: 500.0,
        spread: 0.03,
        projectile_size: 4.0,
        explosion_radius: None,
    },
    reload_seconds: 1.8,
    ability: Some(SpecialAbility {
        name: "Scope Shot",
        cooldown_ms: 8000,
        duration_ms: 3000,
        effect: AbilityEffect::Scope {
            damage_multiplier: 1.8,
            range_multiplier: 1.5,
        },
    }),
    color: "#D32F2F",
};

static ASSAULT: TankArchetype = TankArchetype {
    name: "Assault",
    max_health: 100.0,
    speed: 3.0,
    turn_speed: 0.12,
    width: 40.0,
    height: 40.0,
    barrel_length: 30.0,
    weapon: Weapon {
        damage: 20.0,
        projectile_speed: 10.0,
        range: 350.0,
        spread: 0.05,
        projectile_size: 5.0,
        explosion_radius: None,
    },
    reload_seconds: 1.2,
    ability: Some(SpecialAbility {
        name: "Rapid Fire",
        cooldown_ms: 10_000,
        duration_ms: 3000,
        effect: AbilityEffect::ReloadBoost {
            reload_multiplier: 0.4,
        },
    }),
    color: "#388E3C",
};

static HEAVY: TankArchetype = TankArchetype {
    name: "Heavy",
    max_health: 150.0,
    speed: 2.0,
    turn_speed: 0.08,
    width: 45.0,
    height: 45.0,
    barrel_length: 28.0,
    weapon: Weapon {
        damage: 30.0,
        projectile_speed: 8.0,
        range: 300.0,
        spread: 0.08,
        projectile_size: 6.0,
        explosion_radius: None,
    },
    reload_seconds: 1.5,
    ability: Some(SpecialAbility {
        name: "Shockwave",
        cooldown_ms: 12_000,
        duration_ms: 1000,
        effect: AbilityEffect::Shockwave {
            radius: 150.0,
            damage: 15.0,
            knockback: 100.0,
        },
    }),
    color: "#1565C0",
};

static SCOUT: TankArchetype = TankArchetype {
    name: "Scout",
    max_health: 70.0,
    speed: 4.0,
    turn_speed: 0.15,
    width: 36.0,
    height: 36.0,
    barrel_length: 25.0,
    weapon: Weapon {
        damage: 15.0,
        projectile_speed: 11.0,
        range: 250.0,
        spread: 0.06,
        projectile_size: 4.0,
        explosion_radius: None,
    },
    reload_seconds: 0.8,
    ability: Some(SpecialAbility {
        name: "Afterburner",
        cooldown_ms: 8000,
        duration_ms: 2000,
        effect: AbilityEffect::Afterburner {
            speed_multiplier: 1.8,
            invincible: true,
        },
    }),
    color: "#FFA000",
};

static DEMOLISHER: TankArchetype = TankArchetype {
    name: "Demolisher",
    max_health: 110.0,
    speed: 2.3,
    turn_speed: 0.09,
    width: 42.0,
    height: 42.0,
    barrel_length: 32.0,
    weapon: Weapon {
        damage: 25.0,
        projectile_speed: 9.0,
        range: 320.0,
        spread: 0.07,
        projectile_size: 5.0,
        explosion_radius: Some(80.0),
    },
    reload_seconds: 1.7,
    ability: Some(SpecialAbility {
        name: "Cluster Bomb",
        cooldown_ms: 15_000,
        duration_ms: 1000,
        effect: AbilityEffect::ClusterBomb {
            projectile_count: 5,
            spread_angle: 0.6,
        },
    }),
    color: "#7B1FA2",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_key_is_known_then_parse_returns_kind() {
        assert_eq!("HEAVY".parse::<TankKind>(), Ok(TankKind::Heavy));
        assert_eq!("sniper".parse::<TankKind>(), Ok(TankKind::Sniper));
    }

    #[test]
    fn when_key_is_unknown_then_parse_fails_instead_of_defaulting() {
        let err = "BLASTER".parse::<TankKind>().unwrap_err();
        assert_eq!(err, CatalogError::UnknownTankType("BLASTER".to_string()));
    }

    #[test]
    fn when_looking_up_heavy_then_weapon_damage_is_thirty() {
        assert_eq!(TankKind::Heavy.archetype().weapon.damage, 30.0);
        assert_eq!(TankKind::Sniper.archetype().weapon.range, 500.0);
    }

    #[test]
    fn when_iterating_catalog_then_every_key_round_trips() {
        for kind in TankKind::ALL {
            assert_eq!(kind.key().parse::<TankKind>(), Ok(kind));
        }
    }
}
