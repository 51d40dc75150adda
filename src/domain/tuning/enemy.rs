//! Gameplay tuning for the enemy behavior engine.
//!
//! Distances are world units, speeds are units per AI step, times are milliseconds.

use crate::domain::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn settings(self) -> DifficultySettings {
        match self {
            Difficulty::Easy => DifficultySettings {
                enemy_count: 5,
                base_speed: 1.5,
                damage_modifier: 0.8,
                boss_chance: 0.1,
            },
            Difficulty::Medium => DifficultySettings {
                enemy_count: 8,
                base_speed: 2.0,
                damage_modifier: 1.0,
                boss_chance: 0.15,
            },
            Difficulty::Hard => DifficultySettings {
                enemy_count: 10,
                base_speed: 2.5,
                damage_modifier: 1.2,
                boss_chance: 0.2,
            },
        }
    }
}

impl FromStr for Difficulty {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EASY" => Ok(Difficulty::Easy),
            "MEDIUM" => Ok(Difficulty::Medium),
            "HARD" => Ok(Difficulty::Hard),
            _ => Err(CatalogError::UnknownDifficulty(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultySettings {
    pub enemy_count: usize,
    /// Enemy movement speed before variant modifiers.
    pub base_speed: f32,
    pub damage_modifier: f32,
    /// Chance that one spawned enemy is promoted to a boss.
    pub boss_chance: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct EnemyTuning {
    /// Minimum time between two AI steps; faster calls are no-ops.
    pub update_interval_ms: u64,

    /// Spawn rejection sampling.
    pub min_player_distance: f32,
    pub min_enemy_spacing: f32,
    pub max_spawn_attempts: u32,

    /// Randomized behavior re-evaluation window.
    pub behavior_interval_min_ms: u64,
    pub behavior_interval_max_ms: u64,

    /// Distance bands for behavior selection.
    pub close_range: f32,
    pub medium_range: f32,

    pub patrol_speed_factor: f32,
    pub patrol_arrival_radius: f32,
    pub patrol_box: f32,

    pub chase_speed_factor: f32,
    pub scout_chase_speed_factor: f32,
    pub chase_attack_distance: f32,

    pub turn_rate: f32,
    pub attack_turn_rate: f32,
    pub aim_tolerance: f32,
    pub attack_reload_multiplier: f32,
    pub attack_jitter_chance: f64,
    pub attack_jitter: f32,

    pub retreat_speed_factor: f32,
    pub retreat_give_up_distance: f32,
    pub retreat_give_up_chance: f64,

    pub flank_min_distance: f32,
    pub flank_max_distance: f32,
    pub flank_arrival_radius: f32,
    /// Player displacement that invalidates the current flank point.
    pub flank_invalidate_distance: f32,
    pub flank_speed_factor: f32,
    pub flank_reload_multiplier: f32,

    pub boss_health_multiplier: f32,
    pub boss_engage_distance: f32,
    pub boss_speed_factor: f32,
    pub boss_reload_multiplier: f32,

    pub hit_reaction_chance: f64,
    pub hit_retreat_chance: f64,
    pub hit_turn_step: f32,

    pub min_inaccuracy: f32,
    pub base_inaccuracy: f32,
    pub sniper_inaccuracy: f32,
    pub moving_inaccuracy: f32,

    /// Enemies are clamped to `[margin, dimension - margin]`.
    pub map_margin: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            update_interval_ms: 100,

            min_player_distance: 200.0,
            min_enemy_spacing: 100.0,
            max_spawn_attempts: 50,

            behavior_interval_min_ms: 3000,
            behavior_interval_max_ms: 5000,

            close_range: 200.0,
            medium_range: 400.0,

            patrol_speed_factor: 0.6,
            patrol_arrival_radius: 50.0,
            patrol_box: 300.0,

            chase_speed_factor: 0.9,
            scout_chase_speed_factor: 1.2,
            chase_attack_distance: 150.0,

            turn_rate: 0.1,
            attack_turn_rate: 0.15,
            aim_tolerance: 0.3,
            attack_reload_multiplier: 0.8,
            attack_jitter_chance: 0.3,
            attack_jitter: 1.0,

            retreat_speed_factor: 1.2,
            retreat_give_up_distance: 400.0,
            retreat_give_up_chance: 0.1,

            flank_min_distance: 150.0,
            flank_max_distance: 250.0,
            flank_arrival_radius: 30.0,
            flank_invalidate_distance: 100.0,
            flank_speed_factor: 0.8,
            flank_reload_multiplier: 0.9,

            boss_health_multiplier: 3.0,
            boss_engage_distance: 250.0,
            boss_speed_factor: 0.7,
            boss_reload_multiplier: 0.7,

            hit_reaction_chance: 0.3,
            hit_retreat_chance: 0.6,
            hit_turn_step: 0.5,

            min_inaccuracy: 0.02,
            base_inaccuracy: 0.2,
            sniper_inaccuracy: 0.05,
            moving_inaccuracy: 0.1,

            map_margin: 50.0,
        }
    }
}
