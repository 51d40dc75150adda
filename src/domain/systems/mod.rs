// Simulation systems: each owns one slice of the per-tick rules.

pub mod abilities;
pub mod combat;
pub mod enemy_ai;
pub mod map;
pub mod movement;
pub mod powerups;
