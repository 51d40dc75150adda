// Gameplay tuning, kept separate from runtime/server configuration.

pub mod chapter;
pub mod combat;
pub mod enemy;
pub mod map;
pub mod player;
pub mod powerup;

/// Every gameplay tuning table a session needs, in one place.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameTuning {
    pub enemy: enemy::EnemyTuning,
    pub combat: combat::CombatTuning,
    pub player: player::PlayerTuning,
    pub powerup: powerup::PowerupTuning,
    pub map: map::MapTuning,
    pub chapter: chapter::ChapterTuning,
}
