/// Layout parameters for generated arenas.

#[derive(Debug, Clone, Copy)]
pub struct MapTuning {
    /// Ring the map with indestructible walls one block thick.
    pub border_walls: bool,

    /// Random interior obstacles placed on top of the border walls.
    pub obstacle_count: usize,

    /// Chance that an interior obstacle can be shot down.
    pub destructible_chance: f64,
    pub min_block_health: f32,
    pub max_block_health: f32,

    /// Obstacles are not placed with their center this close to a keep-clear point.
    pub keep_clear_radius: f32,
}

impl Default for MapTuning {
    fn default() -> Self {
        Self {
            border_walls: true,
            obstacle_count: 20,
            destructible_chance: 0.7,
            min_block_health: 50.0,
            max_block_health: 150.0,
            keep_clear_radius: 75.0,
        }
    }
}
