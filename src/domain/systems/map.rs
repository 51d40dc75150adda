// Arena layout: border walls, random obstacles and box collision against them.

use crate::domain::math::{aabb_overlap, distance};
use crate::domain::state::{BlockKind, MapBlock, MapBounds};
use crate::domain::tuning::map::MapTuning;
use rand::Rng;
use rand::rngs::SmallRng;
use tracing::debug;

/// Edge length of every map block.
pub const BLOCK_SIZE: f32 = 50.0;

/// Builds border walls around `bounds` (when enabled) and scatters interior obstacles on the
/// block grid.
///
/// Obstacles never land on the border ring, never share a cell, and keep their centers at
/// least `keep_clear_radius` away from every point in `keep_clear` (spawns, objectives).
pub fn generate_map(
    bounds: MapBounds,
    tuning: &MapTuning,
    keep_clear: &[(f32, f32)],
    rng: &mut SmallRng,
) -> Vec<MapBlock> {
    let cols = (bounds.width / BLOCK_SIZE).floor() as i32;
    let rows = (bounds.height / BLOCK_SIZE).floor() as i32;
    let mut blocks = Vec::new();

    if tuning.border_walls {
        for col in 0..cols {
            blocks.push(wall(col, 0));
            blocks.push(wall(col, rows - 1));
        }
        for row in 1..rows - 1 {
            blocks.push(wall(0, row));
            blocks.push(wall(cols - 1, row));
        }
    }

    if cols <= 2 || rows <= 2 {
        return blocks;
    }

    let mut placed = 0;
    // Bounded so a crowded layout cannot spin forever.
    let mut attempts = tuning.obstacle_count * 10;
    while placed < tuning.obstacle_count && attempts > 0 {
        attempts -= 1;
        let col = rng.random_range(1..cols - 1);
        let row = rng.random_range(1..rows - 1);
        let x = col as f32 * BLOCK_SIZE;
        let y = row as f32 * BLOCK_SIZE;

        if blocks.iter().any(|b| b.x == x && b.y == y) {
            continue;
        }
        let (cx, cy) = (x + BLOCK_SIZE / 2.0, y + BLOCK_SIZE / 2.0);
        if keep_clear
            .iter()
            .any(|&(kx, ky)| distance(cx, cy, kx, ky) < tuning.keep_clear_radius)
        {
            continue;
        }

        let block = if rng.random_bool(tuning.destructible_chance) {
            MapBlock {
                x,
                y,
                kind: BlockKind::Crate,
                health: rng.random_range(tuning.min_block_health..=tuning.max_block_health),
            }
        } else {
            MapBlock {
                x,
                y,
                kind: BlockKind::Rock,
                health: f32::INFINITY,
            }
        };
        blocks.push(block);
        placed += 1;
    }

    debug!(blocks = blocks.len(), obstacles = placed, "map generated");
    blocks
}

fn wall(col: i32, row: i32) -> MapBlock {
    MapBlock {
        x: col as f32 * BLOCK_SIZE,
        y: row as f32 * BLOCK_SIZE,
        kind: BlockKind::Wall,
        health: f32::INFINITY,
    }
}

pub fn block_rect(block: &MapBlock) -> (f32, f32, f32, f32) {
    (block.x, block.y, BLOCK_SIZE, BLOCK_SIZE)
}

/// True when a tank box centered on `(x, y)` overlaps any block.
pub fn tank_collides(x: f32, y: f32, half_extent: f32, blocks: &[MapBlock]) -> bool {
    let tank = (x - half_extent, y - half_extent, half_extent * 2.0, half_extent * 2.0);
    blocks.iter().any(|b| aabb_overlap(tank, block_rect(b)))
}

/// Index of the first block a projectile box centered on `(x, y)` overlaps.
pub fn projectile_block_hit(x: f32, y: f32, size: f32, blocks: &[MapBlock]) -> Option<usize> {
    let half = size / 2.0;
    let shot = (x - half, y - half, size, size);
    blocks.iter().position(|b| aabb_overlap(shot, block_rect(b)))
}

/// Rejection-samples a free position for a tank of `half_extent`.
pub fn find_spawn_point(
    bounds: MapBounds,
    half_extent: f32,
    blocks: &[MapBlock],
    attempts: u32,
    rng: &mut SmallRng,
) -> Option<(f32, f32)> {
    if bounds.width <= half_extent * 2.0 || bounds.height <= half_extent * 2.0 {
        return None;
    }
    (0..attempts).find_map(|_| {
        let x = rng.random_range(half_extent..bounds.width - half_extent);
        let y = rng.random_range(half_extent..bounds.height - half_extent);
        (!tank_collides(x, y, half_extent, blocks)).then_some((x, y))
    })
}
