// Geometry helpers shared by AI steering, movement and combat.

use std::f32::consts::{PI, TAU};

pub fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    (dx * dx + dy * dy).sqrt()
}

/// Bearing from `(ax, ay)` to `(bx, by)` in radians (0 = +X, clockwise in +Y-down space).
pub fn angle_to(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    (by - ay).atan2(bx - ax)
}

/// Wraps an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Signed shortest rotation from `from` to `to`, in `(-π, π]`.
pub fn angle_delta(from: f32, to: f32) -> f32 {
    let mut diff = (to - from).rem_euclid(TAU);
    if diff > PI {
        diff -= TAU;
    }
    diff
}

/// Steps `current` toward `target` by at most `max_step`, never the long way around.
///
/// Snaps to the target when the remaining delta is smaller than the step. The result is
/// normalized into `[0, 2π)`.
pub fn rotate_towards(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = angle_delta(current, target);
    if diff.abs() < max_step {
        normalize_angle(target)
    } else {
        normalize_angle(current + diff.signum() * max_step)
    }
}

/// Axis-aligned overlap between two boxes given as `(x, y, w, h)` with top-left origins.
pub fn aabb_overlap(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> bool {
    a.0 < b.0 + b.2 && a.0 + a.2 > b.0 && a.1 < b.1 + b.3 && a.1 + a.3 > b.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_angle_is_negative_then_normalize_wraps_into_positive_range() {
        let a = normalize_angle(-PI / 2.0);
        assert!((a - 3.0 * PI / 2.0).abs() < 1e-5);
        assert!((normalize_angle(TAU * 3.0 + 0.25) - 0.25).abs() < 1e-4);
    }

    #[test]
    fn when_target_is_across_zero_then_delta_takes_short_way() {
        let d = angle_delta(0.1, TAU - 0.1);
        assert!((d + 0.2).abs() < 1e-5);
        let d = angle_delta(TAU - 0.1, 0.1);
        assert!((d - 0.2).abs() < 1e-5);
    }

    #[test]
    fn when_remaining_delta_is_smaller_than_step_then_rotation_snaps() {
        assert!((rotate_towards(1.0, 1.05, 0.1) - 1.05).abs() < 1e-6);
    }

    #[test]
    fn when_remaining_delta_is_large_then_rotation_steps_by_increment() {
        let next = rotate_towards(0.1, TAU - 1.0, 0.1);
        // Short way round is negative, so we cross zero instead of turning ~5 rad.
        assert!((next - 0.0).abs() < 1e-5 || (next - TAU).abs() < 1e-5);
        let next = rotate_towards(0.0, 1.0, 0.1);
        assert!((next - 0.1).abs() < 1e-6);
    }

    #[test]
    fn when_boxes_touch_only_at_edge_then_no_overlap() {
        assert!(!aabb_overlap((0.0, 0.0, 10.0, 10.0), (10.0, 0.0, 10.0, 10.0)));
        assert!(aabb_overlap((0.0, 0.0, 10.0, 10.0), (9.0, 9.0, 10.0, 10.0)));
    }

    #[test]
    fn when_measuring_bearing_then_down_is_positive_half_pi() {
        assert!((angle_to(0.0, 0.0, 0.0, 10.0) - PI / 2.0).abs() < 1e-6);
        assert!((distance(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < 1e-6);
    }
}
