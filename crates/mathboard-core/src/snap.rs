//! Grid snapping for dragged groups.

use kurbo::{Point, Vec2};

/// Grid size for snapping, in canvas units.
pub const GRID_SIZE: f64 = 20.0;

/// Round a single coordinate to the nearest grid multiple.
pub fn snap_coordinate(value: f64, grid_size: f64) -> f64 {
    (value / grid_size).round() * grid_size
}

/// Snap a point to the nearest grid intersection.
///
/// X and Y are rounded independently.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    Point::new(
        snap_coordinate(point.x, grid_size),
        snap_coordinate(point.y, grid_size),
    )
}

/// Apply a drag delta to a start position, optionally snapping the result.
///
/// Snapping happens after the delta is applied, never before.
pub fn apply_drag(start: Point, delta: Vec2, snap: Option<f64>) -> Point {
    let moved = start + delta;
    match snap {
        Some(grid_size) => snap_to_grid(moved, grid_size),
        None => moved,
    }
}
