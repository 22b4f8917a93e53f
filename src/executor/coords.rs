use crate::errors::{TapClawError, TapClawResult};

/// Model coordinates live in a fixed 0..=1000 space on both axes.
pub const COORD_SPACE: i64 = 1000;

/// Applied when the action carries no explicit duration; approximates a
/// natural finger swipe.
pub const DEFAULT_SWIPE_DURATION_MS: u64 = 150;

/// Directional swipes travel 15% of the device dimension on the swiped axis.
const DIRECTIONAL_RATIO: f64 = 0.15;

/// Scale a normalized point onto the device pixel grid (floor on both axes).
pub fn map_point(point: [i64; 2], width: u32, height: u32) -> (i64, i64) {
    (
        point[0] * width as i64 / COORD_SPACE,
        point[1] * height as i64 / COORD_SPACE,
    )
}

/// End point of a directional swipe starting at `(x, y)` device pixels,
/// clamped into the screen rectangle.
pub fn directional_end(
    x: i64,
    y: i64,
    direction: &str,
    width: u32,
    height: u32,
) -> TapClawResult<(i64, i64)> {
    let (dx_ratio, dy_ratio) = match direction {
        "up" => (0.0, -DIRECTIONAL_RATIO),
        "down" => (0.0, DIRECTIONAL_RATIO),
        "left" => (-DIRECTIONAL_RATIO, 0.0),
        "right" => (DIRECTIONAL_RATIO, 0.0),
        other => {
            return Err(TapClawError::Protocol(format!(
                "invalid swipe direction: {other}"
            )))
        }
    };
    let x2 = (x as f64 + dx_ratio * width as f64).clamp(0.0, width as f64) as i64;
    let y2 = (y as f64 + dy_ratio * height as f64).clamp(0.0, height as f64) as i64;
    Ok((x2, y2))
}
