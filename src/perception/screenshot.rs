use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::errors::{TapClawError, TapClawResult};
use crate::executor::DeviceExecutor;

/// A captured frame, already bounded and encoded for the model request.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub png: Vec<u8>,
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

/// Grab the current screen via `screencap`, downscale so the longest edge is
/// at most `max_edge`, and re-encode as PNG.
pub async fn capture(
    exec: &Arc<dyn DeviceExecutor>,
    timeout: Duration,
    max_edge: Option<u32>,
) -> TapClawResult<Screenshot> {
    let raw = exec
        .execute(&["exec-out", "screencap", "-p"], timeout)
        .await?;
    let img = image::load_from_memory(&raw)
        .map_err(|e| TapClawError::DeviceCommand(format!("screencap output not decodable: {e}")))?;

    let img = match max_edge {
        Some(limit) => bound_longest_edge(img, limit),
        None => img,
    };

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| TapClawError::DeviceCommand(format!("screenshot re-encode failed: {e}")))?;
    let base64 = base64::engine::general_purpose::STANDARD.encode(&png);

    tracing::debug!(
        width = img.width(),
        height = img.height(),
        bytes = png.len(),
        "screenshot captured"
    );

    Ok(Screenshot {
        base64,
        width: img.width(),
        height: img.height(),
        png,
    })
}

/// Shrink so neither edge exceeds `limit`, preserving aspect ratio. Height is
/// checked first, then width, mirroring the capture pipeline this replaces.
fn bound_longest_edge(img: DynamicImage, limit: u32) -> DynamicImage {
    let (mut w, mut h) = (img.width(), img.height());
    if h > limit {
        w = (w as u64 * limit as u64 / h as u64) as u32;
        h = limit;
    }
    if w > limit {
        h = (h as u64 * limit as u64 / w as u64) as u32;
        w = limit;
    }
    if (w, h) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    }
}
