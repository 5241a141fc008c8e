//! Output frame layout and page scaling arithmetic.
//!
//! All values are integer pixels. Scaling always rounds down so that the
//! planner and the segment builder agree on the exact scaled page height.

use serde::{Deserialize, Serialize};

use pagepan_common::config::ViewportConfig;
use pagepan_common::error::{PagepanError, PagepanResult};

/// Fixed output frame plus the horizontal margins around the page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub side_margin: u32,
}

impl FrameLayout {
    /// Create a layout, rejecting frames that leave no room for content.
    pub fn new(viewport_width: u32, viewport_height: u32, side_margin: u32) -> PagepanResult<Self> {
        if viewport_width == 0 || viewport_height == 0 {
            return Err(PagepanError::invalid_geometry(format!(
                "viewport must be non-empty (got {viewport_width}x{viewport_height})"
            )));
        }
        if u64::from(side_margin) * 2 >= u64::from(viewport_width) {
            return Err(PagepanError::invalid_geometry(format!(
                "side margin {side_margin} leaves no content width in a {viewport_width}px viewport"
            )));
        }
        Ok(Self {
            viewport_width,
            viewport_height,
            side_margin,
        })
    }

    pub fn from_config(config: &ViewportConfig) -> PagepanResult<Self> {
        Self::new(config.width, config.height, config.side_margin)
    }

    /// Width the page is scaled to: the viewport minus both side margins.
    pub fn content_width(&self) -> u32 {
        self.viewport_width - 2 * self.side_margin
    }

    pub fn has_side_margins(&self) -> bool {
        self.side_margin > 0
    }
}

/// Scale a raw-pixel length by `target_width / raw_width`, rounding down.
pub fn scale_length(value: u64, raw_width: u32, target_width: u32) -> PagepanResult<u32> {
    if raw_width == 0 {
        return Err(PagepanError::invalid_geometry("raw image width is 0"));
    }
    let scaled = scale_wide(value, raw_width, target_width);
    u32::try_from(scaled).map_err(|_| {
        PagepanError::invalid_geometry(format!("scaled length {scaled} does not fit in u32"))
    })
}

/// Scale a raw-pixel position like [`scale_length`], saturating at `u32::MAX`.
///
/// Positions are clamped to the page afterwards, so one far below the page
/// only needs to stay ordered, not exact.
pub fn scale_position(value: u64, raw_width: u32, target_width: u32) -> PagepanResult<u32> {
    if raw_width == 0 {
        return Err(PagepanError::invalid_geometry("raw image width is 0"));
    }
    Ok(u32::try_from(scale_wide(value, raw_width, target_width)).unwrap_or(u32::MAX))
}

fn scale_wide(value: u64, raw_width: u32, target_width: u32) -> u128 {
    u128::from(value) * u128::from(target_width) / u128::from(raw_width)
}

/// Page height after uniform scaling to `target_width`.
pub fn scaled_height(raw_width: u32, raw_height: u32, target_width: u32) -> PagepanResult<u32> {
    if raw_height == 0 {
        return Err(PagepanError::invalid_geometry("raw image height is 0"));
    }
    scale_length(u64::from(raw_height), raw_width, target_width)
}

/// Largest offset that keeps a `viewport_height` window inside the page.
pub fn max_offset(scaled_height: u32, viewport_height: u32) -> u32 {
    scaled_height.saturating_sub(viewport_height)
}
