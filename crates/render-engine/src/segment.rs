//! Segment geometry: how one camera position becomes one output frame.
//!
//! Every segment shows the same page, scaled to the content width, cropped to
//! a viewport-tall window at the planned offset, then padded out to the full
//! viewport when side margins are configured.
//!
//! ```text
//! page (raw_w x raw_h)
//!   └── scale   content_w x scaled_h
//!         └── crop    content_w x viewport_h  @ (0, offset)
//!               └── pad     viewport_w x viewport_h @ (side_margin, 0)
//!                     └── format / setsar
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;

use pagepan_common::config::RenderConfig;
use pagepan_common::error::{PagepanError, PagepanResult};
use pagepan_project_model::layout::{scaled_height, FrameLayout};
use pagepan_project_model::plan::{PanPlanEntry, PlanSlot};

/// Uniform scale of the page to a fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleOp {
    pub width: u32,
    pub height: u32,
}

/// Crop window in scaled-page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropOp {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Padding of the cropped content onto the full frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PadOp {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
    pub color: String,
}

/// Declarative description of the video side of one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentGeometry {
    pub scale: ScaleOp,
    pub crop: CropOp,
    pub pad: Option<PadOp>,
    pub pix_fmt: String,
    pub sar: u32,
}

impl SegmentGeometry {
    /// Render as an ffmpeg `-vf` filter chain.
    pub fn to_filter_chain(&self) -> String {
        let mut chain = format!(
            "scale={}:{},crop={}:{}:{}:{}",
            self.scale.width,
            self.scale.height,
            self.crop.width,
            self.crop.height,
            self.crop.x,
            self.crop.y
        );
        if let Some(pad) = &self.pad {
            chain.push_str(&format!(
                ",pad={}:{}:{}:{}:color={}",
                pad.width, pad.height, pad.x, pad.y, pad.color
            ));
        }
        chain.push_str(&format!(",format={},setsar={}", self.pix_fmt, self.sar));
        chain
    }
}

/// Builds [`SegmentGeometry`] for a fixed layout and output format.
#[derive(Debug, Clone)]
pub struct GeometryBuilder {
    layout: FrameLayout,
    background: String,
    pix_fmt: String,
    sar: u32,
}

impl GeometryBuilder {
    pub fn new(
        layout: FrameLayout,
        background: impl Into<String>,
        pix_fmt: impl Into<String>,
        sar: u32,
    ) -> Self {
        Self {
            layout,
            background: background.into(),
            pix_fmt: pix_fmt.into(),
            sar,
        }
    }

    pub fn from_config(config: &RenderConfig) -> PagepanResult<Self> {
        Ok(Self::new(
            FrameLayout::from_config(&config.viewport)?,
            config.viewport.background.clone(),
            config.encoder.pix_fmt.clone(),
            config.encoder.sar,
        ))
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Geometry for one segment of a `raw_width x raw_height` page at `offset`.
    ///
    /// Pages shorter than the viewport are cropped to their full height and
    /// padded at the bottom. An offset that pushes the window past the end
    /// of the page is an [`PagepanError::OutOfBounds`].
    pub fn build(&self, raw_width: u32, raw_height: u32, offset: u32) -> PagepanResult<SegmentGeometry> {
        let content_w = self.layout.content_width();
        let viewport_h = self.layout.viewport_height;
        let scaled_h = scaled_height(raw_width, raw_height, content_w)?;
        if scaled_h == 0 {
            return Err(PagepanError::invalid_geometry(format!(
                "page {raw_width}x{raw_height} scales to zero height at width {content_w}"
            )));
        }

        let crop_h = viewport_h.min(scaled_h);
        if u64::from(offset) + u64::from(crop_h) > u64::from(scaled_h) {
            return Err(PagepanError::OutOfBounds {
                offset,
                height: crop_h,
                scaled_height: scaled_h,
            });
        }

        let pad = (self.layout.has_side_margins() || crop_h < viewport_h).then(|| PadOp {
            width: self.layout.viewport_width,
            height: viewport_h,
            x: self.layout.side_margin,
            y: 0,
            color: self.background.clone(),
        });

        Ok(SegmentGeometry {
            scale: ScaleOp {
                width: content_w,
                height: scaled_h,
            },
            crop: CropOp {
                width: content_w,
                height: crop_h,
                x: 0,
                y: offset,
            },
            pad,
            pix_fmt: self.pix_fmt.clone(),
            sar: self.sar,
        })
    }
}

/// Everything the encoder needs to render one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSpec {
    /// Position in the final concatenation order.
    pub index: usize,
    pub slot: PlanSlot,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub geometry: SegmentGeometry,
}

impl SegmentSpec {
    /// Scratch file name for this segment.
    pub fn file_name(&self) -> String {
        format!("seg_{:03}.mp4", self.index)
    }
}

/// Build one segment per (plan entry, audio clip) pair, in order.
pub fn build_segments(
    builder: &GeometryBuilder,
    image: &Path,
    raw_width: u32,
    raw_height: u32,
    pairs: Vec<(PanPlanEntry, PathBuf)>,
) -> PagepanResult<Vec<SegmentSpec>> {
    pairs
        .into_iter()
        .enumerate()
        .map(|(index, (entry, audio))| {
            let geometry = builder.build(raw_width, raw_height, entry.offset)?;
            Ok(SegmentSpec {
                index,
                slot: entry.slot,
                image: image.to_path_buf(),
                audio,
                geometry,
            })
        })
        .collect()
}
