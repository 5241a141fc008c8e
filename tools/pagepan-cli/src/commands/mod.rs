pub mod chapter;
pub mod check;
pub mod init_config;
pub mod plan;
pub mod run;

use std::sync::Arc;

use anyhow::bail;

use pagepan_common::config::RenderConfig;
use pagepan_render_engine::{ChapterBuilder, Encoder, FfmpegEncoder};

/// Chapter builder backed by ffmpeg, failing early when it is missing.
fn ffmpeg_chapter_builder(config: RenderConfig) -> anyhow::Result<ChapterBuilder> {
    let encoder = FfmpegEncoder::new(config.encoder.clone());
    if !encoder.is_available() {
        bail!(
            "Encoder not available: expected `{}` and `{}` (run `pagepan check`)",
            config.encoder.ffmpeg_bin,
            config.encoder.ffprobe_bin
        );
    }
    Ok(ChapterBuilder::new(Arc::new(config), Arc::new(encoder))?)
}
