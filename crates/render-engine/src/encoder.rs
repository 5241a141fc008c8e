//! Encoder abstraction.
//!
//! The orchestrator only ever talks to an [`Encoder`]; the production
//! implementation shells out to ffmpeg (see [`crate::ffmpeg`]).

use std::path::{Path, PathBuf};

use pagepan_common::error::PagepanResult;

use crate::segment::SegmentSpec;

/// Trait for encode backends.
///
/// Implementations must be shareable across the batch runner's worker
/// threads, so every method takes `&self`.
pub trait Encoder: Send + Sync {
    /// Render one segment: the still image looped for the length of the
    /// segment's audio clip, with its geometry applied.
    fn encode_segment(&self, segment: &SegmentSpec, output: &Path) -> PagepanResult<()>;

    /// Join rendered segments, in order, into `output`.
    ///
    /// `scratch_dir` may be used for intermediate files and is removed by
    /// the caller.
    fn concat(&self, segments: &[PathBuf], output: &Path, scratch_dir: &Path) -> PagepanResult<()>;

    /// Write a silent audio clip of `duration_secs` to `output`.
    fn generate_silence(&self, duration_secs: f64, output: &Path) -> PagepanResult<()>;

    /// Check if this encoder can run on the system.
    fn is_available(&self) -> bool;

    /// Encoder name.
    fn name(&self) -> &str;
}
