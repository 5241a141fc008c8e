//! PagePan Render Engine
//!
//! Turns a planned page into a finished vertical video: one encoded
//! segment per camera position, joined in reading order.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ocr_output_with_bboxes.json ──┐
//!                               ├── Pan Plan (processing-core)
//! page image ───────────────────┤         │
//!                               │         ├── Segment Geometry
//! dialogue__<id>/v<N>__*.wav ───┘         │   (scale → crop → pad)
//!                                         ▼
//!                                  Encode per segment
//!                                         │
//!                                         ▼
//!                                  Concat → video_output/v<N>.mp4
//! ```

pub mod batch;
pub mod chapter;
pub mod encoder;
pub mod ffmpeg;
pub mod segment;
pub mod versioning;

pub use batch::{discover_documents, BatchRunner, RunReport, SkippedDocument};
pub use chapter::{resolve_run_id, ChapterBuilder, ChapterResult};
pub use encoder::Encoder;
pub use ffmpeg::FfmpegEncoder;
pub use segment::{build_segments, GeometryBuilder, SegmentGeometry, SegmentSpec};
