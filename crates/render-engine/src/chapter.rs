//! Building one chapter video from one page document.
//!
//! ```text
//! document ─► image + boxed dialogues ─► pan plan ─┐
//!         └─► newest take per dialogue ────────────┴─► align ─► rolls
//!                ─► segments ─► encode (scratch dir) ─► concat ─► video_output/v<N>.mp4
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::TempDir;

use pagepan_common::config::RenderConfig;
use pagepan_common::error::{PagepanError, PagepanResult};
use pagepan_common::timing::StageTimer;
use pagepan_processing_core::{align, PanPlanner, PlanGeometry, PlannerConfig};
use pagepan_project_model::document::LoadedDocument;
use pagepan_project_model::plan::PanPlan;

use crate::encoder::Encoder;
use crate::segment::{build_segments, GeometryBuilder};
use crate::versioning::{latest_take, next_version, output_file_name};

const PRE_ROLL_FILE: &str = "silence_pre.wav";
const POST_ROLL_FILE: &str = "silence_post.wav";

/// Outcome of one rendered chapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterResult {
    pub run_id: String,
    pub document: PathBuf,
    pub output_file: PathBuf,
    pub output_folder: PathBuf,
    pub version: u32,
    /// Dialogue clips rendered, not counting pre/post roll.
    pub num_audio: usize,
    /// Total segments including rolls.
    pub num_segments: usize,
    pub image: PathBuf,
    pub elapsed_secs: f64,
}

/// Run id for a document: its own when recorded, otherwise a fresh
/// `video_<YYYYmmdd_HHMMSS>_<8 hex>` id.
pub fn resolve_run_id(document_run_id: Option<&str>) -> String {
    match document_run_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_run_id(),
    }
}

fn generate_run_id() -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("video_{timestamp}_{}", &suffix[..8])
}

/// Where segment files are written while a chapter renders.
enum ScratchDir {
    /// Removed when dropped, on success and on failure.
    Temp(TempDir),
    /// Kept for inspection (`keep_segments`).
    Kept(PathBuf),
}

impl ScratchDir {
    fn create(output_folder: &Path, version: u32, keep: bool) -> PagepanResult<Self> {
        if keep {
            let dir = output_folder.join(format!("segments_v{version}"));
            std::fs::create_dir_all(&dir)?;
            Ok(Self::Kept(dir))
        } else {
            let dir = tempfile::Builder::new()
                .prefix(".pagepan-segments-")
                .tempdir_in(output_folder)?;
            Ok(Self::Temp(dir))
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Temp(dir) => dir.path(),
            Self::Kept(dir) => dir,
        }
    }
}

/// Builds chapter videos with a fixed configuration and encoder.
pub struct ChapterBuilder {
    config: Arc<RenderConfig>,
    encoder: Arc<dyn Encoder>,
    planner: PanPlanner,
    geometry: GeometryBuilder,
}

impl ChapterBuilder {
    pub fn new(config: Arc<RenderConfig>, encoder: Arc<dyn Encoder>) -> PagepanResult<Self> {
        let planner = PanPlanner::new(PlannerConfig::from(&config.viewport));
        let geometry = GeometryBuilder::from_config(&config)?;
        Ok(Self {
            config,
            encoder,
            planner,
            geometry,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Pan plan for a loaded document, without pre/post roll.
    ///
    /// The page is planned at the content width, the same width segments
    /// scale it to, so offsets can be used as crop positions directly.
    pub fn plan_document(&self, loaded: &LoadedDocument) -> PagepanResult<PanPlan> {
        let layout = self.geometry.layout();
        self.planner.plan(
            &loaded.document.parsed_dialogue,
            PlanGeometry {
                raw_width: loaded.document.image_width,
                raw_height: loaded.document.image_height,
                plan_width: layout.content_width(),
                viewport_height: layout.viewport_height,
            },
        )
    }

    /// Newest take for every boxed dialogue, in reading order.
    pub fn collect_audio(&self, loaded: &LoadedDocument) -> PagepanResult<Vec<PathBuf>> {
        loaded
            .document
            .boxed_dialogues()
            .map(|dialogue| {
                let dir = loaded.dialogue_audio_dir(&dialogue.id);
                let take = latest_take(&dir)?;
                tracing::debug!(id = %dialogue.id, take = %take.display(), "Selected dialogue take");
                Ok(take)
            })
            .collect()
    }

    /// Render the document at `document_path` into
    /// `<document dir>/video_output/v<version>.mp4`.
    ///
    /// When `version` is `None` the next free version is used. On failure
    /// the partial output file is removed.
    pub fn build_chapter(
        &self,
        document_path: &Path,
        version: Option<u32>,
    ) -> PagepanResult<ChapterResult> {
        let timer = StageTimer::start(format!("chapter {}", document_path.display()));
        let loaded = LoadedDocument::load(document_path)?;

        let image = loaded.resolve_image(self.config.input_root.as_deref());
        if !image.is_file() {
            return Err(PagepanError::FileNotFound { path: image });
        }

        let plan = self.plan_document(&loaded)?;
        if plan.is_empty() {
            return Err(PagepanError::NoDialogue {
                document: loaded.path.clone(),
            });
        }
        let audio = self.collect_audio(&loaded)?;

        let output_folder = loaded.video_output_dir();
        std::fs::create_dir_all(&output_folder)?;
        let version = match version {
            Some(v) => v,
            None => next_version(&output_folder)?,
        };
        let output_file = output_folder.join(output_file_name(version));

        tracing::info!(
            document = %loaded.path.display(),
            image = %image.display(),
            dialogues = plan.len(),
            version,
            "Building chapter"
        );

        let scratch = ScratchDir::create(&output_folder, version, self.config.encoder.keep_segments)?;
        let rendered = self.render(&loaded, &image, plan, audio, scratch.path(), &output_file);
        let (num_audio, num_segments) = match rendered {
            Ok(counts) => counts,
            Err(err) => {
                remove_partial_output(&output_file);
                return Err(err);
            }
        };
        drop(scratch);

        let elapsed_secs = timer.finish();
        Ok(ChapterResult {
            run_id: resolve_run_id(loaded.document.run_id.as_deref()),
            document: loaded.path.clone(),
            output_file,
            output_folder,
            version,
            num_audio,
            num_segments,
            image,
            elapsed_secs,
        })
    }

    /// Returns (dialogue clips, total segments).
    fn render(
        &self,
        loaded: &LoadedDocument,
        image: &Path,
        plan: PanPlan,
        audio: Vec<PathBuf>,
        scratch: &Path,
        output_file: &Path,
    ) -> PagepanResult<(usize, usize)> {
        let (scaled_height, max_offset) = (plan.scaled_height, plan.max_offset);
        let pairs = align(plan.into_entries(), audio, self.config.alignment.policy)?;
        let num_audio = pairs.len();
        let (entries, mut clips): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        let mut plan = PanPlan::new(scaled_height, max_offset, entries);

        let padding = &self.config.padding;
        if padding.pre_roll_secs > 0.0 {
            let silence = scratch.join(PRE_ROLL_FILE);
            self.encoder.generate_silence(padding.pre_roll_secs, &silence)?;
            plan = plan.with_pre_roll();
            clips.insert(0, silence);
        }
        if padding.post_roll_secs > 0.0 {
            let silence = scratch.join(POST_ROLL_FILE);
            self.encoder.generate_silence(padding.post_roll_secs, &silence)?;
            plan = plan.with_post_roll();
            clips.push(silence);
        }

        let pairs = plan.into_entries().into_iter().zip(clips).collect();
        let segments = build_segments(
            &self.geometry,
            image,
            loaded.document.image_width,
            loaded.document.image_height,
            pairs,
        )?;

        let mut segment_files = Vec::with_capacity(segments.len());
        for segment in &segments {
            let path = scratch.join(segment.file_name());
            tracing::debug!(
                index = segment.index,
                slot = ?segment.slot,
                offset = segment.geometry.crop.y,
                "Encoding segment"
            );
            self.encoder.encode_segment(segment, &path)?;
            segment_files.push(path);
        }

        self.encoder.concat(&segment_files, output_file, scratch)?;
        tracing::info!(
            output = %output_file.display(),
            segments = segment_files.len(),
            encoder = self.encoder.name(),
            "Chapter written"
        );
        Ok((num_audio, segment_files.len()))
    }
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Failed to remove partial output")
        }
    }
}
