//! Render configuration.
//!
//! A [`RenderConfig`] is resolved exactly once per invocation and then shared
//! read-only by the planner, the segment builder, and the orchestrator.
//! Precedence, highest first:
//!
//! 1. explicit overrides ([`ConfigOverrides`], usually CLI flags)
//! 2. values from the TOML config file
//! 3. built-in defaults
//!
//! Relative `input_root` / `output_root` paths in a config file are resolved
//! against the directory containing that file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PagepanError, PagepanResult};

/// Default name of the per-page metadata document produced by the OCR stage.
pub const DEFAULT_DOCUMENT_FILE_NAME: &str = "ocr_output_with_bboxes.json";

/// Complete, validated configuration for a render run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Root that `image_rel_path_from_root` is resolved against.
    /// When unset, images are resolved relative to each document's folder.
    pub input_root: Option<PathBuf>,

    /// Root containing one folder per run id.
    pub output_root: Option<PathBuf>,

    /// File name of page documents discovered inside a run folder.
    pub document_file_name: String,

    /// Maximum number of documents rendered at the same time.
    pub jobs: usize,

    pub viewport: ViewportConfig,
    pub padding: PaddingConfig,
    pub encoder: EncoderConfig,
    pub alignment: AlignmentConfig,
    pub logging: LoggingConfig,
}

/// Output frame and camera framing parameters, in output pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,

    /// Horizontal padding added on each side of the page content.
    pub side_margin: u32,

    /// Gap kept above a dialogue when the camera advances to it.
    pub safe_margin: u32,

    /// Top gap for the first dialogue, as a fraction of viewport height.
    pub first_dialog_margin_pct: f64,

    /// Fill colour for side margins (any colour name or hex value ffmpeg accepts).
    pub background: String,
}

/// Silence inserted before the first and after the last dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddingConfig {
    pub pre_roll_secs: f64,
    pub post_roll_secs: f64,
}

/// Parameters handed to the external encoder. Opaque to the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub fps: u32,
    pub vcodec: String,
    pub preset: String,
    /// Empty string disables `-tune`.
    pub tune: String,
    /// Constant quality value (`-cq` for NVENC codecs, `-crf` otherwise).
    pub cq: u32,
    pub pix_fmt: String,
    pub sar: u32,
    pub acodec: String,
    pub audio_bitrate: String,
    pub concat: ConcatMode,
    /// Keep per-segment files next to the output instead of deleting them.
    pub keep_segments: bool,
    pub overwrite: bool,
}

/// How segments are joined into the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcatMode {
    /// Concat filter with a single re-encode.
    #[default]
    Reencode,
    /// Concat demuxer with stream copy. Segments must share codec parameters.
    StreamCopy,
}

/// What to do when the pan plan and audio list disagree in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Warn and truncate both lists to the shorter length.
    #[default]
    Truncate,
    /// Fail the document.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AlignmentConfig {
    pub policy: AlignmentPolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pagepan=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            input_root: None,
            output_root: None,
            document_file_name: DEFAULT_DOCUMENT_FILE_NAME.to_string(),
            jobs: 1,
            viewport: ViewportConfig::default(),
            padding: PaddingConfig::default(),
            encoder: EncoderConfig::default(),
            alignment: AlignmentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            side_margin: 0,
            safe_margin: 200,
            first_dialog_margin_pct: 0.02,
            background: "black".to_string(),
        }
    }
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            pre_roll_secs: 0.0,
            post_roll_secs: 0.0,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            fps: 24,
            vcodec: "h264_nvenc".to_string(),
            preset: "p5".to_string(),
            tune: "hq".to_string(),
            cq: 23,
            pix_fmt: "yuv420p".to_string(),
            sar: 1,
            acodec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            concat: ConcatMode::Reencode,
            keep_segments: false,
            overwrite: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Values that take precedence over the config file.
///
/// Every field is optional; `None` leaves the file/default value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_root: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub side_margin: Option<u32>,
    pub safe_margin: Option<u32>,
    pub first_dialog_margin_pct: Option<f64>,
    pub pre_roll_secs: Option<f64>,
    pub post_roll_secs: Option<f64>,
    pub jobs: Option<usize>,
    pub keep_segments: Option<bool>,
    pub alignment_policy: Option<AlignmentPolicy>,
    pub log_level: Option<String>,
}

impl RenderConfig {
    /// Resolve the effective configuration for one run.
    ///
    /// Loads `path` when given (defaults otherwise), applies `overrides`,
    /// then validates. The result is never re-resolved afterwards.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> PagepanResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;

        tracing::debug!(
            config_file = ?path,
            width = config.viewport.width,
            height = config.viewport.height,
            side_margin = config.viewport.side_margin,
            safe_margin = config.viewport.safe_margin,
            jobs = config.jobs,
            "Render configuration resolved"
        );
        Ok(config)
    }

    /// Load configuration from a TOML file without validating it.
    pub fn from_file(path: impl AsRef<Path>) -> PagepanResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PagepanError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: RenderConfig = toml::from_str(&content).map_err(|e| {
            PagepanError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.input_root = config.input_root.map(|p| absolutize(base, p));
        config.output_root = config.output_root.map(|p| absolutize(base, p));
        Ok(config)
    }

    /// Serialize to TOML (used by `init-config`).
    pub fn to_toml_string(&self) -> PagepanResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PagepanError::config(format!("Failed to serialize config: {e}")))
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> PagepanResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    fn apply(&mut self, o: &ConfigOverrides) {
        if let Some(v) = &o.input_root {
            self.input_root = Some(v.clone());
        }
        if let Some(v) = &o.output_root {
            self.output_root = Some(v.clone());
        }
        if let Some(v) = o.width {
            self.viewport.width = v;
        }
        if let Some(v) = o.height {
            self.viewport.height = v;
        }
        if let Some(v) = o.side_margin {
            self.viewport.side_margin = v;
        }
        if let Some(v) = o.safe_margin {
            self.viewport.safe_margin = v;
        }
        if let Some(v) = o.first_dialog_margin_pct {
            self.viewport.first_dialog_margin_pct = v;
        }
        if let Some(v) = o.pre_roll_secs {
            self.padding.pre_roll_secs = v;
        }
        if let Some(v) = o.post_roll_secs {
            self.padding.post_roll_secs = v;
        }
        if let Some(v) = o.jobs {
            self.jobs = v;
        }
        if let Some(v) = o.keep_segments {
            self.encoder.keep_segments = v;
        }
        if let Some(v) = o.alignment_policy {
            self.alignment.policy = v;
        }
        if let Some(v) = &o.log_level {
            self.logging.level = v.clone();
        }
    }

    /// Validate key values, reporting every problem at once.
    pub fn validate(&self) -> PagepanResult<()> {
        let mut errors = Vec::new();
        let vp = &self.viewport;
        let enc = &self.encoder;

        if vp.width == 0 {
            errors.push("viewport.width must be > 0".to_string());
        }
        if vp.height == 0 {
            errors.push("viewport.height must be > 0".to_string());
        }
        if u64::from(vp.side_margin) * 2 >= u64::from(vp.width) {
            errors.push(format!(
                "viewport.side_margin {} leaves no content width in a {}px viewport",
                vp.side_margin, vp.width
            ));
        }
        if !(0.0..=1.0).contains(&vp.first_dialog_margin_pct) {
            errors.push("viewport.first_dialog_margin_pct must be within [0, 1]".to_string());
        }
        if vp.background.trim().is_empty() {
            errors.push("viewport.background must be a non-empty colour".to_string());
        }
        for (name, secs) in [
            ("padding.pre_roll_secs", self.padding.pre_roll_secs),
            ("padding.post_roll_secs", self.padding.post_roll_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                errors.push(format!("{name} must be a finite value >= 0"));
            }
        }
        if enc.fps == 0 {
            errors.push("encoder.fps must be > 0".to_string());
        }
        if enc.sar == 0 {
            errors.push("encoder.sar must be > 0".to_string());
        }
        for (name, value) in [
            ("encoder.ffmpeg_bin", &enc.ffmpeg_bin),
            ("encoder.ffprobe_bin", &enc.ffprobe_bin),
            ("encoder.vcodec", &enc.vcodec),
            ("encoder.pix_fmt", &enc.pix_fmt),
            ("encoder.acodec", &enc.acodec),
            ("encoder.audio_bitrate", &enc.audio_bitrate),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{name} must be a non-empty string"));
            }
        }
        if self.document_file_name.trim().is_empty() {
            errors.push("document_file_name must be a non-empty string".to_string());
        }
        if self.jobs == 0 {
            errors.push("jobs must be >= 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PagepanError::config(format!(
                "Invalid render config:\n- {}",
                errors.join("\n- ")
            )))
        }
    }
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
