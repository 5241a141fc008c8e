//! Page documents produced by the OCR stage.
//!
//! Each page folder carries an `ocr_output_with_bboxes.json` file: a JSON
//! array whose first element describes the page image and its dialogue
//! balloons in reading order.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pagepan_common::error::PagepanError;

/// Dialogue identifier as written by the OCR stage (number or string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DialogueId {
    Number(i64),
    Text(String),
}

impl fmt::Display for DialogueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogueId::Number(n) => write!(f, "{n}"),
            DialogueId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for DialogueId {
    fn from(n: i64) -> Self {
        DialogueId::Number(n)
    }
}

impl From<&str> for DialogueId {
    fn from(s: &str) -> Self {
        DialogueId::Text(s.to_string())
    }
}

/// Dialogue region in raw image pixels. Only `y1` drives the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    #[serde(default)]
    pub x1: i64,
    pub y1: i64,
    #[serde(default)]
    pub x2: i64,
    #[serde(default)]
    pub y2: i64,
}

impl BoundingBox {
    /// Box with only the top edge known.
    pub fn top(y1: i64) -> Self {
        Self {
            y1,
            ..Self::default()
        }
    }

    /// Top edge clamped to the image (negative OCR coordinates become 0).
    pub fn top_px(&self) -> u64 {
        self.y1.max(0) as u64
    }
}

/// One dialogue balloon in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueUnit {
    pub id: DialogueId,

    /// Absent when OCR found text but could not box it.
    #[serde(rename = "paddle_bbox", default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl DialogueUnit {
    pub fn new(id: impl Into<DialogueId>, bbox: Option<BoundingBox>) -> Self {
        Self {
            id: id.into(),
            bbox,
        }
    }

    /// Convenience for the common case of a boxed dialogue.
    pub fn boxed(id: impl Into<DialogueId>, y1: i64) -> Self {
        Self::new(id, Some(BoundingBox::top(y1)))
    }
}

/// Metadata for one page image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDocument {
    /// Upstream batch identifier, when the OCR stage recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    pub image_width: u32,
    pub image_height: u32,
    pub image_file_name: String,
    pub image_rel_path_from_root: String,

    #[serde(default)]
    pub parsed_dialogue: Vec<DialogueUnit>,
}

/// Page document as written upstream, before the image size is checked.
#[derive(Debug, Deserialize)]
struct RawPageDocument {
    #[serde(default)]
    run_id: Option<String>,
    image_width: i64,
    image_height: i64,
    image_file_name: String,
    image_rel_path_from_root: String,
    #[serde(default)]
    parsed_dialogue: Vec<DialogueUnit>,
}

impl TryFrom<RawPageDocument> for PageDocument {
    type Error = PageParseError;

    fn try_from(raw: RawPageDocument) -> Result<Self, Self::Error> {
        let invalid = || PageParseError::InvalidDimensions {
            width: raw.image_width,
            height: raw.image_height,
        };
        let image_width = u32::try_from(raw.image_width).map_err(|_| invalid())?;
        let image_height = u32::try_from(raw.image_height).map_err(|_| invalid())?;
        if image_width == 0 || image_height == 0 {
            return Err(invalid());
        }

        Ok(Self {
            run_id: raw.run_id,
            image_width,
            image_height,
            image_file_name: raw.image_file_name,
            image_rel_path_from_root: raw.image_rel_path_from_root,
            parsed_dialogue: raw.parsed_dialogue,
        })
    }
}

impl PageDocument {
    /// Parse the document JSON (an array; the first element is used).
    pub fn from_json(json: &str) -> Result<Self, PageParseError> {
        let docs: Vec<RawPageDocument> = serde_json::from_str(json)?;
        let raw = docs.into_iter().next().ok_or(PageParseError::Empty)?;
        Self::try_from(raw)
    }

    /// Dialogues that carry a bounding box, in reading order.
    pub fn boxed_dialogues(&self) -> impl Iterator<Item = &DialogueUnit> {
        self.parsed_dialogue.iter().filter(|d| d.bbox.is_some())
    }

    /// Image file stem (`page_001.jpg` -> `page_001`).
    pub fn image_stem(&self) -> &str {
        Path::new(&self.image_file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.image_file_name)
    }

    /// Resolve the page image: `root / image_rel_path_from_root / image_file_name`.
    pub fn image_path(&self, root: &Path) -> PathBuf {
        root.join(&self.image_rel_path_from_root)
            .join(&self.image_file_name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.image_file_name.trim().is_empty() {
            return Err("image_file_name is empty".to_string());
        }
        Ok(())
    }
}

/// A page document together with where it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Path of the JSON file.
    pub path: PathBuf,

    pub document: PageDocument,
}

impl LoadedDocument {
    /// Load and validate a page document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| DocumentError::IoError {
            path: path.clone(),
            source: e,
        })?;

        let document = PageDocument::from_json(&json).map_err(|e| DocumentError::ParseError {
            path: path.clone(),
            source: e,
        })?;

        document
            .validate()
            .map_err(|message| DocumentError::ValidationError {
                path: path.clone(),
                message,
            })?;

        Ok(Self { path, document })
    }

    /// Folder containing the document JSON.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Folder holding per-dialogue audio: `<doc dir>/<image stem>_jpg`.
    pub fn audio_root(&self) -> PathBuf {
        self.dir().join(format!("{}_jpg", self.document.image_stem()))
    }

    /// Folder holding the takes for one dialogue.
    pub fn dialogue_audio_dir(&self, id: &DialogueId) -> PathBuf {
        self.audio_root().join(format!("dialogue__{id}"))
    }

    /// Page image path, resolved against `input_root` when given and the
    /// document folder otherwise.
    pub fn resolve_image(&self, input_root: Option<&Path>) -> PathBuf {
        self.document.image_path(input_root.unwrap_or_else(|| self.dir()))
    }

    /// Default output folder for rendered videos.
    pub fn video_output_dir(&self) -> PathBuf {
        self.dir().join("video_output")
    }
}

/// Errors that can occur when loading page documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: PageParseError,
    },

    #[error("Invalid document {path}: {message}")]
    ValidationError { path: PathBuf, message: String },
}

/// Why a page document's JSON was rejected.
#[derive(Debug, thiserror::Error)]
pub enum PageParseError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("document array is empty")]
    Empty,

    #[error("image size must be positive (got {width}x{height})")]
    InvalidDimensions { width: i64, height: i64 },
}

impl From<DocumentError> for PagepanError {
    fn from(err: DocumentError) -> Self {
        match err {
            err @ DocumentError::ParseError {
                source: PageParseError::InvalidDimensions { .. },
                ..
            } => PagepanError::invalid_geometry(err.to_string()),
            DocumentError::IoError { path, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                PagepanError::FileNotFound { path }
            }
            other => PagepanError::document(other.to_string()),
        }
    }
}
