//! PagePan Project Model
//!
//! Defines the core data contracts shared by planning and rendering:
//! - **Documents:** page metadata and dialogue bounding boxes from the OCR stage
//! - **Plan:** ordered vertical camera offsets, one per rendered segment
//! - **Layout:** output frame, side margins, and page scaling arithmetic
//!
//! All coordinates are integer pixels. Bounding boxes live in raw image
//! space; plan offsets live in scaled-page space.

pub mod document;
pub mod layout;
pub mod plan;

pub use document::*;
pub use layout::*;
pub use plan::*;
