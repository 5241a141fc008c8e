//! PagePan Common Utilities
//!
//! Shared infrastructure for all PagePan crates:
//! - Error types and result aliases
//! - Render configuration (TOML) with explicit override precedence
//! - Stage timing for long-running encoder calls
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;
pub mod timing;

pub use config::*;
pub use error::*;
pub use timing::*;
