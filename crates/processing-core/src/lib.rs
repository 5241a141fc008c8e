//! PagePan Processing Core: the pan planner
//!
//! Computes where the virtual camera looks while each dialogue plays:
//! - **Pan Planning:** bounding boxes to monotonic, clamped vertical offsets
//! - **Alignment:** pairing plan entries with their audio clips
//!
//! This crate is pure computation: no I/O, no encoder, no platform
//! dependencies. All inputs are data; all outputs are data.

pub mod alignment;
pub mod pan_planner;

pub use alignment::align;
pub use pan_planner::{compute_plan, PanPlanner, PlanGeometry, PlannerConfig};
