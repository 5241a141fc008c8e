//! Pan planning: the "Balloon-to-Offset" algorithm.
//!
//! Turns per-dialogue bounding boxes into a sequence of vertical camera
//! offsets over a page scaled to the output width.
//!
//! # Algorithm
//!
//! 1. **Filter** dialogues without a bounding box.
//! 2. **Scale** the page: `scaled_h = floor(raw_h * plan_w / raw_w)` and
//!    `max_offset = max(0, scaled_h - viewport_h)`.
//! 3. **First dialogue** sits `floor(viewport_h * first_dialog_margin_pct)`
//!    below the top of the frame.
//! 4. **Later dialogues** already inside the frame (above the current offset)
//!    keep the camera still; otherwise the camera advances so the dialogue
//!    sits `safe_margin` below the top edge.
//! 5. **Clamp** to `[current, max_offset]` so the camera never leaves the
//!    page and never pans back up.

use pagepan_common::config::ViewportConfig;
use pagepan_common::error::{PagepanError, PagepanResult};
use pagepan_project_model::document::DialogueUnit;
use pagepan_project_model::layout::{max_offset, scale_position, scaled_height};
use pagepan_project_model::plan::{PanPlan, PanPlanEntry};

/// Framing parameters for the planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// Gap kept above each later dialogue when the camera advances (pixels).
    pub safe_margin: u32,

    /// Gap above the first dialogue, as a fraction of viewport height.
    pub first_dialog_margin_pct: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            safe_margin: 200,
            first_dialog_margin_pct: 0.02,
        }
    }
}

impl From<&ViewportConfig> for PlannerConfig {
    fn from(config: &ViewportConfig) -> Self {
        Self {
            safe_margin: config.safe_margin,
            first_dialog_margin_pct: config.first_dialog_margin_pct,
        }
    }
}

/// Page and frame dimensions a plan is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanGeometry {
    pub raw_width: u32,
    pub raw_height: u32,

    /// Width the page is scaled to before cropping.
    pub plan_width: u32,

    /// Height of the crop window.
    pub viewport_height: u32,
}

impl PlanGeometry {
    fn validate(&self) -> PagepanResult<()> {
        if self.raw_width == 0 || self.raw_height == 0 {
            return Err(PagepanError::invalid_geometry(format!(
                "raw image must be non-empty (got {}x{})",
                self.raw_width, self.raw_height
            )));
        }
        if self.plan_width == 0 || self.viewport_height == 0 {
            return Err(PagepanError::invalid_geometry(format!(
                "viewport must be non-empty (got {}x{})",
                self.plan_width, self.viewport_height
            )));
        }
        Ok(())
    }
}

/// The pan planner. Stateless; `plan` is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct PanPlanner {
    config: PlannerConfig,
}

impl PanPlanner {
    /// Create a new planner with the given configuration.
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Create a planner with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlannerConfig::default())
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Compute the pan plan for dialogues in reading order.
    ///
    /// Dialogues without a bounding box produce no entry. An empty result is
    /// not an error here; callers decide what a page without dialogue means.
    pub fn plan(&self, dialogues: &[DialogueUnit], geometry: PlanGeometry) -> PagepanResult<PanPlan> {
        geometry.validate()?;
        let pct = self.config.first_dialog_margin_pct;
        if !(0.0..=1.0).contains(&pct) {
            return Err(PagepanError::invalid_geometry(format!(
                "first dialogue margin {pct} is outside [0, 1]"
            )));
        }

        let scaled_h = scaled_height(geometry.raw_width, geometry.raw_height, geometry.plan_width)?;
        let max_off = max_offset(scaled_h, geometry.viewport_height);
        let first_margin = (f64::from(geometry.viewport_height) * pct).floor() as u32;

        let mut entries = Vec::with_capacity(dialogues.len());
        let mut current: Option<u32> = None;

        for dialogue in dialogues {
            let Some(bbox) = dialogue.bbox else {
                tracing::trace!(id = %dialogue.id, "Dialogue has no bounding box, skipping");
                continue;
            };

            let y_scaled = scale_position(bbox.top_px(), geometry.raw_width, geometry.plan_width)?;

            let offset = match current {
                None => y_scaled.saturating_sub(first_margin),
                Some(cur) if y_scaled < cur => cur,
                Some(cur) => y_scaled.saturating_sub(self.config.safe_margin).max(cur),
            };
            let offset = offset.min(max_off);

            tracing::trace!(id = %dialogue.id, y_scaled, offset, "Planned dialogue");
            entries.push(PanPlanEntry::dialogue(dialogue.id.clone(), offset));
            current = Some(offset);
        }

        tracing::debug!(
            dialogues = dialogues.len(),
            entries = entries.len(),
            scaled_height = scaled_h,
            max_offset = max_off,
            "Pan plan computed"
        );

        Ok(PanPlan::new(scaled_h, max_off, entries))
    }
}

/// Compute a pan plan from flat parameters.
///
/// Equivalent to `PanPlanner::new(..).plan(..)` with the page scaled to
/// `viewport_w`.
pub fn compute_plan(
    dialogues: &[DialogueUnit],
    raw_w: u32,
    raw_h: u32,
    viewport_w: u32,
    viewport_h: u32,
    safe_margin: u32,
    first_dialog_margin_pct: f64,
) -> PagepanResult<PanPlan> {
    PanPlanner::new(PlannerConfig {
        safe_margin,
        first_dialog_margin_pct,
    })
    .plan(
        dialogues,
        PlanGeometry {
            raw_width: raw_w,
            raw_height: raw_h,
            plan_width: viewport_w,
            viewport_height: viewport_h,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepan_project_model::document::{BoundingBox, DialogueId};

    fn boxed(ids_and_tops: &[(i64, i64)]) -> Vec<DialogueUnit> {
        ids_and_tops
            .iter()
            .map(|&(id, y1)| DialogueUnit::boxed(id, y1))
            .collect()
    }

    #[test]
    fn test_reference_scenario_clamps_to_max_offset() {
        let plan = compute_plan(&boxed(&[(0, 300)]), 1000, 2000, 1080, 1920, 200, 0.02).unwrap();
        assert_eq!(plan.scaled_height, 2160);
        assert_eq!(plan.max_offset, 240);
        assert_eq!(plan.offsets().collect::<Vec<_>>(), vec![240]);
    }

    #[test]
    fn test_dialogue_far_below_page_clamps_to_bottom() {
        let plan = compute_plan(&boxed(&[(0, 5_000_000_000)]), 1000, 2000, 1080, 1920, 200, 0.02).unwrap();
        assert_eq!(plan.offsets().collect::<Vec<_>>(), vec![240]);

        let plan = compute_plan(&boxed(&[(0, 100), (1, i64::MAX)]), 1000, 2000, 1080, 1920, 200, 0.02).unwrap();
        assert_eq!(plan.offsets().collect::<Vec<_>>(), vec![70, 240]);
    }

    #[test]
    fn test_first_dialogue_uses_first_margin() {
        // 4000px tall page: scaled to 4320, plenty of room.
        let plan = compute_plan(&boxed(&[(0, 1000)]), 1000, 4000, 1080, 1920, 200, 0.02).unwrap();
        // y_scaled = 1080, first margin = floor(38.4) = 38.
        assert_eq!(plan.entries()[0].offset, 1042);
    }

    #[test]
    fn test_later_dialogues_use_safe_margin() {
        let plan = compute_plan(
            &boxed(&[(0, 0), (1, 1000), (2, 2000)]),
            1000,
            4000,
            1080,
            1920,
            200,
            0.02,
        )
        .unwrap();
        // 1000 -> 1080 - 200 = 880; 2000 -> 2160 - 200 = 1960, clamp to 2400 not hit.
        assert_eq!(plan.offsets().collect::<Vec<_>>(), vec![0, 880, 1960]);
    }

    #[test]
    fn test_dialogue_above_camera_does_not_pan_back() {
        let plan = compute_plan(
            &boxed(&[(0, 2000), (1, 100)]),
            1000,
            4000,
            1080,
            1920,
            200,
            0.0,
        )
        .unwrap();
        let offsets: Vec<_> = plan.offsets().collect();
        assert_eq!(offsets[0], 2160);
        assert_eq!(offsets[1], 2160);
    }

    #[test]
    fn test_dialogue_just_below_camera_holds_position() {
        // Second dialogue is below the offset but within safe_margin of it:
        // y - safe_margin would move the camera up, so it holds instead.
        let plan = compute_plan(
            &boxed(&[(0, 1000), (1, 1050)]),
            1000,
            4000,
            1000,
            1920,
            200,
            0.0,
        )
        .unwrap();
        assert_eq!(plan.offsets().collect::<Vec<_>>(), vec![1000, 1000]);
    }

    #[test]
    fn test_top_dialogue_yields_zero() {
        for margin in [0, 50, 200, 5000] {
            let plan = compute_plan(&boxed(&[(0, 0)]), 1000, 3000, 1080, 1920, margin, 0.5).unwrap();
            assert_eq!(plan.entries()[0].offset, 0);
        }
    }

    #[test]
    fn test_missing_boxes_are_skipped() {
        let dialogues = vec![
            DialogueUnit::new(0i64, None),
            DialogueUnit::boxed(1i64, 500),
            DialogueUnit::new("narration", None),
        ];
        let plan = compute_plan(&dialogues, 1000, 4000, 1080, 1920, 200, 0.02).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.entries()[0].dialogue_id(), Some(&DialogueId::Number(1)));
    }

    #[test]
    fn test_no_boxed_dialogues_gives_empty_plan() {
        let dialogues = vec![DialogueUnit::new(0i64, None)];
        let plan = compute_plan(&dialogues, 1000, 2000, 1080, 1920, 200, 0.02).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.max_offset, 240);
    }

    #[test]
    fn test_short_page_pins_camera_to_top() {
        let plan = compute_plan(&boxed(&[(0, 900)]), 1000, 1000, 1080, 1920, 200, 0.02).unwrap();
        assert_eq!(plan.max_offset, 0);
        assert_eq!(plan.entries()[0].offset, 0);
    }

    #[test]
    fn test_zero_width_is_invalid_geometry() {
        let err = compute_plan(&boxed(&[(0, 10)]), 0, 2000, 1080, 1920, 200, 0.02).unwrap_err();
        assert!(matches!(err, PagepanError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_margin_pct_out_of_range_is_invalid() {
        let err = compute_plan(&boxed(&[(0, 10)]), 1000, 2000, 1080, 1920, 200, 1.5).unwrap_err();
        assert!(matches!(err, PagepanError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_negative_top_edge_treated_as_zero() {
        let dialogues = vec![DialogueUnit::new(
            0i64,
            Some(BoundingBox {
                x1: 0,
                y1: -40,
                x2: 10,
                y2: 10,
            }),
        )];
        let plan = compute_plan(&dialogues, 1000, 4000, 1080, 1920, 200, 0.02).unwrap();
        assert_eq!(plan.entries()[0].offset, 0);
    }

    #[test]
    fn test_planner_from_viewport_config() {
        let config = ViewportConfig {
            safe_margin: 120,
            first_dialog_margin_pct: 0.1,
            ..ViewportConfig::default()
        };
        let planner = PanPlanner::new(PlannerConfig::from(&config));
        assert_eq!(planner.config().safe_margin, 120);
        assert!((planner.config().first_dialog_margin_pct - 0.1).abs() < 1e-12);
    }
}
