//! Pan plan types.
//!
//! A pan plan is the ordered list of vertical camera offsets (in pixels of the
//! scaled page) that the renderer walks through, one entry per audio segment.

use serde::{Deserialize, Serialize};

use crate::document::DialogueId;

/// Numeric id the legacy pipeline used for the pre-roll silence entry.
pub const PRE_ROLL_LEGACY_ID: i64 = -1;
/// Numeric id the legacy pipeline used for the post-roll silence entry.
pub const POST_ROLL_LEGACY_ID: i64 = -2;

/// What a plan entry is rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSlot {
    /// Silence before the first dialogue; the camera rests at the top.
    PreRoll,
    Dialogue(DialogueId),
    /// Silence after the last dialogue; the camera holds position.
    PostRoll,
}

/// One camera position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanPlanEntry {
    pub slot: PlanSlot,

    /// Vertical offset in scaled-image pixels.
    pub offset: u32,
}

impl PanPlanEntry {
    pub fn dialogue(id: DialogueId, offset: u32) -> Self {
        Self {
            slot: PlanSlot::Dialogue(id),
            offset,
        }
    }

    /// Dialogue id, or `None` for synthetic roll entries.
    pub fn dialogue_id(&self) -> Option<&DialogueId> {
        match &self.slot {
            PlanSlot::Dialogue(id) => Some(id),
            _ => None,
        }
    }

    /// Id in the legacy flat form, with `-1`/`-2` standing in for rolls.
    pub fn legacy_id(&self) -> DialogueId {
        match &self.slot {
            PlanSlot::PreRoll => DialogueId::Number(PRE_ROLL_LEGACY_ID),
            PlanSlot::Dialogue(id) => id.clone(),
            PlanSlot::PostRoll => DialogueId::Number(POST_ROLL_LEGACY_ID),
        }
    }

    pub fn is_roll(&self) -> bool {
        !matches!(self.slot, PlanSlot::Dialogue(_))
    }
}

/// Immutable pan plan for one page.
///
/// Only built through [`PanPlan::new`] and the roll helpers, so it is
/// serialized for reports but never deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanPlan {
    /// Page height after scaling to the plan width.
    pub scaled_height: u32,

    /// Largest offset that still keeps the viewport inside the page.
    pub max_offset: u32,

    entries: Vec<PanPlanEntry>,
}

impl PanPlan {
    /// Build a plan from entries that already satisfy the ordering invariant.
    pub fn new(scaled_height: u32, max_offset: u32, entries: Vec<PanPlanEntry>) -> Self {
        debug_assert!(
            entries.windows(2).all(|w| w[0].offset <= w[1].offset),
            "pan plan offsets must be non-decreasing"
        );
        debug_assert!(entries.iter().all(|e| e.offset <= max_offset));
        Self {
            scaled_height,
            max_offset,
            entries,
        }
    }

    pub fn entries(&self) -> &[PanPlanEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PanPlanEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.offset)
    }

    /// Offset of the last entry (0 for an empty plan).
    pub fn last_offset(&self) -> u32 {
        self.entries.last().map(|e| e.offset).unwrap_or(0)
    }

    /// Prepend a pre-roll entry at the top of the page.
    pub fn with_pre_roll(mut self) -> Self {
        self.entries.insert(
            0,
            PanPlanEntry {
                slot: PlanSlot::PreRoll,
                offset: 0,
            },
        );
        self
    }

    /// Append a post-roll entry holding the last camera position.
    pub fn with_post_roll(mut self) -> Self {
        let offset = self.last_offset();
        self.entries.push(PanPlanEntry {
            slot: PlanSlot::PostRoll,
            offset,
        });
        self
    }
}
