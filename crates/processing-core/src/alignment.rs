//! Pairing pan plan entries with audio clips.
//!
//! Dialogues without a bounding box produce no plan entry, so the plan and
//! the audio list can drift apart when they are collected independently.
//! The pairing policy decides whether that is fatal.

use pagepan_common::config::AlignmentPolicy;
use pagepan_common::error::{PagepanError, PagepanResult};
use pagepan_project_model::plan::PanPlanEntry;

/// Pair plan entries with audio clips in order.
///
/// With [`AlignmentPolicy::Truncate`] a length mismatch is logged and both
/// lists are cut to the shorter length. With [`AlignmentPolicy::Strict`] it
/// is an [`PagepanError::AlignmentMismatch`].
pub fn align<A>(
    entries: Vec<PanPlanEntry>,
    audio: Vec<A>,
    policy: AlignmentPolicy,
) -> PagepanResult<Vec<(PanPlanEntry, A)>> {
    let (plan_len, audio_len) = (entries.len(), audio.len());

    if plan_len != audio_len {
        match policy {
            AlignmentPolicy::Strict => {
                return Err(PagepanError::AlignmentMismatch {
                    plan_len,
                    audio_len,
                });
            }
            AlignmentPolicy::Truncate => {
                tracing::warn!(
                    plan_len,
                    audio_len,
                    kept = plan_len.min(audio_len),
                    "Pan plan and audio list differ in length, truncating to the shorter"
                );
            }
        }
    }

    Ok(entries.into_iter().zip(audio).collect())
}
