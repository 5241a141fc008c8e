use proptest::prelude::*;

use pagepan_processing_core::compute_plan;
use pagepan_project_model::document::{BoundingBox, DialogueUnit};

fn dialogue_strategy(max_y: i64) -> impl Strategy<Value = Vec<DialogueUnit>> {
    prop::collection::vec(prop::option::weighted(0.85, -50i64..max_y), 0..24).prop_map(|tops| {
        tops.into_iter()
            .enumerate()
            .map(|(i, y1)| DialogueUnit::new(i as i64, y1.map(BoundingBox::top)))
            .collect()
    })
}

prop_compose! {
    fn page()(raw_w in 1u32..4000, raw_h in 1u32..12000) -> (u32, u32) {
        (raw_w, raw_h)
    }
}

prop_compose! {
    fn frame()(vw in 1u32..2160, vh in 1u32..3840) -> (u32, u32) {
        (vw, vh)
    }
}

proptest! {
    #[test]
    fn offsets_are_non_decreasing(
        (raw_w, raw_h) in page(),
        (vw, vh) in frame(),
        dialogues in dialogue_strategy(12000),
        safe_margin in 0u32..600,
        pct in 0.0f64..=1.0,
    ) {
        let plan = compute_plan(&dialogues, raw_w, raw_h, vw, vh, safe_margin, pct).unwrap();
        let offsets: Vec<u32> = plan.offsets().collect();
        prop_assert!(offsets.windows(2).all(|w| w[0] <= w[1]), "offsets {:?}", offsets);
    }

    #[test]
    fn offsets_stay_within_page(
        (raw_w, raw_h) in page(),
        (vw, vh) in frame(),
        dialogues in dialogue_strategy(12000),
        safe_margin in 0u32..600,
        pct in 0.0f64..=1.0,
    ) {
        let plan = compute_plan(&dialogues, raw_w, raw_h, vw, vh, safe_margin, pct).unwrap();
        let scaled_h = (u64::from(raw_h) * u64::from(vw) / u64::from(raw_w)) as u32;
        let max_offset = scaled_h.saturating_sub(vh);

        prop_assert_eq!(plan.scaled_height, scaled_h);
        prop_assert_eq!(plan.max_offset, max_offset);
        for offset in plan.offsets() {
            prop_assert!(offset <= max_offset);
        }
    }

    #[test]
    fn one_entry_per_boxed_dialogue(
        dialogues in dialogue_strategy(5000),
    ) {
        let plan = compute_plan(&dialogues, 1000, 5000, 1080, 1920, 200, 0.02).unwrap();
        let boxed = dialogues.iter().filter(|d| d.bbox.is_some()).count();
        prop_assert_eq!(plan.len(), boxed);
    }

    #[test]
    fn planning_is_deterministic(
        (raw_w, raw_h) in page(),
        dialogues in dialogue_strategy(12000),
        safe_margin in 0u32..600,
    ) {
        let a = compute_plan(&dialogues, raw_w, raw_h, 1080, 1920, safe_margin, 0.02).unwrap();
        let b = compute_plan(&dialogues, raw_w, raw_h, 1080, 1920, safe_margin, 0.02).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn dialogue_above_camera_never_lowers_offset(
        first_y in 0i64..8000,
        second_y in 0i64..8000,
    ) {
        let dialogues = vec![DialogueUnit::boxed(0i64, first_y), DialogueUnit::boxed(1i64, second_y)];
        let plan = compute_plan(&dialogues, 1000, 8000, 1080, 1920, 200, 0.02).unwrap();
        let offsets: Vec<u32> = plan.offsets().collect();
        prop_assert!(offsets[1] >= offsets[0]);
    }
}
