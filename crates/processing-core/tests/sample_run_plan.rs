use std::path::PathBuf;

use pagepan_common::config::RenderConfig;
use pagepan_processing_core::pan_planner::{PanPlanner, PlanGeometry, PlannerConfig};
use pagepan_project_model::document::{DialogueId, PageDocument};

fn load_fixture_document() -> PageDocument {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-run")
        .join("chapter_01")
        .join("page_003")
        .join("ocr_output_with_bboxes.json");

    let content = std::fs::read_to_string(path).expect("fixture document should be readable");
    PageDocument::from_json(&content).expect("fixture document should parse")
}

#[test]
fn default_config_plan_for_fixture_page_is_stable() {
    let doc = load_fixture_document();
    let config = RenderConfig::default();
    let planner = PanPlanner::new(PlannerConfig::from(&config.viewport));

    let plan = planner
        .plan(
            &doc.parsed_dialogue,
            PlanGeometry {
                raw_width: doc.image_width,
                raw_height: doc.image_height,
                plan_width: config.viewport.width,
                viewport_height: config.viewport.height,
            },
        )
        .unwrap();

    assert_eq!(plan.scaled_height, 3240);
    assert_eq!(plan.max_offset, 1320);

    let ids: Vec<_> = plan
        .entries()
        .iter()
        .filter_map(|e| e.dialogue_id().cloned())
        .collect();
    assert_eq!(
        ids,
        [0, 1, 3, 4, 5].map(DialogueId::Number).to_vec(),
        "unboxed dialogue 2 must be skipped"
    );
    assert_eq!(
        plan.offsets().collect::<Vec<_>>(),
        vec![48, 491, 491, 1320, 1320]
    );
}

#[test]
fn fixture_plan_with_rolls_serializes_legacy_ids() {
    let doc = load_fixture_document();
    let plan = PanPlanner::with_defaults()
        .plan(
            &doc.parsed_dialogue,
            PlanGeometry {
                raw_width: doc.image_width,
                raw_height: doc.image_height,
                plan_width: 1080,
                viewport_height: 1920,
            },
        )
        .unwrap()
        .with_pre_roll()
        .with_post_roll();

    let legacy: Vec<_> = plan
        .entries()
        .iter()
        .map(|e| serde_json::json!({ "dlg_id": e.legacy_id(), "offset": e.offset }))
        .collect();

    assert_eq!(legacy.first().unwrap()["dlg_id"], -1);
    assert_eq!(legacy.first().unwrap()["offset"], 0);
    assert_eq!(legacy.last().unwrap()["dlg_id"], -2);
    assert_eq!(legacy.last().unwrap()["offset"], 1320);
    assert_eq!(legacy.len(), 7);
}
