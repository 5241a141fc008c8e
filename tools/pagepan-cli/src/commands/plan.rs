//! Print the pan plan for a page document.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use pagepan_common::config::RenderConfig;
use pagepan_project_model::document::{DialogueId, LoadedDocument};
use pagepan_project_model::plan::PlanSlot;
use pagepan_render_engine::{ChapterBuilder, FfmpegEncoder, GeometryBuilder};

#[derive(Debug, Serialize)]
struct PlanReport {
    document: PathBuf,
    image: PathBuf,
    scaled_height: u32,
    max_offset: u32,
    entries: Vec<PlanRow>,
}

#[derive(Debug, Serialize)]
struct PlanRow {
    slot: PlanSlot,
    /// Flat id with `-1`/`-2` for pre/post roll.
    id: DialogueId,
    offset: u32,
    filter: String,
}

pub fn run(config: RenderConfig, document: PathBuf) -> anyhow::Result<()> {
    let loaded = LoadedDocument::load(&document)
        .map_err(|e| anyhow::anyhow!("Failed to load document: {e}"))?;

    let geometry = GeometryBuilder::from_config(&config)?;
    let pre_roll = config.padding.pre_roll_secs > 0.0;
    let post_roll = config.padding.post_roll_secs > 0.0;
    let image = loaded.resolve_image(config.input_root.as_deref());

    // Planning never touches the encoder, so availability is not checked.
    let encoder = Arc::new(FfmpegEncoder::new(config.encoder.clone()));
    let builder = ChapterBuilder::new(Arc::new(config), encoder)?;

    let mut plan = builder.plan_document(&loaded)?;
    if plan.is_empty() {
        eprintln!("No dialogue with a bounding box in {}", document.display());
    } else {
        if pre_roll {
            plan = plan.with_pre_roll();
        }
        if post_roll {
            plan = plan.with_post_roll();
        }
    }

    let (raw_w, raw_h) = (loaded.document.image_width, loaded.document.image_height);
    let entries = plan
        .entries()
        .iter()
        .map(|entry| {
            Ok(PlanRow {
                slot: entry.slot.clone(),
                id: entry.legacy_id(),
                offset: entry.offset,
                filter: geometry.build(raw_w, raw_h, entry.offset)?.to_filter_chain(),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let report = PlanReport {
        document: loaded.path.clone(),
        image,
        scaled_height: plan.scaled_height,
        max_offset: plan.max_offset,
        entries,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
