//! Render a single page document.

use std::path::PathBuf;

use pagepan_common::config::RenderConfig;
use pagepan_common::timing::format_secs;

pub fn run(config: RenderConfig, document: PathBuf, version: Option<u32>) -> anyhow::Result<()> {
    eprintln!("Rendering chapter for: {}", document.display());

    let builder = super::ffmpeg_chapter_builder(config)?;
    let result = builder.build_chapter(&document, version)?;

    eprintln!(
        "Chapter complete in {}: {}",
        format_secs(result.elapsed_secs),
        result.output_file.display()
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
