//! Render every page document of a run.

use pagepan_common::config::RenderConfig;
use pagepan_common::timing::format_secs;
use pagepan_render_engine::BatchRunner;

pub async fn run(config: RenderConfig, run_id: String) -> anyhow::Result<()> {
    let runner = BatchRunner::new(super::ffmpeg_chapter_builder(config)?);
    eprintln!("Rendering run: {}", runner.run_dir(&run_id)?.display());

    let report = runner.build_run(&run_id).await?;

    eprintln!(
        "Rendered {} chapter(s), skipped {} in {}",
        report.results.len(),
        report.skipped.len(),
        format_secs(report.elapsed_secs)
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
