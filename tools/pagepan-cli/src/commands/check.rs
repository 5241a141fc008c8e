//! Check encoder availability.

use pagepan_common::config::RenderConfig;
use pagepan_render_engine::ffmpeg::command_exists;

pub fn run(config: &RenderConfig) -> anyhow::Result<()> {
    println!("PagePan System Check");
    println!("{}", "=".repeat(50));

    let mut missing = 0;
    for binary in [&config.encoder.ffmpeg_bin, &config.encoder.ffprobe_bin] {
        if command_exists(binary) {
            println!("[OK] {binary}");
        } else {
            println!("[MISSING] {binary}");
            missing += 1;
        }
    }

    println!(
        "     Output: {}x{} @ {}fps, {} ({})",
        config.viewport.width,
        config.viewport.height,
        config.encoder.fps,
        config.encoder.vcodec,
        config.encoder.pix_fmt
    );
    if config.encoder.vcodec.ends_with("_nvenc") {
        println!("     Note: {} needs an NVIDIA GPU and driver.", config.encoder.vcodec);
    }

    println!();
    if missing == 0 {
        println!("Encoder is available. PagePan is ready.");
        Ok(())
    } else {
        anyhow::bail!("{missing} required binary(ies) not found")
    }
}
