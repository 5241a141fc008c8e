//! Write the default configuration file.

use std::path::PathBuf;

use anyhow::bail;

use pagepan_common::config::RenderConfig;

pub fn run(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    RenderConfig::default()
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;

    println!("Wrote default configuration to {}", path.display());
    println!("  Set `output_root` (and `input_root` if images live elsewhere) before `pagepan run`.");
    Ok(())
}
