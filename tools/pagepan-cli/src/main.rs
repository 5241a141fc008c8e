//! PagePan CLI: plan and render comic pages as vertical pan videos.
//!
//! Usage:
//!   pagepan run <RUN_ID>          Render every page document of a run
//!   pagepan chapter <DOCUMENT>    Render a single page document
//!   pagepan plan <DOCUMENT>       Print the pan plan without encoding
//!   pagepan check                 Check encoder availability
//!   pagepan init-config <PATH>    Write the default configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use pagepan_common::config::{AlignmentPolicy, ConfigOverrides, RenderConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "pagepan",
    about = "Turn comic pages and dialogue audio into vertical pan videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that take precedence over the configuration file.
#[derive(Args, Debug, Default)]
struct OverrideArgs {
    /// Root that page image paths are resolved against
    #[arg(long)]
    input_root: Option<PathBuf>,

    /// Root containing one folder per run id
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Output width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Gap kept above a dialogue when the camera advances (pixels)
    #[arg(long)]
    safe_margin: Option<u32>,

    /// Horizontal padding on each side of the page (pixels)
    #[arg(long)]
    side_margin: Option<u32>,

    /// Top gap for the first dialogue, as a fraction of output height
    #[arg(long)]
    first_margin_pct: Option<f64>,

    /// Seconds of silence before the first dialogue
    #[arg(long)]
    pre_roll: Option<f64>,

    /// Seconds of silence after the last dialogue
    #[arg(long)]
    post_roll: Option<f64>,

    /// Documents rendered at the same time
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Keep per-segment files next to the output
    #[arg(long)]
    keep_segments: bool,

    /// Fail when the plan and the audio list differ in length
    #[arg(long)]
    strict_alignment: bool,
}

impl OverrideArgs {
    fn into_overrides(self, verbose: bool) -> ConfigOverrides {
        ConfigOverrides {
            input_root: self.input_root,
            output_root: self.output_root,
            width: self.width,
            height: self.height,
            side_margin: self.side_margin,
            safe_margin: self.safe_margin,
            first_dialog_margin_pct: self.first_margin_pct,
            pre_roll_secs: self.pre_roll,
            post_roll_secs: self.post_roll,
            jobs: self.jobs,
            keep_segments: self.keep_segments.then_some(true),
            alignment_policy: self.strict_alignment.then_some(AlignmentPolicy::Strict),
            log_level: verbose.then(|| "debug".to_string()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render every page document under <output_root>/<RUN_ID>
    Run {
        /// Run identifier (folder name under the output root)
        run_id: String,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Render a single page document
    Chapter {
        /// Path to the page document JSON
        document: PathBuf,

        /// Output version (defaults to the next free one)
        #[arg(long)]
        version: Option<u32>,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Print the pan plan for a page document as JSON
    Plan {
        /// Path to the page document JSON
        document: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Check encoder availability
    Check,

    /// Write the default configuration as TOML
    InitConfig {
        /// Destination file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn resolve_config(cli_config: Option<&PathBuf>, overrides: ConfigOverrides) -> anyhow::Result<RenderConfig> {
    let config = RenderConfig::resolve(cli_config.map(PathBuf::as_path), &overrides)?;
    pagepan_common::logging::init_logging(&config.logging);
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match cli.command {
        Commands::Run { run_id, overrides } => {
            let config = resolve_config(cli.config.as_ref(), overrides.into_overrides(verbose))?;
            commands::run::run(config, run_id).await
        }
        Commands::Chapter {
            document,
            version,
            overrides,
        } => {
            let config = resolve_config(cli.config.as_ref(), overrides.into_overrides(verbose))?;
            commands::chapter::run(config, document, version)
        }
        Commands::Plan {
            document,
            overrides,
        } => {
            let config = resolve_config(cli.config.as_ref(), overrides.into_overrides(verbose))?;
            commands::plan::run(config, document)
        }
        Commands::Check => {
            let config = resolve_config(
                cli.config.as_ref(),
                OverrideArgs::default().into_overrides(verbose),
            )?;
            commands::check::run(&config)
        }
        Commands::InitConfig { path, force } => commands::init_config::run(path, force),
    }
}
