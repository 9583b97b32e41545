//! lazyorm build-time enhancer
//!
//! Rewrites the mapping descriptors of a classes directory in place so that
//! lazy attributes are intercepted at runtime.
//!
//! Usage:
//!   lazyorm-enhance --classes-dir target/classes --lazy-initialization
//!   lazyorm-enhance --config enhance.toml

use anyhow::{Context, Result, bail};
use clap::Parser;
use lazyorm_enhance::{EnhanceTask, EnhancerConfig};
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "lazyorm-enhance")]
#[command(about = "Build-time enhancement of lazyorm mapping descriptors")]
struct Args {
    /// Path to a TOML enhancer configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Classes directory to enhance (overrides the configuration)
    #[arg(long)]
    classes_dir: Option<PathBuf>,

    /// Intercept lazy attributes
    #[arg(long)]
    lazy_initialization: bool,

    /// Install inline dirty tracking
    #[arg(long)]
    dirty_tracking: bool,

    /// Keep both sides of bidirectional associations in sync
    #[arg(long)]
    association_management: bool,

    /// Enable extended enhancement
    #[arg(long)]
    extended_enhancement: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = match &args.config {
        Some(path) => EnhancerConfig::load(path)
            .with_context(|| format!("failed to load enhancer config {}", path.display()))?,
        None => EnhancerConfig::default(),
    };
    if let Some(dir) = args.classes_dir {
        config.classes_directory = dir;
    }
    config.flags.enable_lazy_initialization |= args.lazy_initialization;
    config.flags.enable_dirty_tracking |= args.dirty_tracking;
    config.flags.enable_association_management |= args.association_management;
    config.flags.enable_extended_enhancement |= args.extended_enhancement;

    info!(directory = %config.classes_directory.display(), "starting enhancement");
    let mut task = EnhanceTask::new(config);
    let report = task.run().context("enhancement failed")?;

    for (path, e) in &report.failed {
        error!(file = %path.display(), error = %e, "failed");
    }
    info!(
        enhanced = report.enhanced.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "enhancement finished"
    );

    if !report.is_success() {
        bail!("{} class file(s) could not be enhanced", report.failed.len());
    }
    Ok(())
}
