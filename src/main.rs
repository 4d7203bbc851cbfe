use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use mediashrink::classify::{self, MediaClass};
use mediashrink::config::ConversionConfig;
use mediashrink::error::RunError;
use mediashrink::{logging, report, scheduler, tools};

#[derive(Parser)]
#[command(name = "mediashrink")]
#[command(version, about = "Shrink a photo/video tree into HEIC and HEVC", long_about = None)]
struct Cli {
    /// Base directory holding extra/, input/ and output/ (defaults to the
    /// current directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Alternative config file (defaults to <base>/extra/config.txt)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    logging::init(&base_dir, cli.verbose)?;

    if let Err(e) = run(&base_dir, cli.config.as_deref()) {
        error!("🚨 run aborted: {e:#}");
        eprintln!("🚨 Run aborted: {e:#}");
        eprintln!(
            "   Details are in the log under {}",
            logging::log_dir(&base_dir).display()
        );
        std::process::exit(1);
    }
    Ok(())
}

fn run(base_dir: &Path, config_override: Option<&Path>) -> anyhow::Result<()> {
    let config = Arc::new(ConversionConfig::load(base_dir, config_override)?);
    info!("📂 source: {}", config.source_root.display());
    info!("📂 output: {}", config.output_root.display());
    if config.developer_mode {
        info!("🧪 developer mode: example assets are reprocessed and never deleted");
    }

    // One PATH bracket around the whole run, restored on every exit path.
    let _path_guard = tools::ToolPathGuard::extend(&config.tools_dir);
    tools::ensure_tools(&config.tools_dir)?;

    if !config.source_root.is_dir() {
        return Err(RunError::SourceMissing(config.source_root.clone()).into());
    }

    let files = classify::classify(&config.source_root);
    let source_size = classify::directory_size(&config.source_root);
    let images = files.iter().filter(|f| f.class == MediaClass::Image).count();
    let videos = files.iter().filter(|f| f.class == MediaClass::Video).count();
    let unsupported = files.len() - images - videos;
    report::print_initial_stats(source_size, images, videos, unsupported);

    if files.is_empty() {
        info!("📂 nothing to process under {}", config.source_root.display());
        return Ok(());
    }

    let batch = scheduler::run_batch(Arc::clone(&config), files, source_size)?;
    report::print_final_dashboard(&batch);
    Ok(())
}
