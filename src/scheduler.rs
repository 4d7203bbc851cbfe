//! Batch scheduling
//!
//! Two strictly ordered phases — all images, then all videos — each with its
//! own bounded worker pool. Every file of a phase is submitted up front;
//! completions arrive in arbitrary order over a channel and are folded into
//! the counters on the consuming thread, which is the only place the
//! counters (and the progress bar) are touched. Unsupported files never
//! enter a pool; they are counted and itemized directly.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::error;

use crate::classify::{self, MediaClass, MediaFile};
use crate::config::ConversionConfig;
use crate::error::RunError;
use crate::orchestrator;
use crate::outcome::{BatchCounters, ConversionOutcome, OutcomeKind};
use crate::report;

/// Aggregates handed to the presenter after both phases.
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub images: BatchCounters,
    pub videos: BatchCounters,
    pub image_total: usize,
    pub video_total: usize,
    pub unsupported_names: Vec<String>,
    pub source_size: u64,
    pub output_size: u64,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Combined counters across both phases plus the directly-counted
    /// unsupported files.
    pub fn overall(&self) -> BatchCounters {
        let mut all = self.images;
        all.merge(&self.videos);
        all.skipped_unsupported += self.unsupported_names.len();
        all
    }

    pub fn total_discovered(&self) -> usize {
        self.image_total + self.video_total + self.unsupported_names.len()
    }
}

/// Run the full batch: images phase, videos phase, unsupported accounting,
/// final output-tree sizing.
pub fn run_batch(
    config: Arc<ConversionConfig>,
    files: Vec<MediaFile>,
    source_size: u64,
) -> Result<BatchReport, RunError> {
    let start = Instant::now();

    let mut images = Vec::new();
    let mut videos = Vec::new();
    let mut unsupported = Vec::new();
    for file in files {
        match file.class {
            MediaClass::Image => images.push(file),
            MediaClass::Video => videos.push(file),
            MediaClass::Unsupported => unsupported.push(file),
        }
    }

    let mut batch = BatchReport {
        image_total: images.len(),
        video_total: videos.len(),
        unsupported_names: unsupported.iter().map(MediaFile::file_name).collect(),
        source_size,
        ..BatchReport::default()
    };

    // Phase barrier: videos wait for the last image task, bounding peak
    // resource usage (one pool at a time).
    batch.images = run_phase(&config, images, "🖼️  Photos")?;
    batch.videos = run_phase(&config, videos, "🎬 Videos")?;

    report::print_ignored_files(&batch.unsupported_names);

    batch.output_size = classify::directory_size(&config.output_root);
    batch.elapsed = start.elapsed();
    Ok(batch)
}

fn run_phase(
    config: &Arc<ConversionConfig>,
    files: Vec<MediaFile>,
    label: &str,
) -> Result<BatchCounters, RunError> {
    let mut counters = BatchCounters::default();
    if files.is_empty() {
        return Ok(counters);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .or_else(|_| rayon::ThreadPoolBuilder::new().num_threads(1).build())?;

    let total = files.len();
    let (tx, rx) = mpsc::channel::<ConversionOutcome>();
    for file in files {
        let tx = tx.clone();
        let config = Arc::clone(config);
        pool.spawn(move || {
            // Per-file boundary: a panic becomes a failed outcome, never a
            // dead batch.
            let outcome = match catch_unwind(AssertUnwindSafe(|| {
                orchestrator::process_file(&config, &file)
            })) {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!("💥 worker panicked while processing {}", file.path.display());
                    ConversionOutcome::new(
                        OutcomeKind::FailedConversion,
                        file.file_name(),
                        file.size,
                    )
                }
            };
            let _ = tx.send(outcome);
        });
    }
    drop(tx);

    // Serial aggregation point: the only mutation of counters and bar.
    let pb = report::phase_progress_bar(total as u64, label);
    for outcome in rx {
        counters.record(outcome.kind);
        if outcome.kind.is_failure() {
            pb.println(format!("   ❌ {} — {}", outcome.file_name, outcome.kind.label()));
        }
        pb.set_message(outcome.file_name);
        pb.inc(1);
    }
    pb.finish_with_message("done");
    report::print_phase_summary(label, &counters);

    Ok(counters)
}
