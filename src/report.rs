//! Reporting and presentation
//!
//! Everything the user sees: the initial stats banner, per-phase progress
//! bars, the ignored-file list and the final summary dashboard with the
//! space actually saved. The run's primary "result" is this human-readable
//! surface; there is deliberately no machine-readable output.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::outcome::BatchCounters;
use crate::scheduler::BatchReport;

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

pub fn print_initial_stats(source_size: u64, images: usize, videos: usize, unsupported: usize) {
    println!("{}", "═".repeat(72));
    println!("  {}", style("🗂️  mediashrink — media space saver").bold());
    println!(
        "  📏 Original size: {} | 📸 Images: {} | 🎞️  Videos: {} | 🚫 Other: {}",
        format_bytes(source_size),
        images,
        videos,
        unsupported
    );
    println!("{}", "═".repeat(72));
}

/// One bar per phase; updated only from the scheduler's consuming loop.
pub fn phase_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{prefix} ▕{bar:30.green}▏ {percent:>3}% ({pos}/{len}) ⏳ {msg}",
        )
        .unwrap()
        .progress_chars("█▓░"),
    );
    pb.set_prefix(prefix.to_string());
    pb
}

pub fn print_phase_summary(label: &str, counters: &BatchCounters) {
    println!(
        "✅ {} done — processed: {}, skipped (already processed): {}, failed: {}",
        label, counters.processed, counters.skipped_processed, counters.failed
    );
}

pub fn print_ignored_files(names: &[String]) {
    if names.is_empty() {
        return;
    }
    println!("\n🚫 Ignored files (unsupported extension):");
    for name in names {
        println!("   - {}", name);
    }
    println!("   total ignored: {}", names.len());
}

pub fn print_final_dashboard(report: &BatchReport) {
    let overall = report.overall();
    let saved = report.source_size.saturating_sub(report.output_size);
    let percent = if report.source_size > report.output_size && report.source_size > 0 {
        saved as f64 / report.source_size as f64 * 100.0
    } else {
        0.0
    };

    println!();
    println!("╔════════════════════════════════════════════════════════════════════╗");
    println!("║                     📊 Batch Conversion Summary                    ║");
    println!("╠════════════════════════════════════════════════════════════════════╣");
    println!(
        "║  📸 Images: {:>6}    🎞️  Videos: {:>6}                            ║",
        report.image_total, report.video_total
    );
    println!(
        "║  ✅ Processed:                  {:>8}                           ║",
        overall.processed
    );
    println!(
        "║  ⏭️  Skipped (already done):     {:>8}                           ║",
        overall.skipped_processed
    );
    println!(
        "║  🚫 Ignored (unsupported):      {:>8}                           ║",
        overall.skipped_unsupported
    );
    println!(
        "║  ❌ Failed:                     {:>8}                           ║",
        overall.failed
    );
    println!("╠════════════════════════════════════════════════════════════════════╣");
    println!(
        "║  💾 Original size:            {:>10}                           ║",
        format_bytes(report.source_size)
    );
    println!(
        "║  💾 Final size:               {:>10}                           ║",
        format_bytes(report.output_size)
    );
    println!(
        "║  ⏱️  Total time:               {:>10}                           ║",
        format_duration(report.elapsed)
    );
    println!("╚════════════════════════════════════════════════════════════════════╝");
    if report.source_size > 0 {
        println!(
            "{}",
            style(format!(
                "🏆 Space saved: {} ({:.2}%)",
                format_bytes(saved),
                percent
            ))
            .green()
            .bold()
        );
    } else {
        println!("No space-savings statistics could be computed.");
    }
}
