//! Per-file conversion orchestration
//!
//! The state machine for a single file: probe size, branch by class, check
//! idempotency, convert, validate the output, derive a filename date (videos
//! only), propagate metadata and timestamps, delete the original. Every exit
//! is a typed `ConversionOutcome`; nothing thrown here may reach the
//! scheduler.
//!
//! The original is only ever deleted after the output has been seen on disk
//! with nonzero size. Metadata and timestamp trouble downgrade to warnings —
//! a converted file is never discarded because its tags are incomplete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use filetime::FileTime;
use tracing::{debug, warn};

use crate::classify::{MediaClass, MediaFile};
use crate::config::ConversionConfig;
use crate::convert::{convert_image_to_heic, convert_video_to_hevc};
use crate::exif;
use crate::filedate;
use crate::metadata::copy_metadata;
use crate::outcome::{ConversionOutcome, OutcomeKind};
use crate::retry::poll_until;

/// Drive one file through the whole pipeline.
pub fn process_file(config: &ConversionConfig, file: &MediaFile) -> ConversionOutcome {
    let file_name = file.file_name();

    // 1. Size probe. The file may have vanished since classification.
    let original_size = match fs::metadata(&file.path) {
        Ok(m) => m.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("❌ file disappeared before processing: {}", file.path.display());
            return ConversionOutcome::new(OutcomeKind::FailedNotFound, file_name, 0);
        }
        Err(e) => {
            warn!("❌ cannot read size of {}: {e}", file.path.display());
            return ConversionOutcome::new(OutcomeKind::FailedSizeRetrieval, file_name, 0);
        }
    };

    // 2. Branch by extension class.
    let target_ext = match file.class {
        MediaClass::Image => "heic",
        MediaClass::Video => "mp4",
        MediaClass::Unsupported => {
            return ConversionOutcome::new(
                OutcomeKind::SkippedUnsupported,
                file_name,
                original_size,
            );
        }
    };
    let is_image = file.class == MediaClass::Image;

    let stem = file
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_path = output_path_for(config, file, &stem, target_ext);

    if let Some(parent) = output_path.parent() {
        // Concurrent workers may create the same subdirectory; create_dir_all
        // is race-safe and idempotent.
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("❌ cannot create output directory {}: {e}", parent.display());
            return ConversionOutcome::new(OutcomeKind::FailedConversion, file_name, original_size);
        }
    }

    // 3. Idempotency: an output strictly newer than the input means a prior
    //    run already handled this file. Example assets under developer mode
    //    are always reprocessed.
    let example_asset = config.is_example_asset(&file.path);
    if !example_asset && is_up_to_date(&file.path, &output_path) {
        return ConversionOutcome::new(
            OutcomeKind::SkippedAlreadyProcessed,
            file_name,
            original_size,
        );
    }

    // 4. Convert. Images get a best-effort EXIF pre-read for the encoder.
    let converted = if is_image {
        let exif_blob = exif::read_exif_blob(&file.path);
        convert_image_to_heic(
            &file.path,
            &output_path,
            config.image_quality,
            exif_blob.as_deref(),
        )
    } else {
        convert_video_to_hevc(
            &file.path,
            &output_path,
            config.video_crf,
            &config.video_preset,
            config.gpu_enabled,
            config.gpu_encoder.as_deref(),
        )
    };

    // 5. Post-conversion validation: tool success AND a nonzero output file.
    let produced = converted
        && fs::metadata(&output_path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
    if !produced {
        warn!(
            "❌ conversion failed for {}: tool reported failure or output missing/empty",
            file_name
        );
        return ConversionOutcome::new(OutcomeKind::FailedConversion, file_name, original_size);
    }

    // 6. Videos named after their capture date get that date, at midnight,
    //    as the authoritative timestamp.
    let override_ts = if is_image {
        None
    } else {
        filedate::date_from_filename(&stem)
    };

    // 7. Metadata copy is warning-only; the converted file is kept.
    if !copy_metadata(
        &file.path,
        &output_path,
        config.max_retries,
        config.retry_delay,
        override_ts,
    ) {
        warn!("⚠️ metadata copy incomplete for {}; converted file kept", file_name);
    }

    // 8. Filesystem timestamps, also warning-only.
    apply_output_timestamps(config, &file.path, &output_path, override_ts);

    // 9. Delete the original. Example assets are preserved.
    if example_asset {
        debug!(
            "developer mode: keeping example asset {}",
            file.path.display()
        );
        return ConversionOutcome::new(OutcomeKind::Processed, file_name, original_size);
    }
    match fs::remove_file(&file.path) {
        Ok(()) => {
            debug!("original {} removed after conversion", file.path.display());
            ConversionOutcome::new(OutcomeKind::Processed, file_name, original_size)
        }
        Err(e) => {
            warn!("❌ could not delete original {}: {e}", file.path.display());
            ConversionOutcome::new(OutcomeKind::FailedDeleteOriginal, file_name, original_size)
        }
    }
}

fn output_path_for(
    config: &ConversionConfig,
    file: &MediaFile,
    stem: &str,
    target_ext: &str,
) -> PathBuf {
    let rel_parent = file.relative.parent().unwrap_or(Path::new(""));
    config
        .output_root
        .join(rel_parent)
        .join(format!("{stem}.{target_ext}"))
}

/// Strictly newer output mtime counts as up to date; equal timestamps
/// reprocess (mtime granularity makes "equal" unreliable evidence of
/// completion).
fn is_up_to_date(input: &Path, output: &Path) -> bool {
    let (Ok(out_meta), Ok(in_meta)) = (fs::metadata(output), fs::metadata(input)) else {
        return false;
    };
    match (out_meta.modified(), in_meta.modified()) {
        (Ok(out_mtime), Ok(in_mtime)) => out_mtime > in_mtime,
        _ => false,
    }
}

/// Apply the filename-derived timestamp when present, otherwise copy the
/// original's access/modify times once the output is ready. Exhausting the
/// poll budget is a warning, never a failure.
fn apply_output_timestamps(
    config: &ConversionConfig,
    input: &Path,
    output: &Path,
    override_ts: Option<NaiveDateTime>,
) {
    if let Some(ts) = override_ts {
        match filedate::to_file_time(ts) {
            Some(ft) => {
                if let Err(e) = filetime::set_file_times(output, ft, ft) {
                    warn!(
                        "⚠️ could not set filename-derived times on {}: {e}",
                        output.display()
                    );
                } else {
                    debug!("filename-derived date applied to {}", output.display());
                }
            }
            None => warn!(
                "⚠️ filename-derived date for {} is not representable in local time",
                output.display()
            ),
        }
        return;
    }

    let meta = match fs::metadata(input) {
        Ok(m) => m,
        Err(e) => {
            warn!("⚠️ cannot stat {} to copy its timestamps: {e}", input.display());
            return;
        }
    };
    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);

    let ready = poll_until(config.max_retries, config.retry_delay, || {
        fs::metadata(output).ok().filter(|m| m.len() > 0).map(|_| ())
    });
    match ready {
        Some(()) => {
            if let Err(e) = filetime::set_file_times(output, atime, mtime) {
                warn!("⚠️ could not copy timestamps onto {}: {e}", output.display());
            }
        }
        None => warn!(
            "⚠️ {} never became ready; original timestamps not copied",
            output.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::media_class_for;
    use crate::convert::image::heic_encoder_available;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> ConversionConfig {
        ConversionConfig {
            image_quality: 70,
            video_crf: 28,
            video_preset: "Fast 1080p30".to_string(),
            gpu_enabled: false,
            gpu_encoder: None,
            max_retries: 2,
            retry_delay: Duration::from_millis(10),
            workers: 2,
            base_dir: root.to_path_buf(),
            source_root: root.join("input"),
            output_root: root.join("output"),
            tools_dir: root.join("extra"),
            example_dir: root.join("extra/sample-media"),
            developer_mode: false,
        }
    }

    fn media_file(config: &ConversionConfig, relative: &str) -> MediaFile {
        let path = config.source_root.join(relative);
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        MediaFile {
            relative: PathBuf::from(relative),
            class: media_class_for(&path),
            path,
            size,
        }
    }

    #[test]
    fn test_missing_file_is_failed_not_found() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.source_root).unwrap();

        let file = media_file(&config, "gone.jpg");
        let outcome = process_file(&config, &file);
        assert_eq!(outcome.kind, OutcomeKind::FailedNotFound);
        assert_eq!(outcome.original_size, 0);
        assert_eq!(outcome.file_name, "gone.jpg");
    }

    #[test]
    fn test_unsupported_extension_is_skipped() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.source_root).unwrap();
        fs::write(config.source_root.join("notes.txt"), b"hello").unwrap();

        let file = media_file(&config, "notes.txt");
        let outcome = process_file(&config, &file);
        assert_eq!(outcome.kind, OutcomeKind::SkippedUnsupported);
        assert_eq!(outcome.original_size, 5);
        // untouched
        assert!(config.source_root.join("notes.txt").exists());
        assert!(!config.output_root.join("notes.heic").exists());
    }

    #[test]
    fn test_newer_output_skips_as_already_processed() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.source_root).unwrap();
        fs::create_dir_all(&config.output_root).unwrap();

        let input = config.source_root.join("pic.jpg");
        let output = config.output_root.join("pic.heic");
        fs::write(&input, b"img").unwrap();
        fs::write(&output, b"already converted").unwrap();
        filetime::set_file_times(&input, FileTime::from_unix_time(1_000, 0), FileTime::from_unix_time(1_000, 0)).unwrap();
        filetime::set_file_times(&output, FileTime::from_unix_time(2_000, 0), FileTime::from_unix_time(2_000, 0)).unwrap();

        let file = media_file(&config, "pic.jpg");
        let outcome = process_file(&config, &file);
        assert_eq!(outcome.kind, OutcomeKind::SkippedAlreadyProcessed);
        assert!(input.exists());
    }

    #[test]
    fn test_equal_mtimes_do_not_skip() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.source_root).unwrap();
        fs::create_dir_all(&config.output_root).unwrap();

        let input = config.source_root.join("pic.jpg");
        let output = config.output_root.join("pic.heic");
        fs::write(&input, b"not a real jpeg").unwrap();
        fs::write(&output, b"stale").unwrap();
        let ts = FileTime::from_unix_time(5_000, 0);
        filetime::set_file_times(&input, ts, ts).unwrap();
        filetime::set_file_times(&output, ts, ts).unwrap();

        let file = media_file(&config, "pic.jpg");
        let outcome = process_file(&config, &file);
        // equal mtimes are "not newer": the file is reprocessed (and this
        // garbage input then fails conversion)
        assert_ne!(outcome.kind, OutcomeKind::SkippedAlreadyProcessed);
    }

    #[test]
    fn test_failed_conversion_keeps_original() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.source_root).unwrap();

        let input = config.source_root.join("broken.jpg");
        fs::write(&input, b"garbage bytes, not an image").unwrap();

        let file = media_file(&config, "broken.jpg");
        let outcome = process_file(&config, &file);
        assert_eq!(outcome.kind, OutcomeKind::FailedConversion);
        assert!(input.exists(), "original must survive a failed conversion");
    }

    #[test]
    fn test_image_processed_end_to_end() {
        if !heic_encoder_available() {
            eprintln!("libheif has no HEVC encoder, skipping test");
            return;
        }

        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let sub = config.source_root.join("holiday");
        fs::create_dir_all(&sub).unwrap();

        let input = sub.join("pic.png");
        image::RgbImage::new(8, 8).save(&input).unwrap();
        let original_times = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_times(&input, original_times, original_times).unwrap();

        let file = media_file(&config, "holiday/pic.png");
        let outcome = process_file(&config, &file);

        assert_eq!(outcome.kind, OutcomeKind::Processed);
        let output = config.output_root.join("holiday/pic.heic");
        let meta = fs::metadata(&output).unwrap();
        assert!(meta.len() > 0);
        assert!(!input.exists(), "original must be deleted on success");
        // timestamps copied from the original (exiftool may have been
        // unavailable; the filesystem copy still applies)
        let mtime = FileTime::from_last_modification_time(&meta);
        assert_eq!(mtime.unix_seconds(), original_times.unix_seconds());
    }

    #[test]
    fn test_example_asset_reprocessed_and_preserved() {
        if !heic_encoder_available() {
            eprintln!("libheif has no HEVC encoder, skipping test");
            return;
        }

        let temp = TempDir::new().unwrap();
        let mut config = test_config(temp.path());
        config.developer_mode = true;
        config.source_root = config.example_dir.clone();
        fs::create_dir_all(&config.source_root).unwrap();
        fs::create_dir_all(&config.output_root).unwrap();

        let input = config.source_root.join("demo.png");
        image::RgbImage::new(8, 8).save(&input).unwrap();
        // pre-existing, newer output would normally trigger the skip
        let output = config.output_root.join("demo.heic");
        fs::write(&output, b"old output").unwrap();
        filetime::set_file_times(&input, FileTime::from_unix_time(1_000, 0), FileTime::from_unix_time(1_000, 0)).unwrap();
        filetime::set_file_times(&output, FileTime::from_unix_time(2_000, 0), FileTime::from_unix_time(2_000, 0)).unwrap();

        let file = media_file(&config, "demo.png");
        let outcome = process_file(&config, &file);

        assert_eq!(outcome.kind, OutcomeKind::Processed);
        assert!(input.exists(), "example assets are never deleted");
        // output was regenerated, not left as the stale marker
        assert_ne!(fs::read(&output).unwrap(), b"old output");
    }

    #[test]
    fn test_override_timestamp_applied_to_output() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.output_root).unwrap();

        let input = temp.path().join("video_20220101.mov");
        let output = config.output_root.join("video_20220101.mp4");
        fs::write(&input, b"in").unwrap();
        fs::write(&output, b"converted").unwrap();

        let ts = filedate::date_from_filename("video_20220101").unwrap();
        apply_output_timestamps(&config, &input, &output, Some(ts));

        let expected = filedate::to_file_time(ts).unwrap();
        let meta = fs::metadata(&output).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&meta).unix_seconds(),
            expected.unix_seconds()
        );
    }

    #[test]
    fn test_fallback_copies_original_times() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::create_dir_all(&config.output_root).unwrap();

        let input = temp.path().join("clip.mov");
        let output = config.output_root.join("clip.mp4");
        fs::write(&input, b"in").unwrap();
        fs::write(&output, b"converted").unwrap();
        let times = FileTime::from_unix_time(1_234_567, 0);
        filetime::set_file_times(&input, times, times).unwrap();

        apply_output_timestamps(&config, &input, &output, None);

        let meta = fs::metadata(&output).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&meta).unix_seconds(),
            times.unix_seconds()
        );
    }

    #[test]
    fn test_timestamp_poll_exhaustion_is_nonfatal() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());

        let input = temp.path().join("clip.mov");
        fs::write(&input, b"in").unwrap();
        let never_there = config.output_root.join("nope.mp4");

        // must simply return after the bounded poll, no panic
        apply_output_timestamps(&config, &input, &never_there, None);
    }
}
