//! Metadata propagation via exiftool
//!
//! Copies the full tag set from the original onto the converted file, in
//! place. The target may still be settling on disk when we get here (the
//! encoder's exit races the filesystem flush), so the copy is preceded by a
//! bounded readiness poll. Callers treat a `false` return as a warning: the
//! converted file is kept no matter what happens in this module.

use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, error, warn};

use crate::retry::poll_until;
use crate::tools::METADATA_TOOL;

/// Timestamp format exiftool expects for FileModifyDate/FileCreateDate.
pub const EXIFTOOL_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Cached exiftool availability (checked once per process).
static EXIFTOOL_AVAILABLE: OnceLock<bool> = OnceLock::new();

pub fn is_exiftool_available() -> bool {
    *EXIFTOOL_AVAILABLE.get_or_init(|| which::which(METADATA_TOOL).is_ok())
}

/// Copy all tags from `source` onto `target`. When `override_ts` is set, the
/// file-modify and file-create tags are additionally forced to it.
pub fn copy_metadata(
    source: &Path,
    target: &Path,
    max_retries: u32,
    retry_delay: Duration,
    override_ts: Option<NaiveDateTime>,
) -> bool {
    let ready = poll_until(max_retries, retry_delay, || match fs::metadata(target) {
        Ok(m) if m.len() > 0 => Some(()),
        _ => {
            debug!(
                "target {} not ready for metadata copy, retrying",
                target.display()
            );
            None
        }
    });
    if ready.is_none() {
        warn!(
            "❌ {} missing or empty after {} attempts; metadata not copied",
            target.display(),
            max_retries
        );
        return false;
    }

    let mut cmd = Command::new(METADATA_TOOL);
    cmd.arg("-TagsFromFile")
        .arg(source)
        .arg("-all:all")
        .arg("-overwrite_original")
        .arg("-P");
    if let Some(ts) = override_ts {
        let stamp = ts.format(EXIFTOOL_DATE_FORMAT).to_string();
        cmd.arg(format!("-FileModifyDate={stamp}"));
        cmd.arg(format!("-FileCreateDate={stamp}"));
        debug!("forcing file dates on {} to {stamp}", target.display());
    }
    cmd.arg(target);
    debug!("invoking {:?}", cmd);

    match cmd.output() {
        Ok(out) if out.status.success() => true,
        Ok(out) => {
            warn!(
                "❌ {METADATA_TOOL} failed for {} (status {}):\n   stdout: {}\n   stderr: {}",
                target.display(),
                out.status,
                String::from_utf8_lossy(&out.stdout).trim(),
                String::from_utf8_lossy(&out.stderr).trim()
            );
            false
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error!(
                "❌ {METADATA_TOOL} not found; install it or place it in the extra/ tools directory"
            );
            false
        }
        Err(e) => {
            warn!(
                "❌ could not launch {METADATA_TOOL} for {}: {e}",
                target.display()
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_exiftool_date_format() {
        let ts = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            ts.format(EXIFTOOL_DATE_FORMAT).to_string(),
            "2022:01:01 00:00:00"
        );
    }

    #[test]
    fn test_missing_target_fails_without_invoking_tool() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.jpg");
        fs::write(&source, b"x").unwrap();
        let target = temp.path().join("missing.heic");

        assert!(!copy_metadata(
            &source,
            &target,
            2,
            Duration::from_millis(1),
            None
        ));
    }

    #[test]
    fn test_empty_target_fails_after_retries() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.jpg");
        let target = temp.path().join("empty.heic");
        fs::write(&source, b"x").unwrap();
        fs::write(&target, b"").unwrap();

        assert!(!copy_metadata(
            &source,
            &target,
            2,
            Duration::from_millis(1),
            None
        ));
    }

    #[test]
    fn test_copy_between_real_images() {
        if !is_exiftool_available() {
            eprintln!("exiftool not available, skipping test");
            return;
        }

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src.png");
        let target = temp.path().join("dst.png");
        image::RgbImage::new(2, 2).save(&source).unwrap();
        image::RgbImage::new(2, 2).save(&target).unwrap();

        assert!(copy_metadata(
            &source,
            &target,
            3,
            Duration::from_millis(10),
            None
        ));
        assert!(target.exists());
    }
}
