//! Video → HEVC adapter
//!
//! Drives HandBrakeCLI as a subprocess: HEVC encode at the configured
//! quality factor, all audio and subtitle tracks kept. The preset only
//! applies to the CPU encoder; GPU encoders ignore it. Success is exit
//! status 0 plus nothing more — output validation is the orchestrator's job.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Command;

use tracing::{debug, error, warn};

use crate::tools::VIDEO_TOOL;

const CPU_ENCODER: &str = "x265";

/// Returns `true` iff the transcoder exited with status 0. All diagnostics
/// (captured stdout/stderr, failure hints) go to the log, never to the
/// caller.
pub fn convert_video_to_hevc(
    input: &Path,
    output: &Path,
    crf: u8,
    preset: &str,
    gpu_enabled: bool,
    gpu_encoder: Option<&str>,
) -> bool {
    let encoder = select_encoder(gpu_enabled, gpu_encoder, input);
    let args = transcode_args(input, output, encoder, crf, preset);
    debug!(
        "invoking {} {}",
        VIDEO_TOOL,
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    );

    match Command::new(VIDEO_TOOL).args(&args).output() {
        Ok(out) => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            let stderr = String::from_utf8_lossy(&out.stderr);
            debug!(
                "{VIDEO_TOOL} stdout for {}:\n{}",
                input.display(),
                stdout.trim()
            );
            debug!(
                "{VIDEO_TOOL} stderr for {}:\n{}",
                input.display(),
                stderr.trim()
            );

            if out.status.success() {
                true
            } else {
                warn!(
                    "❌ {VIDEO_TOOL} failed for {} (encoder {encoder}, status {})",
                    input.display(),
                    out.status
                );
                if stderr.trim().is_empty() {
                    warn!("   no diagnostic output from the transcoder");
                } else if let Some(hint) = stderr_hint(&stderr) {
                    warn!("   hint: {hint}");
                }
                false
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error!(
                "❌ {VIDEO_TOOL} not found; install it or place it in the extra/ tools directory"
            );
            false
        }
        Err(e) => {
            warn!("❌ could not launch {VIDEO_TOOL} for {}: {e}", input.display());
            false
        }
    }
}

fn select_encoder<'a>(gpu_enabled: bool, gpu_encoder: Option<&'a str>, input: &Path) -> &'a str {
    match gpu_encoder {
        Some(id) if gpu_enabled && !id.is_empty() => id,
        _ => {
            if gpu_enabled {
                warn!(
                    "⚠️ GPU acceleration enabled but no GPU encoder configured; using {CPU_ENCODER} for {}",
                    input.display()
                );
            }
            CPU_ENCODER
        }
    }
}

fn transcode_args(
    input: &Path,
    output: &Path,
    encoder: &str,
    crf: u8,
    preset: &str,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        input.into(),
        "-o".into(),
        output.into(),
        "-e".into(),
        encoder.into(),
        "-q".into(),
        crf.to_string().into(),
        "--all-audio".into(),
        "--all-subtitles".into(),
    ];
    if encoder == CPU_ENCODER && !preset.is_empty() {
        args.push("--preset".into());
        args.push(preset.into());
    }
    args
}

/// Map known transcoder stderr patterns onto operator hints. Log detail
/// only; never control flow.
fn stderr_hint(stderr: &str) -> Option<&'static str> {
    if stderr.contains("No such file or directory") || stderr.contains("Unable to open input file")
    {
        Some("input file missing or unreadable by the transcoder")
    } else if stderr.contains("encoder initialization failed")
        || stderr.contains("No matching encoder")
    {
        Some("encoder unavailable; check GPU encoder support and drivers")
    } else if stderr.contains("Invalid argument") || stderr.contains("Unknown option") {
        Some("bad transcoder arguments; check preset/encoder compatibility")
    } else {
        None
    }
}
