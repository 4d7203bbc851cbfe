//! Run configuration
//!
//! A `ConversionConfig` is loaded once before the run and never mutated
//! afterwards; every component receives it through the shared run context.
//! The on-disk surface is a tiny `key = value` file under `extra/config.txt`
//! that is auto-created with defaults on first launch. Encoding parameters
//! are compile-time defaults, matching the tool's "point it at a folder and
//! run" usage.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::error::RunError;

pub const DEFAULT_IMAGE_QUALITY: u8 = 70;
pub const DEFAULT_VIDEO_CRF: u8 = 28;
pub const DEFAULT_VIDEO_PRESET: &str = "Fast 1080p30";
pub const DEFAULT_GPU_ENCODER: &str = "amf_h265";
pub const DEFAULT_MAX_RETRIES: u32 = 15;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

const EXTRA_DIR: &str = "extra";
const CONFIG_FILE: &str = "config.txt";
const SAMPLE_MEDIA_DIR: &str = "sample-media";
const DEFAULT_SOURCE_DIR: &str = "input";
const DEFAULT_OUTPUT_DIR: &str = "output";

/// Immutable run-scoped configuration and derived paths.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub image_quality: u8,
    pub video_crf: u8,
    pub video_preset: String,
    pub gpu_enabled: bool,
    pub gpu_encoder: Option<String>,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub workers: usize,
    pub base_dir: PathBuf,
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    /// Directory searched for bundled external tools, prepended to PATH for
    /// the duration of the run.
    pub tools_dir: PathBuf,
    /// Bundled example assets; under developer mode these are always
    /// reprocessed and never deleted.
    pub example_dir: PathBuf,
    pub developer_mode: bool,
}

/// Worker pool size: 80% of hardware concurrency, never below one.
pub fn default_workers() -> usize {
    (num_cpus::get() * 80 / 100).max(1)
}

/// Parse `key = value` lines; `#` comments and malformed lines are ignored.
pub fn parse_config_text(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    values
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "yes" | "true" | "1")
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    let p = PathBuf::from(value);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

impl ConversionConfig {
    /// Load the configuration for a run rooted at `base_dir`.
    ///
    /// A missing config file is created with commented defaults; an
    /// unreadable one falls back to defaults. Source and output directories
    /// are created eagerly so a first launch leaves a usable layout behind.
    pub fn load(base_dir: &Path, config_override: Option<&Path>) -> Result<Self, RunError> {
        let extra_dir = base_dir.join(EXTRA_DIR);
        let config_path = config_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| extra_dir.join(CONFIG_FILE));

        let values = if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(text) => parse_config_text(&text),
                Err(e) => {
                    warn!(
                        "⚠️ could not read config file {}: {e}; using defaults",
                        config_path.display()
                    );
                    HashMap::new()
                }
            }
        } else {
            warn!(
                "⚠️ config file {} not found; creating it with defaults",
                config_path.display()
            );
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let template = format!(
                "# mediashrink configuration\n\
                 # developer_mode = no\n\n\
                 source_dir = {DEFAULT_SOURCE_DIR}\n\
                 output_dir = {DEFAULT_OUTPUT_DIR}\n"
            );
            if let Err(e) = fs::write(&config_path, template) {
                warn!(
                    "⚠️ could not create config file {}: {e}",
                    config_path.display()
                );
            }
            HashMap::new()
        };

        let example_dir = extra_dir.join(SAMPLE_MEDIA_DIR);
        let developer_mode = values
            .get("developer_mode")
            .is_some_and(|v| is_truthy(v));

        let source_root = if developer_mode {
            example_dir.clone()
        } else {
            values
                .get("source_dir")
                .map(|v| resolve(base_dir, v))
                .unwrap_or_else(|| base_dir.join(DEFAULT_SOURCE_DIR))
        };
        let output_root = values
            .get("output_dir")
            .map(|v| resolve(base_dir, v))
            .unwrap_or_else(|| base_dir.join(DEFAULT_OUTPUT_DIR));

        for dir in [&source_root, &output_root] {
            fs::create_dir_all(dir).map_err(|e| RunError::Prepare {
                path: dir.clone(),
                source: e,
            })?;
        }

        Ok(Self {
            image_quality: DEFAULT_IMAGE_QUALITY,
            video_crf: DEFAULT_VIDEO_CRF,
            video_preset: DEFAULT_VIDEO_PRESET.to_string(),
            gpu_enabled: false,
            gpu_encoder: Some(DEFAULT_GPU_ENCODER.to_string()),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            workers: default_workers(),
            base_dir: base_dir.to_path_buf(),
            source_root,
            output_root,
            tools_dir: extra_dir,
            example_dir,
            developer_mode,
        })
    }

    /// True when `path` lives under the bundled example assets and developer
    /// mode shields it from idempotency skips and deletion.
    pub fn is_example_asset(&self, path: &Path) -> bool {
        self.developer_mode && path.starts_with(&self.example_dir)
    }
}
