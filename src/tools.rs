//! External tool discovery and PATH bracket
//!
//! The video transcoder and the metadata copier may live in the run's
//! `extra/` directory instead of on the system PATH. The guard below
//! prepends that directory for exactly the lifetime of the run and restores
//! the previous value on every exit path, so no ambient mutation leaks past
//! the batch.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::RunError;

/// Video transcoder binary (HEVC encode, keeps all audio/subtitle tracks).
pub const VIDEO_TOOL: &str = "HandBrakeCLI";
/// Metadata copy binary (tag transfer + timestamp override).
pub const METADATA_TOOL: &str = "exiftool";

pub fn is_tool_available(tool: &str) -> bool {
    which::which(tool).is_ok()
}

/// Verify both required tools resolve before any file is touched.
pub fn ensure_tools(tools_dir: &Path) -> Result<(), RunError> {
    for tool in [VIDEO_TOOL, METADATA_TOOL] {
        if !is_tool_available(tool) {
            return Err(RunError::ToolMissing {
                tool,
                searched: tools_dir.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// RAII bracket that prepends a directory to PATH and restores the saved
/// value on drop.
pub struct ToolPathGuard {
    saved: Option<OsString>,
}

impl ToolPathGuard {
    pub fn extend(dir: &Path) -> Self {
        let saved = env::var_os("PATH");
        let mut paths: Vec<PathBuf> = vec![dir.to_path_buf()];
        if let Some(old) = &saved {
            paths.extend(env::split_paths(old));
        }
        match env::join_paths(paths) {
            Ok(joined) => {
                env::set_var("PATH", &joined);
                debug!("🔧 PATH extended with {}", dir.display());
            }
            Err(e) => warn!("⚠️ could not extend PATH with {}: {e}", dir.display()),
        }
        Self { saved }
    }
}

impl Drop for ToolPathGuard {
    fn drop(&mut self) {
        match &self.saved {
            Some(value) => env::set_var("PATH", value),
            None => env::remove_var("PATH"),
        }
    }
}
