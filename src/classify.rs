//! Source tree classification
//!
//! Walks the source root once, bucketing every regular file by extension into
//! image / video / unsupported and recording its size. Symlinks are neither
//! followed nor counted, which also rules out traversal loops. A file whose
//! size cannot be read is reported and dropped from the batch; it never
//! aborts the walk.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Extensions converted to HEIC.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "tiff", "tif", "gif", "heic", "heif",
];

/// Extensions transcoded to HEVC in MP4.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "flv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Image,
    Video,
    Unsupported,
}

/// One file discovered under the source root. Immutable after creation;
/// consumed exactly once by the orchestrator.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    /// Path relative to the source root, used to mirror the tree layout
    /// into the output root.
    pub relative: PathBuf,
    pub size: u64,
    pub class: MediaClass,
}

impl MediaFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Case-insensitive extension lookup against the two fixed sets.
pub fn media_class_for(path: &Path) -> MediaClass {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return MediaClass::Unsupported;
    };
    let ext = ext.to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaClass::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaClass::Video
    } else {
        MediaClass::Unsupported
    }
}

/// Recursively classify every regular file under `source_root`.
pub fn classify(source_root: &Path) -> Vec<MediaFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source_root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                warn!("⚠️ cannot read size of {}: {e}", path.display());
                continue;
            }
        };
        let relative = path
            .strip_prefix(source_root)
            .unwrap_or(path)
            .to_path_buf();
        files.push(MediaFile {
            path: path.to_path_buf(),
            relative,
            size,
            class: media_class_for(path),
        });
    }

    files
}

/// Total byte size of every regular file under `root`, unsupported files
/// included, symlinks excluded. Missing root counts as zero.
pub fn directory_size(root: &Path) -> u64 {
    if !root.exists() {
        return 0;
    }
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}
