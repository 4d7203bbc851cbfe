//! mediashrink — batch media space saver
//!
//! Converts a folder tree of photos and videos into space-saving formats
//! (HEIC for images, HEVC/H.265 MP4 for videos), preserving metadata and
//! timestamps, deleting originals only after the converted output has been
//! verified on disk. Codec work is delegated: images go through `image` +
//! libheif in process, videos through HandBrakeCLI, metadata through
//! exiftool.

pub mod classify;
pub mod config;
pub mod convert;
pub mod error;
pub mod exif;
pub mod filedate;
pub mod logging;
pub mod metadata;
pub mod orchestrator;
pub mod outcome;
pub mod report;
pub mod retry;
pub mod scheduler;
pub mod tools;

pub use classify::{classify, directory_size, MediaClass, MediaFile, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
pub use config::ConversionConfig;
pub use error::RunError;
pub use outcome::{BatchCounters, ConversionOutcome, OutcomeKind};
pub use scheduler::{run_batch, BatchReport};
