//! Conversion adapters
//!
//! Two adapters with the same contract: given an input path, an output path
//! and the configured quality knobs, produce the encoded output and answer
//! `true`/`false`. `false` means "the tool reported failure" — the detail is
//! logged here, never raised; the orchestrator decides what a failure means
//! for the file.

pub mod image;
pub mod video;

pub use image::convert_image_to_heic;
pub use video::convert_video_to_hevc;
