//! Image → HEIC adapter
//!
//! Decodes with the `image` crate (HEIC/HEIF inputs go through libheif,
//! which `image` cannot read), normalizes the color representation, then
//! encodes HEVC-in-HEIF via libheif at the configured lossy quality,
//! embedding the original EXIF payload when the caller extracted one.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use libheif_rs::{
    Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image as HeifImage,
    LibHeif, RgbChroma,
};
use tracing::{debug, warn};

/// Returns `false` on any failure; the cause is logged, not raised.
pub fn convert_image_to_heic(input: &Path, output: &Path, quality: u8, exif: Option<&[u8]>) -> bool {
    match encode(input, output, quality, exif) {
        Ok(()) => {
            debug!("image {} encoded to {}", input.display(), output.display());
            true
        }
        Err(e) => {
            warn!("❌ image conversion failed for {}: {e:#}", input.display());
            false
        }
    }
}

/// Whether libheif can hand out an HEVC encoder at runtime. Used by tests to
/// skip cleanly on hosts whose libheif was built without x265.
pub fn heic_encoder_available() -> bool {
    LibHeif::new()
        .encoder_for_format(CompressionFormat::Hevc)
        .is_ok()
}

fn encode(input: &Path, output: &Path, quality: u8, exif: Option<&[u8]>) -> Result<()> {
    let decoded = decode(input)?;
    let heif_image = to_heif_image(&normalize_color_mode(decoded))?;

    let lib_heif = LibHeif::new();
    let mut encoder = lib_heif
        .encoder_for_format(CompressionFormat::Hevc)
        .map_err(|e| anyhow!("no HEVC encoder available: {e}"))?;
    encoder
        .set_quality(EncoderQuality::Lossy(quality))
        .map_err(|e| anyhow!("cannot set encoder quality {quality}: {e}"))?;

    let mut context = HeifContext::new().map_err(|e| anyhow!("heif context: {e}"))?;
    let handle = context
        .encode_image(&heif_image, &mut encoder, None)
        .map_err(|e| anyhow!("HEVC encode failed: {e}"))?;

    if let Some(exif) = exif {
        // Losing EXIF is not worth losing the conversion; exiftool runs later.
        if let Err(e) = context.add_exif_metadata(&handle, exif) {
            warn!("⚠️ could not embed EXIF into {}: {e}", output.display());
        }
    }

    context
        .write_to_file(output.to_string_lossy().as_ref())
        .map_err(|e| anyhow!("cannot write {}: {e}", output.display()))?;
    Ok(())
}

fn decode(input: &Path) -> Result<DynamicImage> {
    if is_heif_container(input) {
        decode_heif(input)
    } else {
        image::open(input).with_context(|| format!("failed to decode {}", input.display()))
    }
}

fn is_heif_container(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "heic" | "heif"))
        .unwrap_or(false)
}

fn decode_heif(path: &Path) -> Result<DynamicImage> {
    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(path.to_string_lossy().as_ref())
        .map_err(|e| anyhow!("failed to read HEIF {}: {e}", path.display()))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| anyhow!("no primary image in {}: {e}", path.display()))?;
    let width = handle.width();
    let height = handle.height();

    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| anyhow!("failed to decode HEIF {}: {e}", path.display()))?;
    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| anyhow!("no interleaved RGB plane in {}", path.display()))?;

    // Rows are stride-padded; rebuild a tight RGB buffer.
    let row_bytes = width as usize * 3;
    let mut buf = Vec::with_capacity(row_bytes * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        buf.extend_from_slice(&row[..row_bytes]);
    }

    image::RgbImage::from_raw(width, height, buf)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| anyhow!("decoded HEIF buffer mismatch for {}", path.display()))
}

/// Rgb8 / Rgba8 / Luma8 pass through untouched; every other representation
/// (expanded palettes, 16-bit, float) is flattened to Rgb8.
fn normalize_color_mode(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) | DynamicImage::ImageLuma8(_) => {
            img
        }
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn to_heif_image(img: &DynamicImage) -> Result<HeifImage> {
    match img {
        DynamicImage::ImageRgb8(rgb) => {
            interleaved(rgb.width(), rgb.height(), RgbChroma::Rgb, 3, rgb.as_raw())
        }
        DynamicImage::ImageRgba8(rgba) => interleaved(
            rgba.width(),
            rgba.height(),
            RgbChroma::Rgba,
            4,
            rgba.as_raw(),
        ),
        DynamicImage::ImageLuma8(gray) => monochrome(gray.width(), gray.height(), gray.as_raw()),
        other => {
            let rgb = other.to_rgb8();
            interleaved(rgb.width(), rgb.height(), RgbChroma::Rgb, 3, rgb.as_raw())
        }
    }
}

fn interleaved(
    width: u32,
    height: u32,
    chroma: RgbChroma,
    bytes_per_pixel: usize,
    pixels: &[u8],
) -> Result<HeifImage> {
    let mut image = HeifImage::new(width, height, ColorSpace::Rgb(chroma))
        .map_err(|e| anyhow!("heif image alloc: {e}"))?;
    image
        .create_plane(Channel::Interleaved, width, height, 8)
        .map_err(|e| anyhow!("heif plane alloc: {e}"))?;

    {
        let planes = image.planes_mut();
        let plane = planes
            .interleaved
            .ok_or_else(|| anyhow!("interleaved plane missing after creation"))?;
        let row_bytes = width as usize * bytes_per_pixel;
        for (y, row) in pixels.chunks_exact(row_bytes).enumerate() {
            let start = y * plane.stride;
            plane.data[start..start + row_bytes].copy_from_slice(row);
        }
    }
    Ok(image)
}

fn monochrome(width: u32, height: u32, pixels: &[u8]) -> Result<HeifImage> {
    let mut image = HeifImage::new(width, height, ColorSpace::Monochrome)
        .map_err(|e| anyhow!("heif image alloc: {e}"))?;
    image
        .create_plane(Channel::Y, width, height, 8)
        .map_err(|e| anyhow!("heif plane alloc: {e}"))?;

    {
        let planes = image.planes_mut();
        let plane = planes
            .y
            .ok_or_else(|| anyhow!("luma plane missing after creation"))?;
        let row_bytes = width as usize;
        for (y, row) in pixels.chunks_exact(row_bytes).enumerate() {
            let start = y * plane.stride;
            plane.data[start..start + row_bytes].copy_from_slice(row);
        }
    }
    Ok(image)
}
