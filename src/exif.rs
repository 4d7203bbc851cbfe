//! Best-effort EXIF extraction
//!
//! Before an image is re-encoded, its raw EXIF payload is lifted so the
//! encoder can embed it in the HEIF container. Only containers that carry
//! EXIF in a directly liftable form are handled (JPEG APP1 segment, bare
//! TIFF); everything else returns `None` — exiftool copies the full tag set
//! afterwards anyway, so absence here is never an error.

use std::fs;
use std::path::Path;

use tracing::debug;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Returns the TIFF-structured EXIF payload of `path`, if one can be found.
pub fn read_exif_blob(path: &Path) -> Option<Vec<u8>> {
    let data = match fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            debug!("EXIF pre-read skipped for {}: {e}", path.display());
            return None;
        }
    };

    if data.starts_with(&[0xFF, 0xD8]) {
        return jpeg_exif_payload(&data);
    }
    // A TIFF file is itself the EXIF structure.
    if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        return Some(data);
    }
    None
}

/// Walk JPEG segments up to SOS looking for an APP1 segment with the
/// `Exif\0\0` signature; return its TIFF payload.
fn jpeg_exif_payload(data: &[u8]) -> Option<Vec<u8>> {
    let mut i = 2; // past SOI
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None; // not at a marker boundary, bail
        }
        let marker = data[i + 1];
        match marker {
            // fill bytes and standalone markers carry no length field
            0xFF => {
                i += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                i += 2;
                continue;
            }
            // start of scan: entropy-coded data follows, no EXIF past here
            0xDA => return None,
            _ => {}
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if len < 2 || i + 2 + len > data.len() {
            return None;
        }
        if marker == 0xE1 {
            let payload = &data[i + 4..i + 2 + len];
            if let Some(tiff) = payload.strip_prefix(EXIF_HEADER) {
                return Some(tiff.to_vec());
            }
        }
        i += 2 + len;
    }
    None
}
