//! Multi-part packaging
//!
//! Parts are stored without compression; PCM barely compresses and the
//! archive is only a delivery container.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::artifact::part_name;
use crate::error::{Result, ToneError};

fn archive_error(e: impl std::fmt::Display) -> ToneError {
    ToneError::Archive {
        reason: e.to_string(),
    }
}

/// Upper bound on per-entry header bytes (local and central headers with
/// zip64 extras), excluding the file name
const ENTRY_OVERHEAD: u64 = 128;

/// Upper bound on the end-of-archive records
const TRAILER_OVERHEAD: u64 = 128;

/// Size `package_parts` would produce, never less than the real archive
///
/// Lets callers reject an oversized archive before building it.
pub fn estimated_archive_size(parts: &[Vec<u8>]) -> u64 {
    let entries: u64 = parts
        .iter()
        .enumerate()
        .map(|(i, part)| part.len() as u64 + ENTRY_OVERHEAD + 2 * part_name(i).len() as u64)
        .sum();
    entries + TRAILER_OVERHEAD
}

/// Pack encoded parts into one stored zip, entries named `part01.wav` onward
pub fn package_parts(parts: &[Vec<u8>]) -> Result<Vec<u8>> {
    if parts.is_empty() {
        return Err(ToneError::Archive {
            reason: "no parts to package".to_string(),
        });
    }

    let capacity = estimated_archive_size(parts) as usize;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(capacity)));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(parts.iter().any(|p| p.len() as u64 >= u32::MAX as u64));

    for (i, part) in parts.iter().enumerate() {
        writer.start_file(part_name(i), options).map_err(archive_error)?;
        writer.write_all(part).map_err(archive_error)?;
    }

    let cursor = writer.finish().map_err(archive_error)?;
    Ok(cursor.into_inner())
}
