//! Export results

use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::WAV_HEADER_LEN;
use crate::error::{Result, ToneError};

/// Downloadable output of one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    /// The whole duration as one WAV file
    Single(Vec<u8>),
    /// Uncompressed zip of `part01.wav`, `part02.wav`, ...
    Archive(Vec<u8>),
    /// Separate WAV files in timeline order; the caller delivers each
    Parts(Vec<Vec<u8>>),
}

impl ExportArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ExportArtifact::Single(_) => "single",
            ExportArtifact::Archive(_) => "archive",
            ExportArtifact::Parts(_) => "parts",
        }
    }

    /// Number of files the user ends up with once unpacked
    pub fn file_count(&self) -> usize {
        match self {
            ExportArtifact::Single(_) | ExportArtifact::Archive(_) => 1,
            ExportArtifact::Parts(parts) => parts.len(),
        }
    }

    pub fn total_bytes(&self) -> usize {
        match self {
            ExportArtifact::Single(bytes) | ExportArtifact::Archive(bytes) => bytes.len(),
            ExportArtifact::Parts(parts) => parts.iter().map(Vec::len).sum(),
        }
    }

    /// Reject artifacts that carry no audio
    ///
    /// # Errors
    /// * `EmptyOutput` - An empty archive, a part list with no parts, or a
    ///   WAV file with nothing after its header; `part` is 1-based
    pub fn ensure_audio(&self) -> Result<()> {
        match self {
            ExportArtifact::Single(bytes) if bytes.len() <= WAV_HEADER_LEN => {
                Err(ToneError::EmptyOutput { part: 1 })
            }
            ExportArtifact::Archive(bytes) if bytes.is_empty() => {
                Err(ToneError::EmptyOutput { part: 1 })
            }
            ExportArtifact::Parts(parts) if parts.is_empty() => {
                Err(ToneError::EmptyOutput { part: 1 })
            }
            ExportArtifact::Parts(parts) => {
                match parts.iter().position(|p| p.len() <= WAV_HEADER_LEN) {
                    Some(i) => Err(ToneError::EmptyOutput { part: i + 1 }),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Write the artifact into `dir` using `stem` as the base file name
    ///
    /// # Returns
    /// Paths written, in timeline order
    pub fn write_to(&self, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let written = match self {
            ExportArtifact::Single(bytes) => {
                let path = dir.join(format!("{}.wav", stem));
                fs::write(&path, bytes)?;
                vec![path]
            }
            ExportArtifact::Archive(bytes) => {
                let path = dir.join(format!("{}.zip", stem));
                fs::write(&path, bytes)?;
                vec![path]
            }
            ExportArtifact::Parts(parts) => {
                let mut paths = Vec::with_capacity(parts.len());
                for (i, bytes) in parts.iter().enumerate() {
                    let path = dir.join(format!("{}-{}", stem, part_name(i)));
                    fs::write(&path, bytes)?;
                    paths.push(path);
                }
                paths
            }
        };
        Ok(written)
    }
}

/// File name of the 0-based part `index`: `part01.wav`, `part02.wav`, ...
pub fn part_name(index: usize) -> String {
    format!("part{:02}.wav", index + 1)
}
