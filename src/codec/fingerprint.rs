//! Provenance fingerprint
//!
//! A small JSON record hidden in the low-order amplitude range of channel 0.
//! The record is framed as
//!
//! ```text
//! MAGIC(4) | payload length u32 LE | payload | sha256(payload)[0..4]
//! ```
//!
//! and written two bits per sample as a quantization index. The quantization
//! step wobbles sinusoidally with sample index (period 64, ±25%) around a
//! base of 2^-16, spreading the perturbation instead of leaving a fixed grid.
//!
//! The mark only survives on the untouched float buffer; 16-bit encoding or
//! any further processing destroys it.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::engine::StereoBuffer;
use crate::error::{Result, ToneError};

/// Frame marker
const MAGIC: [u8; 4] = *b"TGFP";

/// Length field size
const LEN_BYTES: usize = 4;

/// Checksum bytes appended to the payload
const CHECKSUM_BYTES: usize = 4;

/// Largest payload accepted on extraction
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// Bits carried by one sample
const BITS_PER_SAMPLE: usize = 2;

const SAMPLES_PER_BYTE: usize = 8 / BITS_PER_SAMPLE;

/// Distinct values one sample carries
const LEVELS: f64 = (1 << BITS_PER_SAMPLE) as f64;

/// Base quantization step (2^-16)
const BASE_STEP: f64 = 1.0 / 65536.0;

/// Relative swing of the step
const STEP_DEPTH: f64 = 0.25;

/// Period of the step modulation, in samples
const STEP_PERIOD: f64 = 64.0;

/// Record format version
pub const FINGERPRINT_VERSION: &str = "1.0";

/// Provenance record embedded into an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFingerprint {
    pub id: Uuid,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: i64,
    pub signature: String,
    pub version: String,
}

impl AudioFingerprint {
    /// New record for an export described by `source`
    pub fn generate(source: &str) -> Self {
        let id = Uuid::new_v4();
        let timestamp = Utc::now().timestamp_millis();
        let digest = Sha256::digest(format!("{}:{}:{}", id, timestamp, source).as_bytes());
        let signature = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();
        Self {
            id,
            timestamp,
            signature,
            version: FINGERPRINT_VERSION.to_string(),
        }
    }

    /// Framed bytes written into the signal
    fn to_frame(&self) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(self)?;
        let mut frame = Vec::with_capacity(MAGIC.len() + LEN_BYTES + payload.len() + CHECKSUM_BYTES);
        frame.extend_from_slice(&MAGIC);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(&checksum(&payload));
        Ok(frame)
    }

    /// Channel-0 samples needed to carry this record
    pub fn required_samples(&self) -> Result<usize> {
        Ok(self.to_frame()?.len() * SAMPLES_PER_BYTE)
    }
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_BYTES] {
    let digest = Sha256::digest(payload);
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Quantization step at sample `index`
#[inline]
fn step(index: usize) -> f64 {
    BASE_STEP * (1.0 + STEP_DEPTH * (TAU * index as f64 / STEP_PERIOD).sin())
}

#[inline]
fn write_symbol(sample: f32, index: usize, symbol: u8) -> f32 {
    let q = step(index);
    let s = sample as f64;
    ((LEVELS * (s / (LEVELS * q)).floor() + symbol as f64) * q) as f32
}

#[inline]
fn read_symbol(sample: f32, index: usize) -> u8 {
    ((sample as f64 / step(index)).round() as i64).rem_euclid(LEVELS as i64) as u8
}

/// Read `count` bytes starting at byte `byte_offset` of the frame
fn read_bytes(samples: &[f32], byte_offset: usize, count: usize) -> Option<Vec<u8>> {
    let start = byte_offset * SAMPLES_PER_BYTE;
    let end = start + count * SAMPLES_PER_BYTE;
    let region = samples.get(start..end)?;
    Some(
        region
            .chunks_exact(SAMPLES_PER_BYTE)
            .enumerate()
            .map(|(b, chunk)| {
                chunk.iter().enumerate().fold(0u8, |byte, (k, &s)| {
                    (byte << BITS_PER_SAMPLE) | read_symbol(s, start + b * SAMPLES_PER_BYTE + k)
                })
            })
            .collect(),
    )
}

/// Write `fingerprint` into channel 0 of `buffer`
///
/// # Errors
/// * `FingerprintCapacity` - The buffer is shorter than `required_samples`
pub fn embed(buffer: &mut StereoBuffer, fingerprint: &AudioFingerprint) -> Result<()> {
    let frame = fingerprint.to_frame()?;
    let required = frame.len() * SAMPLES_PER_BYTE;
    let available = buffer.num_frames();
    if available < required {
        return Err(ToneError::FingerprintCapacity {
            available,
            required,
        });
    }

    let samples = buffer.channel_mut(0);
    for (b, byte) in frame.iter().enumerate() {
        for k in 0..SAMPLES_PER_BYTE {
            let index = b * SAMPLES_PER_BYTE + k;
            let shift = 8 - BITS_PER_SAMPLE * (k + 1);
            let symbol = (byte >> shift) & 0b11;
            samples[index] = write_symbol(samples[index], index, symbol);
        }
    }
    Ok(())
}

/// Recover a fingerprint from channel 0, `None` when absent or damaged
pub fn extract(buffer: &StereoBuffer) -> Option<AudioFingerprint> {
    if buffer.num_channels() == 0 {
        return None;
    }
    let samples = buffer.channel(0);

    let header = read_bytes(samples, 0, MAGIC.len() + LEN_BYTES)?;
    if header[..MAGIC.len()] != MAGIC {
        debug!("No fingerprint marker");
        return None;
    }
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if len == 0 || len > MAX_PAYLOAD_BYTES {
        debug!(len, "Fingerprint length out of range");
        return None;
    }

    let Some(body) = read_bytes(samples, header.len(), len + CHECKSUM_BYTES) else {
        debug!(len, "Fingerprint truncated");
        return None;
    };
    let (payload, stored) = body.split_at(len);
    if checksum(payload) != stored {
        debug!("Fingerprint checksum mismatch");
        return None;
    }

    match serde_json::from_slice(payload) {
        Ok(fingerprint) => Some(fingerprint),
        Err(e) => {
            debug!(error = %e, "Fingerprint payload malformed");
            None
        }
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Persistence for issued fingerprints
pub trait FingerprintStore: Send + Sync {
    fn store(&self, record: &AudioFingerprint) -> Result<()>;

    fn lookup(&self, signature: &str) -> Result<Option<AudioFingerprint>>;
}

/// Outcome of checking a buffer against a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// No readable fingerprint in the audio
    NotFound,
    /// Fingerprint present but unknown to the store (or differing from its record)
    Unregistered(AudioFingerprint),
    Verified(AudioFingerprint),
}

/// Extract and look up the fingerprint carried by `buffer`
pub fn verify(buffer: &StereoBuffer, store: &dyn FingerprintStore) -> Result<Verification> {
    let Some(fingerprint) = extract(buffer) else {
        return Ok(Verification::NotFound);
    };
    match store.lookup(&fingerprint.signature)? {
        Some(record) if record == fingerprint => Ok(Verification::Verified(fingerprint)),
        _ => Ok(Verification::Unregistered(fingerprint)),
    }
}

/// Process-local store keyed by signature
#[derive(Debug, Default)]
pub struct MemoryFingerprintStore {
    records: Mutex<HashMap<String, AudioFingerprint>>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> ToneError {
        ToneError::Collaborator {
            collaborator: "fingerprint store",
            reason: "store lock poisoned".to_string(),
        }
    }
}

impl FingerprintStore for MemoryFingerprintStore {
    fn store(&self, record: &AudioFingerprint) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| Self::poisoned())?
            .insert(record.signature.clone(), record.clone());
        Ok(())
    }

    fn lookup(&self, signature: &str) -> Result<Option<AudioFingerprint>> {
        Ok(self
            .records
            .lock()
            .map_err(|_| Self::poisoned())?
            .get(signature)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tone(frames: usize) -> StereoBuffer {
        let left: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.031).sin() * 0.4).collect();
        let right = left.clone();
        StereoBuffer::from_channels(left, right, 48000).unwrap()
    }

    #[test]
    fn test_generate_fields() {
        let fp = AudioFingerprint::generate("432Hz sine 30s");
        assert_eq!(fp.signature.len(), 32);
        assert!(fp.signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp.version, FINGERPRINT_VERSION);
        assert!(fp.timestamp > 0);
    }

    #[test]
    fn test_symbol_round_trip_signs() {
        for (i, &s) in [0.0f32, 0.5, -0.5, 0.999, -0.999, 1e-6, -1e-6].iter().enumerate() {
            for symbol in 0..4u8 {
                let written = write_symbol(s, i * 7, symbol);
                assert_eq!(read_symbol(written, i * 7), symbol);
                assert!((written - s).abs() < 5.0 * BASE_STEP as f32 * 1.25);
            }
        }
    }

    #[test]
    fn test_embed_extract_round_trip() {
        let fp = AudioFingerprint::generate("round trip");
        let mut buffer = tone(fp.required_samples().unwrap());
        embed(&mut buffer, &fp).unwrap();
        assert_eq!(extract(&buffer), Some(fp));
    }

    #[test]
    fn test_only_channel_zero_touched() {
        let fp = AudioFingerprint::generate("channels");
        let original = tone(8192);
        let mut buffer = original.clone();
        embed(&mut buffer, &fp).unwrap();
        assert_eq!(buffer.right(), original.right());
        assert_ne!(buffer.left(), original.left());
    }

    #[test]
    fn test_clean_buffer_not_found() {
        assert_eq!(extract(&tone(8192)), None);
        assert_eq!(extract(&StereoBuffer::new(8192, 48000)), None);
        assert_eq!(extract(&StereoBuffer::new(3, 48000)), None);
    }

    #[test]
    fn test_capacity_error() {
        let fp = AudioFingerprint::generate("short");
        let mut buffer = tone(16);
        assert!(matches!(
            embed(&mut buffer, &fp),
            Err(ToneError::FingerprintCapacity { available: 16, .. })
        ));
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let fp = AudioFingerprint::generate("corrupt");
        let mut buffer = tone(8192);
        embed(&mut buffer, &fp).unwrap();
        // flip a payload symbol
        let index = 12 * SAMPLES_PER_BYTE;
        let samples = buffer.channel_mut(0);
        let symbol = read_symbol(samples[index], index);
        samples[index] = write_symbol(samples[index], index, (symbol + 1) % 4);
        assert_eq!(extract(&buffer), None);
    }

    #[test]
    fn test_verify_against_store() {
        let store = MemoryFingerprintStore::new();
        let fp = AudioFingerprint::generate("verify");
        let mut buffer = tone(8192);

        assert_eq!(verify(&buffer, &store).unwrap(), Verification::NotFound);

        embed(&mut buffer, &fp).unwrap();
        assert_eq!(
            verify(&buffer, &store).unwrap(),
            Verification::Unregistered(fp.clone())
        );

        store.store(&fp).unwrap();
        assert_eq!(verify(&buffer, &store).unwrap(), Verification::Verified(fp));
    }
}
