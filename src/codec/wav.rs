//! WAV encoding
//!
//! Float channel buffers to canonical 16-bit PCM RIFF/WAVE bytes (44-byte
//! header, interleaved little-endian samples), plus the headerless variant
//! and a reader for inspecting encoded output.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{Result, ToneError};

/// Canonical PCM header size in bytes
pub const WAV_HEADER_LEN: usize = 44;

/// Bytes per encoded sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Float sample to 16-bit with asymmetric scaling: negatives by 32768, positives by 32767
#[inline]
pub fn float_to_pcm16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Inverse of `float_to_pcm16`
#[inline]
pub fn pcm16_to_float(sample: i16) -> f32 {
    if sample < 0 {
        sample as f32 / 32768.0
    } else {
        sample as f32 / 32767.0
    }
}

/// Check channel count and equal lengths; returns frames per channel
fn check_channels(channels: &[Vec<f32>]) -> Result<usize> {
    if channels.is_empty() || channels.len() > 2 {
        return Err(ToneError::UnsupportedChannelCount {
            count: channels.len(),
        });
    }
    let frames = channels[0].len();
    if channels.iter().any(|c| c.len() != frames) {
        return Err(ToneError::BufferLengthMismatch {
            lengths: channels.iter().map(Vec::len).collect(),
        });
    }
    Ok(frames)
}

fn hound_error(e: hound::Error) -> ToneError {
    ToneError::Encode {
        reason: e.to_string(),
    }
}

/// Encode one or two equal-length float channels as a 16-bit PCM WAV file
///
/// # Arguments
/// * `channels` - Mono or stereo sample data in -1.0..=1.0; values outside are clamped
/// * `sample_rate` - Rate written into the header
///
/// # Errors
/// * `UnsupportedChannelCount` - No channels or more than two
/// * `BufferLengthMismatch` - Channels differ in length
pub fn encode_wav(channels: &[Vec<f32>], sample_rate: u32) -> Result<Vec<u8>> {
    let frames = check_channels(channels)?;

    let spec = WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let capacity = WAV_HEADER_LEN + frames * channels.len() * BYTES_PER_SAMPLE;
    let mut cursor = Cursor::new(Vec::with_capacity(capacity));
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(hound_error)?;
        let mut samples = writer.get_i16_writer((frames * channels.len()) as u32);
        for i in 0..frames {
            for channel in channels {
                samples.write_sample(float_to_pcm16(channel[i]));
            }
        }
        samples.flush().map_err(hound_error)?;
        writer.finalize().map_err(hound_error)?;
    }

    Ok(cursor.into_inner())
}

/// Interleaved little-endian 16-bit PCM without a header
pub fn encode_pcm16(channels: &[Vec<f32>]) -> Result<Vec<u8>> {
    let frames = check_channels(channels)?;
    let mut out = Vec::with_capacity(frames * channels.len() * BYTES_PER_SAMPLE);
    for i in 0..frames {
        for channel in channels {
            out.extend_from_slice(&float_to_pcm16(channel[i]).to_le_bytes());
        }
    }
    Ok(out)
}

/// Float channels read back from WAV bytes
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWav {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedWav {
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }
}

/// Decode 16-bit integer or 32-bit float WAV bytes into de-interleaved channels
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedWav> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(|e| ToneError::InvalidWav {
        reason: e.to_string(),
    })?;
    let spec = reader.spec();
    let num_channels = spec.channels as usize;
    if num_channels == 0 {
        return Err(ToneError::InvalidWav {
            reason: "zero channels".to_string(),
        });
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(pcm16_to_float))
            .collect::<std::result::Result<_, _>>(),
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>(),
        (format, bits) => {
            return Err(ToneError::InvalidWav {
                reason: format!("unsupported sample format {:?} at {} bits", format, bits),
            })
        }
    }
    .map_err(|e| ToneError::InvalidWav {
        reason: e.to_string(),
    })?;

    let mut channels = vec![Vec::with_capacity(interleaved.len() / num_channels); num_channels];
    for frame in interleaved.chunks_exact(num_channels) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    Ok(DecodedWav {
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        channels,
    })
}

/// Data chunk size recorded in a canonical header
pub fn data_size(bytes: &[u8]) -> Option<u32> {
    header_u32(bytes, 40)
}

/// RIFF chunk size recorded in a canonical header
pub fn riff_chunk_size(bytes: &[u8]) -> Option<u32> {
    header_u32(bytes, 4)
}

fn header_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let field = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test_case(1.0, 32767 ; "full scale positive")]
    #[test_case(-1.0, -32768 ; "full scale negative")]
    #[test_case(2.0, 32767 ; "clamped positive")]
    #[test_case(-3.0, -32768 ; "clamped negative")]
    #[test_case(0.0, 0 ; "zero")]
    #[test_case(0.5, 16383 ; "half positive")]
    #[test_case(-0.5, -16384 ; "half negative")]
    fn test_float_to_pcm16(input: f32, expected: i16) {
        assert_eq!(float_to_pcm16(input), expected);
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_wav(&[vec![0.0; 100], vec![0.0; 100]], 48000).unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_LEN + 400);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        // PCM format tag
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2);
        assert_eq!(header_u32(&bytes, 24), Some(48000));
        // byte rate and block align
        assert_eq!(header_u32(&bytes, 28), Some(48000 * 4));
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 4);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(data_size(&bytes), Some(400));
        assert_eq!(riff_chunk_size(&bytes), Some(36 + 400));
    }

    #[test]
    fn test_samples_interleaved_little_endian() {
        let bytes = encode_wav(&[vec![1.0], vec![-1.0]], 8000).unwrap();
        assert_eq!(&bytes[44..46], &32767i16.to_le_bytes());
        assert_eq!(&bytes[46..48], &(-32768i16).to_le_bytes());
    }

    #[test]
    fn test_mono_supported() {
        let bytes = encode_wav(&[vec![0.25; 10]], 44100).unwrap();
        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.num_channels(), 1);
        assert_eq!(decoded.num_frames(), 10);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = encode_wav(&[vec![0.0; 10], vec![0.0; 11]], 48000);
        assert!(matches!(
            result,
            Err(ToneError::BufferLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_channel_count_rejected() {
        assert!(matches!(
            encode_wav(&[], 48000),
            Err(ToneError::UnsupportedChannelCount { count: 0 })
        ));
        let three = vec![vec![0.0; 4]; 3];
        assert!(matches!(
            encode_wav(&three, 48000),
            Err(ToneError::UnsupportedChannelCount { count: 3 })
        ));
    }

    #[test]
    fn test_decode_within_quantization() {
        let left: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin() * 0.9).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let bytes = encode_wav(&[left.clone(), right.clone()], 22050).unwrap();

        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.bits_per_sample, 16);
        for (a, b) in left.iter().zip(&decoded.channels[0]) {
            assert_abs_diff_eq!(a, b, epsilon = 1.0 / 32767.0);
        }
        for (a, b) in right.iter().zip(&decoded.channels[1]) {
            assert_abs_diff_eq!(a, b, epsilon = 1.0 / 32767.0);
        }
    }

    #[test]
    fn test_pcm16_matches_wav_body() {
        let channels = vec![vec![0.1, -0.2, 0.3], vec![-0.4, 0.5, -0.6]];
        let wav = encode_wav(&channels, 48000).unwrap();
        let pcm = encode_pcm16(&channels).unwrap();
        assert_eq!(&wav[WAV_HEADER_LEN..], pcm.as_slice());
    }

    #[test]
    fn test_decode_garbage_is_error() {
        assert!(matches!(
            decode_wav(b"not a wav file"),
            Err(ToneError::InvalidWav { .. })
        ));
    }
}
