//! Conversion between on-disk sample encodings and normalized `f64` samples.
//!
//! Signed formats scale by `2^(bits-1)` in both directions, so the largest
//! positive integer maps just below `1.0`. Writing performs no clamping:
//! products outside the target range wrap at the target integer width.

use crate::error::WavSplitError;
use crate::format::{FormatDescriptor, FormatTag};

const U8_SCALE: f64 = 255.0;
const I16_SCALE: f64 = 32_768.0;
const I32_SCALE: f64 = 2_147_483_648.0;

/// The closed set of sample encodings, keyed by `(audio format tag, bits per sample)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Unsigned 8-bit PCM.
    U8,
    /// Signed 16-bit PCM.
    I16,
    /// Signed 32-bit PCM, either tagged PCM or extensible.
    I32,
    /// IEEE float32, already normalized.
    F32,
}

impl SampleEncoding {
    pub fn for_format(format: &FormatDescriptor) -> Result<Self, WavSplitError> {
        match (format.audio_format, format.bits_per_sample) {
            (FormatTag::Pcm, 8) => Ok(SampleEncoding::U8),
            (FormatTag::Pcm, 16) => Ok(SampleEncoding::I16),
            (FormatTag::Pcm, 32) | (FormatTag::Extensible, 32) => Ok(SampleEncoding::I32),
            (FormatTag::IeeeFloat, 32) => Ok(SampleEncoding::F32),
            (tag, bits) => Err(WavSplitError::UnsupportedFormat(format!(
                "{bits} bits per sample is not supported for {tag}"
            ))),
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::U8 => 1,
            SampleEncoding::I16 => 2,
            SampleEncoding::I32 | SampleEncoding::F32 => 4,
        }
    }

    /// Decode little-endian raw samples, appending normalized values to `out`.
    ///
    /// A trailing partial sample in `bytes` is ignored.
    pub fn decode_into(self, bytes: &[u8], out: &mut Vec<f64>) {
        out.reserve(bytes.len() / self.bytes_per_sample());
        match self {
            SampleEncoding::U8 => {
                out.extend(bytes.iter().map(|&v| f64::from(v) / U8_SCALE));
            }
            SampleEncoding::I16 => out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|b| f64::from(i16::from_le_bytes([b[0], b[1]])) / I16_SCALE),
            ),
            SampleEncoding::I32 => out.extend(bytes.chunks_exact(4).map(|b| {
                f64::from(i32::from_le_bytes([b[0], b[1], b[2], b[3]])) / I32_SCALE
            })),
            SampleEncoding::F32 => out.extend(
                bytes
                    .chunks_exact(4)
                    .map(|b| f64::from(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))),
            ),
        }
    }

    /// Encode normalized samples as little-endian raw samples, appending to `out`.
    pub fn encode_into(self, samples: &[f64], out: &mut Vec<u8>) {
        out.reserve(samples.len() * self.bytes_per_sample());
        match self {
            SampleEncoding::U8 => {
                out.extend(samples.iter().map(|&v| (v * U8_SCALE) as i64 as u8));
            }
            SampleEncoding::I16 => {
                for &v in samples {
                    out.extend_from_slice(&((v * I16_SCALE) as i64 as i16).to_le_bytes());
                }
            }
            SampleEncoding::I32 => {
                for &v in samples {
                    out.extend_from_slice(&((v * I32_SCALE) as i64 as i32).to_le_bytes());
                }
            }
            SampleEncoding::F32 => {
                for &v in samples {
                    out.extend_from_slice(&(v as f32).to_le_bytes());
                }
            }
        }
    }
}
