//! The `fmt ` chunk: audio format tags and the 16-byte format descriptor.

use std::fmt;

use crate::error::WavSplitError;

/// Size in bytes of the canonical `fmt ` chunk payload.
pub const FMT_CHUNK_LEN: usize = 16;

/// Audio format tags accepted in the `fmt ` chunk.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FormatTag {
    /// Integer PCM (`1`).
    Pcm,
    /// IEEE floating point (`3`).
    IeeeFloat,
    /// WAVE_FORMAT_EXTENSIBLE (`0xFFFE`), read as signed 32-bit little-endian PCM.
    ///
    /// Transcoders such as `ffmpeg -c:a pcm_s32le` emit this tag without the
    /// extension block the full format would carry.
    Extensible,
}

impl FormatTag {
    pub fn code(self) -> u16 {
        match self {
            FormatTag::Pcm => 1,
            FormatTag::IeeeFloat => 3,
            FormatTag::Extensible => 0xFFFE,
        }
    }
}

impl TryFrom<u16> for FormatTag {
    type Error = WavSplitError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FormatTag::Pcm),
            3 => Ok(FormatTag::IeeeFloat),
            0xFFFE => Ok(FormatTag::Extensible),
            other => Err(WavSplitError::UnsupportedFormat(format!(
                "unknown audio format tag {other:#06x}"
            ))),
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatTag::Pcm => write!(f, "PCM"),
            FormatTag::IeeeFloat => write!(f, "IEEE float"),
            FormatTag::Extensible => write!(f, "extensible PCM"),
        }
    }
}

/// Decoded contents of a `fmt ` chunk.
///
/// `byte_rate` and `block_align` are kept as read from disk; descriptors
/// built through [`FormatDescriptor::for_output`] always satisfy
/// `byte_rate = sample_rate * block_align` and
/// `block_align = channels * bits_per_sample / 8`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub audio_format: FormatTag,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FormatDescriptor {
    /// Derive the descriptor used for written files.
    ///
    /// Depths up to 16 bits are tagged as PCM, anything wider as IEEE float.
    pub fn for_output(
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
    ) -> Result<Self, WavSplitError> {
        if channels == 0 {
            return Err(WavSplitError::InvalidArgument(
                "channel count must be greater than zero".into(),
            ));
        }
        if bits_per_sample == 0 || bits_per_sample % 8 != 0 {
            return Err(WavSplitError::UnsupportedFormat(format!(
                "bits per sample must be a positive multiple of 8, got {bits_per_sample}"
            )));
        }

        let audio_format = if bits_per_sample <= 16 {
            FormatTag::Pcm
        } else {
            FormatTag::IeeeFloat
        };
        let block_align = u32::from(channels) * u32::from(bits_per_sample) / 8;
        let block_align = u16::try_from(block_align).map_err(|_| {
            WavSplitError::InvalidArgument(format!(
                "block align of {block_align} bytes does not fit the fmt chunk"
            ))
        })?;
        let byte_rate = sample_rate
            .checked_mul(u32::from(block_align))
            .ok_or_else(|| {
                WavSplitError::InvalidArgument(format!(
                    "byte rate overflows for {sample_rate} Hz x {block_align} bytes"
                ))
            })?;

        Ok(Self {
            audio_format,
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
        })
    }

    /// Parse the first 16 bytes of a `fmt ` chunk payload.
    pub fn from_bytes(bytes: &[u8; FMT_CHUNK_LEN]) -> Result<Self, WavSplitError> {
        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };

        Ok(Self {
            audio_format: FormatTag::try_from(u16_at(0))?,
            channels: u16_at(2),
            sample_rate: u32_at(4),
            byte_rate: u32_at(8),
            block_align: u16_at(12),
            bits_per_sample: u16_at(14),
        })
    }

    /// Serialise to the packed little-endian `fmt ` payload.
    pub fn to_bytes(&self) -> [u8; FMT_CHUNK_LEN] {
        let mut out = [0u8; FMT_CHUNK_LEN];
        out[0..2].copy_from_slice(&self.audio_format.code().to_le_bytes());
        out[2..4].copy_from_slice(&self.channels.to_le_bytes());
        out[4..8].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[8..12].copy_from_slice(&self.byte_rate.to_le_bytes());
        out[12..14].copy_from_slice(&self.block_align.to_le_bytes());
        out[14..16].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out
    }

    /// Bytes occupied by one interleaved sample of one channel.
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample / 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_descriptor_picks_tag_by_depth() {
        let pcm = FormatDescriptor::for_output(2, 44_100, 16).unwrap();
        assert_eq!(pcm.audio_format, FormatTag::Pcm);
        assert_eq!(pcm.block_align, 4);
        assert_eq!(pcm.byte_rate, 176_400);

        let float = FormatDescriptor::for_output(1, 48_000, 32).unwrap();
        assert_eq!(float.audio_format, FormatTag::IeeeFloat);
        assert_eq!(float.block_align, 4);
        assert_eq!(float.byte_rate, 192_000);
    }

    #[test]
    fn descriptor_survives_serialisation() {
        for (channels, rate, bits) in [(1, 8_000, 8), (2, 44_100, 16), (6, 96_000, 32)] {
            let format = FormatDescriptor::for_output(channels, rate, bits).unwrap();
            let parsed = FormatDescriptor::from_bytes(&format.to_bytes()).unwrap();
            assert_eq!(parsed, format);
        }
    }

    #[test]
    fn extensible_tag_is_recognised() {
        let mut bytes = FormatDescriptor::for_output(1, 48_000, 32)
            .unwrap()
            .to_bytes();
        bytes[0..2].copy_from_slice(&0xFFFEu16.to_le_bytes());
        let parsed = FormatDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.audio_format, FormatTag::Extensible);
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let mut bytes = FormatDescriptor::for_output(1, 8_000, 16).unwrap().to_bytes();
        bytes[0..2].copy_from_slice(&2u16.to_le_bytes());
        assert!(matches!(
            FormatDescriptor::from_bytes(&bytes),
            Err(WavSplitError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn rejects_zero_channels_and_odd_depths() {
        assert!(matches!(
            FormatDescriptor::for_output(0, 8_000, 16),
            Err(WavSplitError::InvalidArgument(_))
        ));
        assert!(matches!(
            FormatDescriptor::for_output(1, 8_000, 12),
            Err(WavSplitError::UnsupportedFormat(_))
        ));
    }
}
