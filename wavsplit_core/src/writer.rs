//! WAV header emission and normalized sample writing.

use std::io::Write;

use log::warn;

use crate::error::WavSplitError;
use crate::format::{FormatDescriptor, FMT_CHUNK_LEN};
use crate::transcode::SampleEncoding;

/// A sink that has received a complete WAV header and accepts the sample payload.
///
/// The writer does not enforce the declared `data` size; [`WavWriter::finish`]
/// only logs a mismatch.
#[derive(Debug)]
pub struct WavWriter<W: Write> {
    sink: W,
    format: FormatDescriptor,
    encoding: SampleEncoding,
    declared_bytes: u64,
    written_bytes: u64,
    scratch: Vec<u8>,
}

/// Write a 44-byte WAV header for `total_frames` frames and return the bound writer.
pub fn open_writer<W: Write>(
    mut sink: W,
    total_frames: u32,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
) -> Result<WavWriter<W>, WavSplitError> {
    let format = FormatDescriptor::for_output(channels, sample_rate, bits_per_sample)?;
    let encoding = SampleEncoding::for_format(&format)?;

    let data_size = total_frames
        .checked_mul(u32::from(format.block_align))
        .ok_or_else(|| {
            WavSplitError::InvalidArgument(format!(
                "{total_frames} frames exceed the 4 GiB data chunk limit"
            ))
        })?;
    let riff_size = data_size
        .checked_add((4 + 8 + FMT_CHUNK_LEN + 8) as u32)
        .ok_or_else(|| {
            WavSplitError::InvalidArgument(format!(
                "{total_frames} frames exceed the 4 GiB RIFF limit"
            ))
        })?;

    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&riff_size.to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&(FMT_CHUNK_LEN as u32).to_le_bytes());
    header.extend_from_slice(&format.to_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_size.to_le_bytes());
    sink.write_all(&header)?;

    Ok(WavWriter {
        sink,
        format,
        encoding,
        declared_bytes: u64::from(data_size),
        written_bytes: 0,
        scratch: Vec::new(),
    })
}

impl<W: Write> WavWriter<W> {
    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    /// Payload bytes the header promised.
    pub fn declared_bytes(&self) -> u64 {
        self.declared_bytes
    }

    pub fn written_bytes(&self) -> u64 {
        self.written_bytes
    }

    /// Encode normalized samples in the writer's format and append them.
    pub fn write_normalized_samples(&mut self, samples: &[f64]) -> Result<(), WavSplitError> {
        self.scratch.clear();
        self.encoding.encode_into(samples, &mut self.scratch);
        self.sink.write_all(&self.scratch)?;
        self.written_bytes += self.scratch.len() as u64;
        Ok(())
    }

    /// Append `count` zero-valued samples.
    pub fn write_silence(&mut self, count: usize) -> Result<(), WavSplitError> {
        const BLOCK: usize = 4096;
        let zeros = [0.0f64; BLOCK];
        let mut left = count;
        while left > 0 {
            let n = left.min(BLOCK);
            self.write_normalized_samples(&zeros[..n])?;
            left -= n;
        }
        Ok(())
    }

    /// Flush and hand back the sink.
    pub fn finish(mut self) -> Result<W, WavSplitError> {
        self.sink.flush()?;
        if self.written_bytes != self.declared_bytes {
            warn!(
                "data chunk declares {} bytes but {} were written",
                self.declared_bytes, self.written_bytes
            );
        }
        Ok(self.sink)
    }
}

/// Write `samples` through `writer`.
pub fn write_normalized_samples<W: Write>(
    writer: &mut WavWriter<W>,
    samples: &[f64],
) -> Result<(), WavSplitError> {
    writer.write_normalized_samples(samples)
}
