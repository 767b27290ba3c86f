//! Copying a time range of one WAV file into a new file.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use log::info;

use crate::config::DEFAULT_BUFFER_SIZE_SAMPLES;
use crate::error::WavSplitError;
use crate::reader::{open_wav, DecodedStream};
use crate::writer::{open_writer, WavWriter};

/// How a body copy ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyCopy {
    Complete,
    /// The source was already exhausted; nothing was copied.
    EndOfStream,
}

/// Stream `count` samples from `stream` into `writer`, `chunk` samples at a time.
///
/// Running dry after some samples were copied is a truncation, never a clean end.
pub(crate) fn copy_samples<R: Read, W: Write>(
    stream: &mut DecodedStream<R>,
    writer: &mut WavWriter<W>,
    count: u64,
    chunk: usize,
) -> Result<BodyCopy, WavSplitError> {
    let sample_bytes = stream.format().bytes_per_sample() as u64;
    let mut copied = 0u64;
    let mut buf = Vec::with_capacity(chunk.min(count as usize));
    while copied < count {
        let n = (count - copied).min(chunk as u64) as usize;
        buf.clear();
        match stream.read_normalized_into(n, &mut buf) {
            Ok(()) => {}
            Err(WavSplitError::EndOfStream) if copied == 0 => return Ok(BodyCopy::EndOfStream),
            Err(WavSplitError::EndOfStream) => {
                return Err(WavSplitError::Truncated {
                    expected: count * sample_bytes,
                    actual: copied * sample_bytes,
                })
            }
            Err(WavSplitError::Truncated { actual, .. }) => {
                return Err(WavSplitError::Truncated {
                    expected: count * sample_bytes,
                    actual: copied * sample_bytes + actual,
                })
            }
            Err(err) => return Err(err),
        }
        writer.write_normalized_samples(&buf)?;
        copied += n as u64;
    }
    Ok(BodyCopy::Complete)
}

/// Copy `[start_seconds, end_seconds)` of `src` into a new WAV file at `dst`.
///
/// The output keeps the source's channel count, sample rate and bit depth.
/// The requested range must lie within the source.
pub fn copy_range(
    src: &Path,
    dst: &Path,
    start_seconds: f64,
    end_seconds: f64,
) -> Result<(), WavSplitError> {
    if !(start_seconds >= 0.0 && end_seconds >= 0.0) || start_seconds > end_seconds {
        return Err(WavSplitError::InvalidArgument(format!(
            "invalid range {start_seconds}s..{end_seconds}s"
        )));
    }

    let mut stream = open_wav(src)?;
    let format = *stream.format();
    let rate = f64::from(format.sample_rate);
    let total_frames = stream.total_frames();
    let start_frame = (start_seconds * rate) as u64;
    let end_frame = (end_seconds * rate) as u64;
    if start_frame > total_frames || end_frame > total_frames {
        return Err(WavSplitError::InvalidArgument(format!(
            "range {start_seconds}s..{end_seconds}s exceeds the {:.3}s of audio available",
            stream.duration().as_secs_f64()
        )));
    }

    let channels = u64::from(format.channels);
    let frames = u32::try_from(end_frame - start_frame).map_err(|_| {
        WavSplitError::InvalidArgument(format!(
            "range {start_seconds}s..{end_seconds}s is too long for one file"
        ))
    })?;
    stream.skip_samples(start_frame * channels)?;

    let file = File::create(dst)?;
    let mut writer = open_writer(
        BufWriter::new(file),
        frames,
        format.channels,
        format.sample_rate,
        format.bits_per_sample,
    )?;
    let body = u64::from(frames) * channels;
    if copy_samples(&mut stream, &mut writer, body, DEFAULT_BUFFER_SIZE_SAMPLES)?
        == BodyCopy::EndOfStream
    {
        return Err(WavSplitError::EndOfStream);
    }
    writer.finish()?;

    info!(
        "copied {}..{} s of '{}' to '{}'",
        start_seconds,
        end_seconds,
        src.display(),
        dst.display()
    );
    Ok(())
}
