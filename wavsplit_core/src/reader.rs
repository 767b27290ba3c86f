//! RIFF/WAVE header decoding and the forward-only sample cursor.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Take};
use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::error::WavSplitError;
use crate::format::{FormatDescriptor, FMT_CHUNK_LEN};
use crate::transcode::SampleEncoding;

const SKIP_CHUNK_BYTES: usize = 64 * 1024;

/// Fill `buf` from `reader`, stopping early only at end of input.
///
/// Returns the number of bytes placed in `buf`.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// An owned, non-seekable cursor over the payload of a `data` chunk.
///
/// Bytes handed out are gone: there is no way to rewind.
#[derive(Debug)]
pub struct SampleCursor<R> {
    inner: Take<R>,
}

impl<R: Read> SampleCursor<R> {
    fn new(source: R, limit: u64) -> Self {
        Self {
            inner: source.take(limit),
        }
    }

    /// Bytes of the `data` chunk not yet consumed.
    pub fn remaining(&self) -> u64 {
        self.inner.limit()
    }

    /// Fill `buf` completely.
    ///
    /// Fails with [`WavSplitError::EndOfStream`] when nothing at all was
    /// available and with [`WavSplitError::Truncated`] when only part of
    /// `buf` could be filled.
    pub fn read_exactly(&mut self, buf: &mut [u8]) -> Result<(), WavSplitError> {
        if buf.is_empty() {
            return Ok(());
        }
        match read_full(&mut self.inner, buf)? {
            0 => Err(WavSplitError::EndOfStream),
            n if n == buf.len() => Ok(()),
            n => Err(WavSplitError::Truncated {
                expected: buf.len() as u64,
                actual: n as u64,
            }),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

/// A decoded WAV header bound to the not-yet-read sample payload.
#[derive(Debug)]
pub struct DecodedStream<R> {
    format: FormatDescriptor,
    total_samples: u64,
    duration: Duration,
    cursor: SampleCursor<R>,
    scratch: Vec<u8>,
}

impl<R: Read> DecodedStream<R> {
    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    /// Interleaved samples declared by the `data` chunk, all channels counted.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Multi-channel frames declared by the `data` chunk.
    pub fn total_frames(&self) -> u64 {
        self.total_samples / u64::from(self.format.channels)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.cursor.remaining()
    }

    /// Read `count` interleaved samples and append them, normalized, to `out`.
    pub fn read_normalized_into(
        &mut self,
        count: usize,
        out: &mut Vec<f64>,
    ) -> Result<(), WavSplitError> {
        let encoding = SampleEncoding::for_format(&self.format)?;
        let len = count
            .checked_mul(encoding.bytes_per_sample())
            .ok_or_else(|| {
                WavSplitError::InvalidArgument(format!("cannot read {count} samples at once"))
            })?;
        self.scratch.resize(len, 0);
        self.cursor.read_exactly(&mut self.scratch)?;
        encoding.decode_into(&self.scratch, out);
        Ok(())
    }

    /// Read `count` interleaved samples as normalized floats.
    pub fn read_normalized_samples(&mut self, count: usize) -> Result<Vec<f64>, WavSplitError> {
        let mut out = Vec::with_capacity(count);
        self.read_normalized_into(count, &mut out)?;
        Ok(out)
    }

    /// Consume and discard `count` interleaved samples.
    ///
    /// Discarding nothing because the stream is already exhausted yields
    /// [`WavSplitError::EndOfStream`]; running out part way yields
    /// [`WavSplitError::Truncated`].
    pub fn skip_samples(&mut self, count: u64) -> Result<(), WavSplitError> {
        let expected = count.saturating_mul(self.format.bytes_per_sample() as u64);
        let mut skipped = 0u64;
        let mut buf = vec![0u8; SKIP_CHUNK_BYTES];
        while skipped < expected {
            let want = (expected - skipped).min(SKIP_CHUNK_BYTES as u64) as usize;
            let got = read_full(&mut self.cursor.inner, &mut buf[..want])?;
            skipped += got as u64;
            if got < want {
                if skipped == 0 {
                    return Err(WavSplitError::EndOfStream);
                }
                return Err(WavSplitError::Truncated {
                    expected,
                    actual: skipped,
                });
            }
        }
        Ok(())
    }

    /// Give back the underlying source, positioned wherever reading stopped.
    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }
}

/// Read `count` normalized samples from `stream`.
pub fn read_normalized_samples<R: Read>(
    stream: &mut DecodedStream<R>,
    count: usize,
) -> Result<Vec<f64>, WavSplitError> {
    stream.read_normalized_samples(count)
}

/// Reject paths without a `.wav` extension (case-insensitive).
pub(crate) fn ensure_wav_extension(path: &Path) -> Result<(), WavSplitError> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        Ok(())
    } else {
        Err(WavSplitError::UnsupportedFormat(format!(
            "'{}' is not a .wav file",
            path.display()
        )))
    }
}

/// Open a `.wav` file and decode its header.
pub fn open_wav(path: &Path) -> Result<DecodedStream<BufReader<File>>, WavSplitError> {
    ensure_wav_extension(path)?;
    let file = File::open(path)?;
    decode_header(BufReader::new(file))
}

fn chunk_name(tag: &[u8]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

fn skip_bytes<R: Read>(source: &mut R, len: u64) -> io::Result<u64> {
    io::copy(&mut source.take(len), &mut io::sink())
}

/// Parse the RIFF prologue and scan chunks up to and including `data`.
///
/// Chunks other than `fmt ` and `data` are skipped; nothing after the
/// `data` chunk header is inspected.
pub fn decode_header<R: Read>(mut source: R) -> Result<DecodedStream<R>, WavSplitError> {
    let mut prologue = [0u8; 12];
    if read_full(&mut source, &mut prologue)? < prologue.len() {
        return Err(WavSplitError::MalformedContainer(
            "input is too short for a RIFF header".into(),
        ));
    }
    if &prologue[0..4] != b"RIFF" {
        return Err(WavSplitError::MalformedContainer("missing RIFF tag".into()));
    }
    if &prologue[8..12] != b"WAVE" {
        return Err(WavSplitError::MalformedContainer("missing WAVE tag".into()));
    }

    let mut format: Option<FormatDescriptor> = None;
    loop {
        let mut header = [0u8; 8];
        match read_full(&mut source, &mut header)? {
            8 => {}
            0 => {
                return Err(WavSplitError::MalformedContainer(
                    "no data chunk found".into(),
                ))
            }
            _ => {
                return Err(WavSplitError::MalformedContainer(
                    "truncated chunk header".into(),
                ))
            }
        }
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        match &header[0..4] {
            b"fmt " => {
                if (size as usize) < FMT_CHUNK_LEN {
                    return Err(WavSplitError::MalformedContainer(format!(
                        "fmt chunk of {size} bytes is smaller than {FMT_CHUNK_LEN}"
                    )));
                }
                let mut payload = [0u8; FMT_CHUNK_LEN];
                let extra = u64::from(size) - FMT_CHUNK_LEN as u64;
                if read_full(&mut source, &mut payload)? < FMT_CHUNK_LEN
                    || skip_bytes(&mut source, extra)? < extra
                {
                    return Err(WavSplitError::MalformedContainer(
                        "truncated fmt chunk".into(),
                    ));
                }
                let parsed = FormatDescriptor::from_bytes(&payload)?;
                debug!("fmt chunk: {parsed:?}");
                format = Some(parsed);
            }
            b"data" => {
                let format = format.ok_or_else(|| {
                    WavSplitError::MalformedContainer(
                        "data chunk appears before the fmt chunk".into(),
                    )
                })?;
                if format.bits_per_sample == 0 || format.channels == 0 || format.sample_rate == 0
                {
                    return Err(WavSplitError::MalformedContainer(format!(
                        "fmt chunk declares {} channel(s) at {} Hz with {} bits per sample",
                        format.channels, format.sample_rate, format.bits_per_sample
                    )));
                }

                let total_samples = u64::from(size) * 8 / u64::from(format.bits_per_sample);
                let per_second = u128::from(format.sample_rate) * u128::from(format.channels);
                let nanos = u128::from(total_samples) * 1_000_000_000 / per_second;
                let duration = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));
                debug!("data chunk: {size} bytes, {total_samples} samples, {duration:?}");

                return Ok(DecodedStream {
                    format,
                    total_samples,
                    duration,
                    cursor: SampleCursor::new(source, u64::from(size)),
                    scratch: Vec::new(),
                });
            }
            other => {
                debug!("skipping '{}' chunk of {size} bytes", chunk_name(other));
                if skip_bytes(&mut source, u64::from(size))? < u64::from(size) {
                    return Err(WavSplitError::MalformedContainer(format!(
                        "'{}' chunk is truncated",
                        chunk_name(other)
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::format::FormatTag;

    fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn fmt_payload(tag: u16, channels: u16, rate: u32, bits: u16) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let mut out = Vec::new();
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * u32::from(block_align)).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out
    }

    fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&(4 + body.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&body);
        out
    }

    fn pcm16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_header_and_skips_unknown_chunks() {
        let bytes = riff(&[
            chunk(b"LIST", b"INFOsome"),
            chunk(b"fmt ", &fmt_payload(1, 2, 8_000, 16)),
            chunk(b"data", &pcm16(&[0; 16_000])),
        ]);
        let stream = decode_header(Cursor::new(bytes)).unwrap();

        assert_eq!(stream.format().audio_format, FormatTag::Pcm);
        assert_eq!(stream.format().channels, 2);
        assert_eq!(stream.total_samples(), 16_000);
        assert_eq!(stream.total_frames(), 8_000);
        assert_eq!(stream.duration(), Duration::from_secs(1));
    }

    #[test]
    fn oversized_fmt_chunk_is_accepted() {
        let mut fmt = fmt_payload(3, 1, 48_000, 32);
        fmt.extend_from_slice(&0u16.to_le_bytes());
        let bytes = riff(&[chunk(b"fmt ", &fmt), chunk(b"data", &0.5f32.to_le_bytes())]);

        let mut stream = decode_header(Cursor::new(bytes)).unwrap();
        assert_eq!(stream.read_normalized_samples(1).unwrap(), vec![0.5]);
    }

    #[test]
    fn rejects_missing_tags() {
        let mut bytes = riff(&[chunk(b"fmt ", &fmt_payload(1, 1, 8_000, 16))]);
        bytes[0..4].copy_from_slice(b"RIFX");
        assert!(matches!(
            decode_header(Cursor::new(bytes.clone())),
            Err(WavSplitError::MalformedContainer(_))
        ));

        bytes[0..4].copy_from_slice(b"RIFF");
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(
            decode_header(Cursor::new(bytes)),
            Err(WavSplitError::MalformedContainer(_))
        ));

        assert!(matches!(
            decode_header(Cursor::new(b"RIFF".to_vec())),
            Err(WavSplitError::MalformedContainer(_))
        ));
    }

    #[test]
    fn rejects_data_before_fmt_and_short_fmt() {
        let bytes = riff(&[
            chunk(b"data", &pcm16(&[1, 2])),
            chunk(b"fmt ", &fmt_payload(1, 1, 8_000, 16)),
        ]);
        assert!(matches!(
            decode_header(Cursor::new(bytes)),
            Err(WavSplitError::MalformedContainer(_))
        ));

        let bytes = riff(&[chunk(b"fmt ", &fmt_payload(1, 1, 8_000, 16)[..14])]);
        assert!(matches!(
            decode_header(Cursor::new(bytes)),
            Err(WavSplitError::MalformedContainer(_))
        ));
    }

    #[test]
    fn rejects_unknown_format_tag() {
        let bytes = riff(&[
            chunk(b"fmt ", &fmt_payload(2, 1, 8_000, 4)),
            chunk(b"data", &[0; 4]),
        ]);
        assert!(matches!(
            decode_header(Cursor::new(bytes)),
            Err(WavSplitError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_data_chunk_is_malformed() {
        let bytes = riff(&[chunk(b"fmt ", &fmt_payload(1, 1, 8_000, 16))]);
        assert!(matches!(
            decode_header(Cursor::new(bytes)),
            Err(WavSplitError::MalformedContainer(_))
        ));
    }

    #[test]
    fn distinguishes_end_of_stream_from_truncation() {
        let bytes = riff(&[
            chunk(b"fmt ", &fmt_payload(1, 1, 8_000, 16)),
            chunk(b"data", &pcm16(&[16_384, -16_384, 8_192])),
            chunk(b"LIST", b"trailer!"),
        ]);
        let mut stream = decode_header(Cursor::new(bytes)).unwrap();

        assert_eq!(stream.read_normalized_samples(2).unwrap(), vec![0.5, -0.5]);
        match stream.read_normalized_samples(2) {
            Err(WavSplitError::Truncated { expected, actual }) => {
                assert_eq!((expected, actual), (4, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            stream.read_normalized_samples(1),
            Err(WavSplitError::EndOfStream)
        ));
    }

    #[test]
    fn skip_consumes_samples_forward_only() {
        let bytes = riff(&[
            chunk(b"fmt ", &fmt_payload(1, 1, 8_000, 16)),
            chunk(b"data", &pcm16(&[0, 0, 0, 16_384])),
        ]);
        let mut stream = decode_header(Cursor::new(bytes)).unwrap();
        stream.skip_samples(3).unwrap();
        assert_eq!(stream.read_normalized_samples(1).unwrap(), vec![0.5]);
        assert!(stream.skip_samples(1).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn reading_an_unsupported_depth_fails() {
        let bytes = riff(&[
            chunk(b"fmt ", &fmt_payload(1, 1, 8_000, 24)),
            chunk(b"data", &[0; 6]),
        ]);
        let mut stream = decode_header(Cursor::new(bytes)).unwrap();
        assert_eq!(stream.total_samples(), 2);
        assert!(matches!(
            stream.read_normalized_samples(1),
            Err(WavSplitError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(ensure_wav_extension(Path::new("take1.WAV")).is_ok());
        assert!(matches!(
            ensure_wav_extension(Path::new("take1.mp3")),
            Err(WavSplitError::UnsupportedFormat(_))
        ));
        assert!(ensure_wav_extension(Path::new("take1")).is_err());
    }
}
