//! Windowed energy analysis.
//!
//! The stream is cut into 20 ms windows of interleaved samples, regardless
//! of channel count. Each window yields its mean-square energy and the
//! number of samples sitting at the edge of the representable range. A
//! trailing window that would reach the end of the stream is not analysed.

use std::io::Read;
use std::ops::Range;
use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::error::WavSplitError;
use crate::format::FormatDescriptor;
use crate::reader::{open_wav, DecodedStream};

/// Duration of one analysis window.
pub const WINDOW_MS: u64 = 20;

/// Normalized magnitude above which a sample counts as overflowing.
pub const OVERFLOW_THRESHOLD: f64 = 0.999_999_999;

const MAX_PREALLOCATED_WINDOWS: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Mean of the squared samples.
    pub energy: f64,
    /// Samples whose magnitude exceeds [`OVERFLOW_THRESHOLD`].
    pub overflow_count: u64,
}

/// Per-window statistics for a whole stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyProfile {
    windows: Vec<WindowStats>,
    samples_per_window: u64,
    format: FormatDescriptor,
    total_samples: u64,
}

impl EnergyProfile {
    pub fn windows(&self) -> &[WindowStats] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Interleaved samples per window.
    pub fn samples_per_window(&self) -> u64 {
        self.samples_per_window
    }

    pub fn window_ms(&self) -> u64 {
        WINDOW_MS
    }

    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(WINDOW_MS)
    }

    /// Format of the analysed stream.
    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    /// Interleaved samples declared by the analysed stream, including the
    /// tail that no window covers.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Mean energy over all windows, `0.0` for an empty profile.
    ///
    /// Reported for inspection only; segmentation uses an absolute threshold.
    pub fn mean_energy(&self) -> f64 {
        if self.windows.is_empty() {
            return 0.0;
        }
        self.windows.iter().map(|w| w.energy).sum::<f64>() / self.windows.len() as f64
    }

    pub fn total_overflow(&self) -> u64 {
        self.windows.iter().map(|w| w.overflow_count).sum()
    }

    /// Overflowing samples within a range of window indices.
    pub fn overflow_in(&self, windows: Range<usize>) -> u64 {
        let end = windows.end.min(self.windows.len());
        let start = windows.start.min(end);
        self.windows[start..end]
            .iter()
            .map(|w| w.overflow_count)
            .sum()
    }

    /// Energies in window order.
    pub fn energies(&self) -> impl Iterator<Item = f64> + '_ {
        self.windows.iter().map(|w| w.energy)
    }
}

/// Interleaved samples covered by one 20 ms window at `sample_rate`.
pub fn samples_per_window(sample_rate: u32) -> u64 {
    u64::from(sample_rate) * WINDOW_MS / 1000
}

/// Mean-square energy of `samples`, `0.0` when empty.
pub fn window_energy(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|v| v * v).sum::<f64>() / samples.len() as f64
}

pub fn overflow_count(samples: &[f64]) -> u64 {
    samples
        .iter()
        .filter(|v| v.abs() > OVERFLOW_THRESHOLD)
        .count() as u64
}

/// Consume `stream` and compute its energy profile.
pub fn analyze_stream<R: Read>(
    mut stream: DecodedStream<R>,
) -> Result<EnergyProfile, WavSplitError> {
    let format = *stream.format();
    let total_samples = stream.total_samples();
    let per_window = samples_per_window(format.sample_rate);
    if per_window == 0 {
        return Err(WavSplitError::UnsupportedFormat(format!(
            "sample rate of {} Hz is too low for {WINDOW_MS} ms windows",
            format.sample_rate
        )));
    }
    let window_len = usize::try_from(per_window).map_err(|_| {
        WavSplitError::UnsupportedFormat(format!("{per_window} samples per window"))
    })?;

    // The declared window count comes from the header and may be far larger
    // than the payload actually present.
    let declared_windows = usize::try_from(total_samples / per_window).unwrap_or(usize::MAX);
    let mut windows = Vec::with_capacity(declared_windows.min(MAX_PREALLOCATED_WINDOWS));
    let mut buf = Vec::with_capacity(window_len);
    let sample_bytes = format.bytes_per_sample() as u64;
    let mut offset = 0u64;
    while offset + per_window < total_samples {
        buf.clear();
        match stream.read_normalized_into(window_len, &mut buf) {
            Ok(()) => {}
            Err(WavSplitError::EndOfStream) => {
                return Err(WavSplitError::Truncated {
                    expected: total_samples * sample_bytes,
                    actual: offset * sample_bytes,
                })
            }
            Err(WavSplitError::Truncated { actual, .. }) => {
                return Err(WavSplitError::Truncated {
                    expected: total_samples * sample_bytes,
                    actual: offset * sample_bytes + actual,
                })
            }
            Err(err) => return Err(err),
        }
        windows.push(WindowStats {
            energy: window_energy(&buf),
            overflow_count: overflow_count(&buf),
        });
        offset += per_window;
    }

    let profile = EnergyProfile {
        windows,
        samples_per_window: per_window,
        format,
        total_samples,
    };
    debug!(
        "analysed {} windows of {} samples, mean energy {:.6e}, {} overflowing samples",
        profile.len(),
        per_window,
        profile.mean_energy(),
        profile.total_overflow()
    );
    Ok(profile)
}

/// Open `path`, decode it and compute its energy profile.
pub fn analyze(path: &Path) -> Result<EnergyProfile, WavSplitError> {
    analyze_stream(open_wav(path)?)
}
