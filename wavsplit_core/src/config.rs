//! Segmentation parameters and split-run configuration.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::analysis::WINDOW_MS;
use crate::error::WavSplitError;
use crate::reader::ensure_wav_extension;

/// Samples read from the source per chunk while copying a span body.
pub const DEFAULT_BUFFER_SIZE_SAMPLES: usize = 64 * 1024;

/// Thresholds driving silence detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentArgs {
    /// Absolute window energy a window must exceed to open a span.
    pub bar_energy: f64,
    /// Silent runs longer than this split spans; shorter runs are merged.
    pub span_silence_ms: u64,
    /// Audio added before and after every emitted span.
    pub span_margin_ms: u64,
    /// Spans no longer than this are dropped.
    pub span_min_ms: u64,
}

impl Default for SegmentArgs {
    fn default() -> Self {
        Self {
            bar_energy: 0.000_036,
            span_silence_ms: 800,
            span_margin_ms: 400,
            span_min_ms: 200,
        }
    }
}

impl SegmentArgs {
    pub fn validate(&self) -> Result<(), WavSplitError> {
        if !self.bar_energy.is_finite() || self.bar_energy < 0.0 {
            return Err(WavSplitError::InvalidArgument(format!(
                "bar energy must be a finite, non-negative number, got {}",
                self.bar_energy
            )));
        }
        Ok(())
    }

    /// `span_silence_ms` in whole windows.
    pub fn silence_windows(&self) -> usize {
        (self.span_silence_ms / WINDOW_MS) as usize
    }

    /// `span_min_ms` in whole windows.
    pub fn min_windows(&self) -> usize {
        (self.span_min_ms / WINDOW_MS) as usize
    }
}

/// Configuration for splitting one file into clips.
#[derive(Clone, Debug)]
pub struct SplitConfig {
    /// Path of the source `.wav` file.
    pub input_path: PathBuf,
    /// Directory receiving the clips; created when missing.
    pub output_dir: PathBuf,
    pub args: SegmentArgs,
    /// Replace existing output files instead of failing.
    pub overwrite: bool,
    /// Maximum samples held in memory while copying a span body.
    pub buffer_size_samples: NonZeroUsize,
    base_name: String,
}

impl SplitConfig {
    /// Construct a [`SplitConfig`] with default options.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        input: P,
        output: Q,
        args: SegmentArgs,
    ) -> Result<Self, WavSplitError> {
        Self::builder(input, output).args(args).build()
    }

    /// Start building a [`SplitConfig`].
    pub fn builder<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> SplitConfigBuilder {
        SplitConfigBuilder {
            input_path: input.as_ref().to_path_buf(),
            output_dir: output.as_ref().to_path_buf(),
            args: SegmentArgs::default(),
            overwrite: false,
            buffer_size_samples: NonZeroUsize::new(DEFAULT_BUFFER_SIZE_SAMPLES)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Input file name without its extension; the prefix of every clip name.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

/// Builder for [`SplitConfig`].
#[derive(Clone, Debug)]
pub struct SplitConfigBuilder {
    input_path: PathBuf,
    output_dir: PathBuf,
    args: SegmentArgs,
    overwrite: bool,
    buffer_size_samples: NonZeroUsize,
}

impl SplitConfigBuilder {
    pub fn args(mut self, args: SegmentArgs) -> Self {
        self.args = args;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn buffer_size_samples(mut self, samples: NonZeroUsize) -> Self {
        self.buffer_size_samples = samples;
        self
    }

    /// Validate the options and produce the configuration.
    pub fn build(self) -> Result<SplitConfig, WavSplitError> {
        ensure_wav_extension(&self.input_path)?;
        self.args.validate()?;
        let base_name = self
            .input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or(WavSplitError::InvalidInputName)?
            .to_owned();

        Ok(SplitConfig {
            input_path: self.input_path,
            output_dir: self.output_dir,
            args: self.args,
            overwrite: self.overwrite,
            buffer_size_samples: self.buffer_size_samples,
            base_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_convert_to_whole_windows() {
        let args = SegmentArgs {
            span_silence_ms: 510,
            span_min_ms: 19,
            ..SegmentArgs::default()
        };
        assert_eq!(args.silence_windows(), 25);
        assert_eq!(args.min_windows(), 0);
    }

    #[test]
    fn rejects_bad_bar_energy() {
        for bar_energy in [-0.1, f64::NAN, f64::INFINITY] {
            let args = SegmentArgs {
                bar_energy,
                ..SegmentArgs::default()
            };
            assert!(matches!(
                args.validate(),
                Err(WavSplitError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn builder_applies_options() {
        let config = SplitConfig::builder("takes/session.WAV", "out")
            .overwrite(true)
            .buffer_size_samples(NonZeroUsize::new(32).unwrap())
            .build()
            .unwrap();
        assert!(config.overwrite);
        assert_eq!(config.buffer_size_samples.get(), 32);
        assert_eq!(config.base_name(), "session");
        assert_eq!(config.args, SegmentArgs::default());
    }

    #[test]
    fn builder_rejects_other_extensions() {
        assert!(matches!(
            SplitConfig::new("song.flac", "out", SegmentArgs::default()),
            Err(WavSplitError::UnsupportedFormat(_))
        ));
    }
}
