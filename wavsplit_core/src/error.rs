use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while decoding, analysing or splitting WAV files.
#[derive(Debug, Error)]
pub enum WavSplitError {
    /// A caller-supplied argument is out of range or inconsistent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The input is not a WAV file or uses an encoding that cannot be handled.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The RIFF structure is broken: missing tags, misplaced or undersized chunks.
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    /// Wrapper around IO errors encountered while reading or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The `data` chunk was exhausted before a read returned any bytes.
    #[error("end of sample stream")]
    EndOfStream,

    /// A read stopped part way through because fewer bytes were available than requested.
    #[error("sample stream truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },

    /// The stream is too short to hold a single complete analysis window.
    #[error("input stream contains no complete analysis window")]
    EmptyProfile,

    /// Error returned when an output file exists and overwriting is disabled.
    #[error("output file already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// Error produced when a file name cannot be derived from the input path.
    #[error("failed to derive a base name for the input file")]
    InvalidInputName,
}

impl WavSplitError {
    /// Whether this error is the clean end-of-stream boundary rather than a failure.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, WavSplitError::EndOfStream)
    }
}
