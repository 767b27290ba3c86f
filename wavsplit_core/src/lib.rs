//! Split long WAV recordings into non-silent clips.
//!
//! The pipeline runs one way: [`decode_header`] binds a forward-only cursor
//! to the `data` chunk, [`analyze`] reduces the stream to 20 ms energy
//! windows, [`segment`] turns the windows into [`Span`]s and
//! [`segment_and_save`] writes one WAV file per span through
//! [`open_writer`]. [`copy_range`] extracts a fixed time range.
//!
//! ```no_run
//! use std::path::Path;
//! use wavsplit_core::{segment_and_save, SegmentArgs};
//!
//! # fn main() -> Result<(), wavsplit_core::WavSplitError> {
//! let summary = segment_and_save(
//!     Path::new("interview.wav"),
//!     Path::new("clips"),
//!     &SegmentArgs::default(),
//! )?;
//! println!("wrote {} clip(s)", summary.files_written);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod copy;
pub mod error;
pub mod format;
pub mod progress;
pub mod reader;
pub mod segment;
pub mod transcode;
pub mod writer;

pub use analysis::{analyze, analyze_stream, EnergyProfile, WindowStats, WINDOW_MS};
pub use config::{SegmentArgs, SplitConfig, SplitConfigBuilder, DEFAULT_BUFFER_SIZE_SAMPLES};
pub use copy::copy_range;
pub use error::WavSplitError;
pub use format::{FormatDescriptor, FormatTag};
pub use progress::{NoProgress, ProgressEvent, ProgressReporter};
pub use reader::{decode_header, open_wav, read_normalized_samples, DecodedStream};
pub use segment::{
    detect_spans, plan_segments, run, run_with_progress, segment, segment_and_save,
    PlannedSegment, Span, SplitSummary,
};
pub use transcode::SampleEncoding;
pub use writer::{open_writer, write_normalized_samples, WavWriter};
