//! Silence-based segmentation.
//!
//! Windows whose energy exceeds the bar are grouped into spans. Silent runs
//! no longer than `span_silence_ms` are absorbed into the surrounding span,
//! and spans no longer than `span_min_ms` are dropped. Each surviving span
//! is widened by `span_margin_ms` on both sides and written as its own file.
//! Margin that would reach before the stream start, into audio already
//! written for the previous span, or past the stream end is emitted as
//! silence instead.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::analysis::{analyze, EnergyProfile};
use crate::config::{SegmentArgs, SplitConfig};
use crate::copy::{copy_samples, BodyCopy};
use crate::error::WavSplitError;
use crate::format::FormatDescriptor;
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};
use crate::reader::{open_wav, DecodedStream};
use crate::writer::open_writer;

/// A half-open range `[start, end)` of window indices classified as non-silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group windows into spans.
///
/// A span opens at the first window strictly above `bar_energy`. After
/// that, windows strictly below the bar extend a silent run and all others
/// are loud. A loud window following a silent run longer than
/// `silence_windows` closes the current span where the run began and opens
/// a new one. A trailing silent run is excluded from the last span.
pub fn merge_spans<I>(energies: I, bar_energy: f64, silence_windows: usize) -> Vec<Span>
where
    I: IntoIterator<Item = f64>,
{
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let mut silent_run = 0usize;
    let mut index = 0usize;

    for energy in energies {
        match open {
            None => {
                if energy > bar_energy {
                    open = Some(index);
                }
            }
            Some(start) => {
                if energy < bar_energy {
                    silent_run += 1;
                } else {
                    if silent_run > silence_windows {
                        spans.push(Span {
                            start,
                            end: index - silent_run,
                        });
                        open = Some(index);
                    }
                    silent_run = 0;
                }
            }
        }
        index += 1;
    }

    if let Some(start) = open {
        spans.push(Span {
            start,
            end: index - silent_run,
        });
    }
    spans
}

/// Keep only spans longer than `min_windows`.
pub fn filter_short_spans(spans: Vec<Span>, min_windows: usize) -> Vec<Span> {
    spans
        .into_iter()
        .filter(|span| span.len() > min_windows)
        .collect()
}

/// Run both segmentation stages over an energy profile.
pub fn detect_spans(profile: &EnergyProfile, args: &SegmentArgs) -> Vec<Span> {
    let merged = merge_spans(profile.energies(), args.bar_energy, args.silence_windows());
    let merged_count = merged.len();
    let spans = filter_short_spans(merged, args.min_windows());
    info!(
        "{} span(s) above {:e} ({} before dropping short spans; mean window energy {:e})",
        spans.len(),
        args.bar_energy,
        merged_count,
        profile.mean_energy()
    );
    spans
}

/// Analyse `path` and return its non-silent spans.
pub fn segment(path: &Path, args: &SegmentArgs) -> Result<Vec<Span>, WavSplitError> {
    args.validate()?;
    let profile = analyze(path)?;
    if profile.is_empty() {
        return Err(WavSplitError::EmptyProfile);
    }
    Ok(detect_spans(&profile, args))
}

/// One output file of a split run.
///
/// Sample positions count interleaved samples from the start of the source
/// `data` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSegment {
    /// 1-based position among the retained spans.
    pub index: usize,
    pub span: Span,
    pub path: PathBuf,
    /// Overflow count shown in the file name.
    pub overflow: u64,
    pub leading_padding: u64,
    /// First source sample copied.
    pub begin: u64,
    /// One past the last source sample copied.
    pub end: u64,
    pub trailing_padding: u64,
}

impl PlannedSegment {
    pub fn body_samples(&self) -> u64 {
        self.end - self.begin
    }

    /// Samples in the output file, padding included.
    pub fn total_samples(&self) -> u64 {
        self.leading_padding
            .saturating_add(self.body_samples())
            .saturating_add(self.trailing_padding)
    }
}

/// Output file name for the `index`-th span of `base_name`.
pub fn segment_file_name(base_name: &str, overflow: u64, index: usize) -> String {
    let hint = if overflow == 0 {
        String::from("0")
    } else {
        format!("overflow{overflow}")
    };
    format!("{base_name}_{hint}_{index:08}.wav")
}

/// Map spans to sample ranges and padding.
///
/// Spans whose widened range is empty once clipped are skipped but still
/// consume an index. Each segment's sample total is rounded up to whole
/// frames with trailing silence.
///
/// The overflow hint of the `n`-th retained span is the overflow count of
/// window `n`, not of the span's own windows. Existing clip collections are
/// named this way, so the lookup is kept as is.
pub fn plan_emission(
    profile: &EnergyProfile,
    spans: &[Span],
    margin_ms: u64,
    output_dir: &Path,
    base_name: &str,
) -> Vec<PlannedSegment> {
    let format = profile.format();
    let per_window = profile.samples_per_window();
    let total = profile.total_samples();
    let margin = margin_ms.saturating_mul(u64::from(format.sample_rate)) / 1000;
    let channels = u64::from(format.channels.max(1));

    let mut consumed = 0u64;
    let mut plan = Vec::with_capacity(spans.len());
    for (position, span) in spans.iter().enumerate() {
        let index = position + 1;

        let start = span.start as u64 * per_window;
        let (begin, leading_padding) = if start > consumed.saturating_add(margin) {
            (start - margin, 0)
        } else {
            (consumed, consumed.saturating_add(margin) - start)
        };

        let stop = span.end as u64 * per_window;
        let (end, mut trailing_padding) = if stop.saturating_add(margin) < total {
            (stop + margin, 0)
        } else if stop < total {
            (total, margin - (total - stop))
        } else {
            (total, margin)
        };

        if end <= begin {
            debug!("span {index} {span:?} is empty after clipping; skipped");
            continue;
        }

        let unaligned = leading_padding
            .saturating_add(end - begin)
            .saturating_add(trailing_padding)
            % channels;
        if unaligned != 0 {
            trailing_padding = trailing_padding.saturating_add(channels - unaligned);
        }

        let overflow = profile
            .windows()
            .get(position)
            .map_or(0, |window| window.overflow_count);
        plan.push(PlannedSegment {
            index,
            span: *span,
            path: output_dir.join(segment_file_name(base_name, overflow, index)),
            overflow,
            leading_padding,
            begin,
            end,
            trailing_padding,
        });
        consumed = end;
    }
    plan
}

/// Outcome of a split run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Spans retained after filtering.
    pub spans_detected: usize,
    pub files_written: usize,
    /// The source ran out while a span was being copied; later spans were not written.
    pub stopped_early: bool,
}

fn analyze_for_split(
    config: &SplitConfig,
) -> Result<(Vec<Span>, Vec<PlannedSegment>), WavSplitError> {
    let profile = analyze(&config.input_path)?;
    if profile.is_empty() {
        return Err(WavSplitError::EmptyProfile);
    }
    let spans = detect_spans(&profile, &config.args);
    let plan = plan_emission(
        &profile,
        &spans,
        config.args.span_margin_ms,
        &config.output_dir,
        config.base_name(),
    );
    Ok((spans, plan))
}

/// Compute the files a split run would write, without touching the output directory.
pub fn plan_segments(config: &SplitConfig) -> Result<Vec<PlannedSegment>, WavSplitError> {
    analyze_for_split(config).map(|(_, plan)| plan)
}

fn create_output(path: &Path, overwrite: bool) -> Result<File, WavSplitError> {
    if overwrite {
        return Ok(File::create(path)?);
    }
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| match err.kind() {
            ErrorKind::AlreadyExists => WavSplitError::OutputExists(path.to_path_buf()),
            _ => WavSplitError::Io(err),
        })
}

fn write_segment<R: Read>(
    stream: &mut DecodedStream<R>,
    format: &FormatDescriptor,
    segment: &PlannedSegment,
    config: &SplitConfig,
) -> Result<BodyCopy, WavSplitError> {
    let frames = segment.total_samples() / u64::from(format.channels);
    let frames = u32::try_from(frames).map_err(|_| {
        WavSplitError::InvalidArgument(format!(
            "segment {} holds {frames} frames, too many for one file",
            segment.index
        ))
    })?;

    let file = create_output(&segment.path, config.overwrite)?;
    let mut writer = open_writer(
        BufWriter::new(file),
        frames,
        format.channels,
        format.sample_rate,
        format.bits_per_sample,
    )?;
    writer.write_silence(segment.leading_padding as usize)?;
    let body = copy_samples(
        stream,
        &mut writer,
        segment.body_samples(),
        config.buffer_size_samples.get(),
    )?;
    writer.write_silence(segment.trailing_padding as usize)?;
    writer.finish()?;
    Ok(body)
}

fn emit_segments<R: Read, P: ProgressReporter>(
    mut stream: DecodedStream<R>,
    plan: &[PlannedSegment],
    config: &SplitConfig,
    progress: &mut P,
) -> Result<SplitSummary, WavSplitError> {
    let format = *stream.format();
    let mut summary = SplitSummary::default();
    let mut position = 0u64;

    for segment in plan {
        if segment.begin > position {
            match stream.skip_samples(segment.begin - position) {
                // An exhausted source surfaces again when the body is read.
                Ok(()) | Err(WavSplitError::EndOfStream) => {}
                Err(err) => return Err(err),
            }
            position = segment.begin;
        }

        let body = write_segment(&mut stream, &format, segment, config)?;
        position = segment.end;
        summary.files_written += 1;

        let per_second = u64::from(format.sample_rate) * u64::from(format.channels);
        let duration = Duration::from_secs_f64(segment.total_samples() as f64 / per_second as f64);
        info!(
            "wrote '{}' ({:.3}s, windows {}..{})",
            segment.path.display(),
            duration.as_secs_f64(),
            segment.span.start,
            segment.span.end
        );
        progress.report(ProgressEvent::SegmentWritten {
            index: segment.index,
            path: segment.path.clone(),
            duration,
        });

        if body == BodyCopy::EndOfStream {
            warn!(
                "source ended before segment {}; remaining spans are not written",
                segment.index
            );
            summary.stopped_early = true;
            break;
        }
    }
    Ok(summary)
}

/// Perform the split described by `config`, reporting progress to `progress`.
pub fn run_with_progress<P: ProgressReporter>(
    config: SplitConfig,
    mut progress: P,
) -> Result<SplitSummary, WavSplitError> {
    let (spans, plan) = analyze_for_split(&config)?;

    fs::create_dir_all(&config.output_dir)?;
    progress.report(ProgressEvent::Start {
        segments: plan.len(),
    });

    let stream = open_wav(&config.input_path)?;
    let mut summary = emit_segments(stream, &plan, &config, &mut progress)?;
    summary.spans_detected = spans.len();

    progress.report(ProgressEvent::Finish);
    Ok(summary)
}

/// Perform the split described by `config`.
pub fn run(config: SplitConfig) -> Result<SplitSummary, WavSplitError> {
    run_with_progress(config, NoProgress)
}

/// Split `path` into clips under `output_dir`, replacing existing clips.
pub fn segment_and_save(
    path: &Path,
    output_dir: &Path,
    args: &SegmentArgs,
) -> Result<SplitSummary, WavSplitError> {
    let config = SplitConfig::builder(path, output_dir)
        .args(*args)
        .overwrite(true)
        .build()?;
    run(config)
}
