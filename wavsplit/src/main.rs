mod cli;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::ArgMatches;
use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::debug;
use wavsplit_core::{
    analyze, copy_range, plan_segments, run_with_progress, ProgressEvent, SegmentArgs,
    SplitConfig,
};

use crate::cli::build_cli;

fn input_path(matches: &ArgMatches) -> anyhow::Result<&PathBuf> {
    let input_path = matches
        .get_one::<PathBuf>("file_path")
        .ok_or_else(|| anyhow!("missing input file"))?;
    if !input_path.is_file() {
        return Err(anyhow!(
            "input file does not exist: {}",
            input_path.display()
        ));
    }
    Ok(input_path)
}

fn millis(matches: &ArgMatches, id: &str) -> u64 {
    matches.get_one::<u64>(id).copied().unwrap_or_default()
}

fn split(matches: &ArgMatches) -> anyhow::Result<()> {
    let input_path = input_path(matches)?;
    let output_dir = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let args = SegmentArgs {
        bar_energy: matches
            .get_one::<f64>("bar-energy")
            .copied()
            .unwrap_or(SegmentArgs::default().bar_energy),
        span_silence_ms: millis(matches, "span-silence"),
        span_margin_ms: millis(matches, "span-margin"),
        span_min_ms: millis(matches, "span-min"),
    };
    debug!("segmentation arguments: {args:?}");

    let config = SplitConfig::builder(input_path, &output_dir)
        .args(args)
        .overwrite(matches.get_flag("overwrite"))
        .build()
        .with_context(|| {
            format!(
                "failed to create configuration for '{}'",
                input_path.display()
            )
        })?;

    if matches.get_flag("dry-run") {
        let plan = plan_segments(&config)
            .with_context(|| format!("failed to plan clips for '{}'", input_path.display()))?;

        if plan.is_empty() {
            println!("Dry run: no clips would be generated.");
        } else {
            println!("Dry run: would generate {} clip(s):", plan.len());
            for segment in plan {
                println!("  {}", segment.path.display());
            }
        }
        return Ok(());
    }

    let progress = ProgressBar::new(0);
    progress.set_draw_target(ProgressDrawTarget::stderr());
    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let progress_handle = progress.clone();
    let result = run_with_progress(config, move |event: ProgressEvent| match event {
        ProgressEvent::Start { segments } => {
            progress_handle.set_style(bar_style.clone());
            progress_handle.set_length(segments as u64);
            progress_handle.enable_steady_tick(Duration::from_millis(100));
        }
        ProgressEvent::SegmentWritten { path, duration, .. } => {
            progress_handle.inc(1);
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress_handle.set_message(format!("{name} ({})", HumanDuration(duration)));
        }
        ProgressEvent::Finish => {
            progress_handle.set_message(String::from("Completed"));
        }
    })
    .with_context(|| format!("failed to split '{}'", input_path.display()));

    progress.finish_and_clear();

    let summary = result?;
    println!(
        "Wrote {} of {} clip(s) to {}",
        summary.files_written,
        summary.spans_detected,
        output_dir.display()
    );
    if summary.stopped_early {
        eprintln!("warning: the recording ended early; some clips were not written");
    }
    Ok(())
}

fn copy(matches: &ArgMatches) -> anyhow::Result<()> {
    let input_path = input_path(matches)?;
    let destination = matches
        .get_one::<PathBuf>("destination")
        .ok_or_else(|| anyhow!("missing destination"))?;
    let start = matches.get_one::<f64>("start").copied().unwrap_or_default();
    let end = matches.get_one::<f64>("end").copied().unwrap_or_default();

    copy_range(input_path, destination, start, end).with_context(|| {
        format!(
            "failed to copy {start}s..{end}s of '{}'",
            input_path.display()
        )
    })?;
    println!("Copied {start}s..{end}s to {}", destination.display());
    Ok(())
}

fn print_profile(input_path: &Path) -> anyhow::Result<()> {
    let profile = analyze(input_path)
        .with_context(|| format!("failed to analyze '{}'", input_path.display()))?;
    let format = profile.format();

    println!("{}", input_path.display());
    println!(
        "  format:        {} {} Hz, {} channel(s), {} bits",
        format.audio_format, format.sample_rate, format.channels, format.bits_per_sample
    );
    println!(
        "  windows:       {} x {} ms",
        profile.len(),
        profile.window_ms()
    );
    println!("  mean energy:   {:e}", profile.mean_energy());
    println!("  overflow:      {} sample(s)", profile.total_overflow());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();
    if let Some(name) = matches.subcommand_name() {
        debug!("running '{name}'");
    }
    match matches.subcommand() {
        Some(("split", sub)) => split(sub),
        Some(("copy", sub)) => copy(sub),
        Some(("analyze", sub)) => print_profile(input_path(sub)?),
        _ => Err(anyhow!("unknown subcommand")),
    }
}
