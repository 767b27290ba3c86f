use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Generate a mono 16-bit WAV file at 8 kHz holding a 440 Hz tone during `loud` seconds.
///
/// Fixtures are synthesised on the fly so the repository carries no binary assets.
fn write_gated_tone<P: AsRef<Path>>(
    path: P,
    seconds: u32,
    loud: &[(f64, f64)],
) -> Result<(), Box<dyn Error>> {
    let sample_rate = 8_000u32;
    let mut samples = Vec::new();
    for n in 0..sample_rate * seconds {
        let t = f64::from(n) / f64::from(sample_rate);
        let sample = if loud.iter().any(|&(from, to)| t >= from && t < to) {
            (0.5 * (t * 440.0 * std::f64::consts::TAU).sin() * 32_768.0) as i16
        } else {
            0
        };
        samples.extend_from_slice(&sample.to_le_bytes());
    }

    let mut file = File::create(path)?;
    let data_len = samples.len() as u32;
    file.write_all(b"RIFF")?;
    file.write_all(&(36u32 + data_len).to_le_bytes())?;
    file.write_all(b"WAVE")?;
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&1u16.to_le_bytes())?; // PCM
    file.write_all(&1u16.to_le_bytes())?; // channels
    file.write_all(&sample_rate.to_le_bytes())?;
    file.write_all(&(sample_rate * 2).to_le_bytes())?;
    file.write_all(&2u16.to_le_bytes())?; // block align
    file.write_all(&16u16.to_le_bytes())?;
    file.write_all(b"data")?;
    file.write_all(&data_len.to_le_bytes())?;
    file.write_all(&samples)?;
    Ok(())
}

fn two_bursts(dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.join("tone.wav");
    write_gated_tone(&path, 10, &[(2.0, 4.0), (6.0, 9.0)])?;
    Ok(path)
}

fn split_cmd(input: &Path, output: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("wavsplit")?;
    cmd.args([
        "split",
        "--bar-energy",
        "0.001",
        "--span-silence",
        "500ms",
        "--span-margin",
        "200",
        "--span-min",
        "0.4s",
        "--output",
    ])
    .arg(output)
    .arg(input);
    Ok(cmd)
}

fn sorted_names(dir: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let mut names: Vec<_> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    names.sort();
    Ok(names)
}

#[test]
fn cli_splits_recording_on_silence() -> Result<(), Box<dyn Error>> {
    let input_dir = tempdir()?;
    let input_path = two_bursts(input_dir.path())?;
    let output_dir = tempdir()?;

    split_cmd(&input_path, output_dir.path())?
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 of 2 clip(s)"));

    assert_eq!(
        sorted_names(output_dir.path())?,
        ["tone_0_00000001.wav", "tone_0_00000002.wav"]
    );
    let sizes: Vec<u64> = ["tone_0_00000001.wav", "tone_0_00000002.wav"]
        .iter()
        .map(|name| fs::metadata(output_dir.path().join(name)).map(|meta| meta.len()))
        .collect::<Result<_, _>>()?;
    assert_eq!(sizes, [44 + 19_200 * 2, 44 + 27_200 * 2]);

    output_dir.close()?;
    input_dir.close()?;
    Ok(())
}

#[test]
fn cli_refuses_to_overwrite_unless_asked() -> Result<(), Box<dyn Error>> {
    let input_dir = tempdir()?;
    let input_path = two_bursts(input_dir.path())?;
    let output_dir = tempdir()?;

    split_cmd(&input_path, output_dir.path())?.assert().success();
    split_cmd(&input_path, output_dir.path())?
        .assert()
        .failure()
        .stderr(predicate::str::contains("output file already exists"));
    split_cmd(&input_path, output_dir.path())?
        .arg("--overwrite")
        .assert()
        .success();

    output_dir.close()?;
    input_dir.close()?;
    Ok(())
}

#[test]
fn cli_reports_missing_input_file() -> Result<(), Box<dyn Error>> {
    let output_dir = tempdir()?;

    Command::cargo_bin("wavsplit")?
        .args(["split", "--output"])
        .arg(output_dir.path())
        .arg("missing.wav")
        .assert()
        .failure()
        .stderr(predicate::str::contains("input file does not exist"));

    output_dir.close()?;
    Ok(())
}

#[test]
fn cli_dry_run_prints_plan_without_creating_files() -> Result<(), Box<dyn Error>> {
    let input_dir = tempdir()?;
    let input_path = two_bursts(input_dir.path())?;
    let output_dir = tempdir()?;
    let clips = output_dir.path().join("clips");

    let assert = split_cmd(&input_path, &clips)?
        .arg("--dry-run")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    assert!(stdout.contains("Dry run: would generate 2 clip(s):"));
    for name in ["tone_0_00000001.wav", "tone_0_00000002.wav"] {
        let needle = format!("  {}", clips.join(name).display());
        assert!(stdout.contains(&needle), "missing dry-run entry for {needle}");
    }
    assert!(!clips.exists(), "dry run should not create the output directory");

    output_dir.close()?;
    input_dir.close()?;
    Ok(())
}

#[test]
fn cli_copies_a_time_range() -> Result<(), Box<dyn Error>> {
    let input_dir = tempdir()?;
    let input_path = two_bursts(input_dir.path())?;
    let destination = input_dir.path().join("middle.wav");

    Command::cargo_bin("wavsplit")?
        .args(["copy", "--start", "2", "--end", "8.5"])
        .arg(&input_path)
        .arg(&destination)
        .assert()
        .success();
    assert_eq!(fs::metadata(&destination)?.len(), 44 + 52_000 * 2);

    Command::cargo_bin("wavsplit")?
        .args(["copy", "--start", "8", "--end", "12"])
        .arg(&input_path)
        .arg(input_dir.path().join("late.wav"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid argument"));

    input_dir.close()?;
    Ok(())
}

#[test]
fn cli_analyze_prints_energy_statistics() -> Result<(), Box<dyn Error>> {
    let input_dir = tempdir()?;
    let input_path = two_bursts(input_dir.path())?;

    Command::cargo_bin("wavsplit")?
        .arg("analyze")
        .arg(&input_path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("499 x 20 ms")
                .and(predicate::str::contains("mean energy"))
                .and(predicate::str::contains("overflow:      0 sample(s)")),
        );

    input_dir.close()?;
    Ok(())
}

#[test]
fn cli_rejects_malformed_lengths() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin("wavsplit")?
        .args(["split", "--span-margin", "5h", "take.wav"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown unit 'h'"));
    Ok(())
}
