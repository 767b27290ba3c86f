mod duration;

use std::path::PathBuf;

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};

use duration::parse_millis;

fn parse_bar_energy(value: &str) -> Result<f64, String> {
    let energy: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid energy '{value}'"))?;
    if !energy.is_finite() || energy < 0.0 {
        return Err("energy must be a finite, non-negative number".into());
    }
    Ok(energy)
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of seconds '{value}'"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("seconds must be a finite, non-negative number".into());
    }
    Ok(seconds)
}

fn input_arg() -> Arg {
    Arg::new("file_path")
        .value_name("FILE_PATH")
        .help("Path to the input .wav file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

fn millis_arg(id: &'static str, help: &'static str, default: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .value_name("LENGTH")
        .help(help)
        .default_value(default)
        .value_parser(ValueParser::new(|value: &str| {
            parse_millis(value).map_err(|err| err.to_string())
        }))
}

fn split_command() -> Command {
    Command::new("split")
        .about("Write every non-silent span of a recording to its own file")
        .arg(
            Arg::new("bar-energy")
                .short('b')
                .long("bar-energy")
                .value_name("ENERGY")
                .help("Mean squared amplitude a 20 ms window must exceed to count as sound")
                .default_value("0.000036")
                .value_parser(ValueParser::new(parse_bar_energy)),
        )
        .arg(millis_arg(
            "span-silence",
            "Silences longer than this split spans (e.g. 800, 800ms, 0.8s)",
            "800ms",
        ))
        .arg(millis_arg(
            "span-margin",
            "Audio kept before and after every span",
            "400ms",
        ))
        .arg(millis_arg(
            "span-min",
            "Spans no longer than this are dropped",
            "200ms",
        ))
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("Directory where the clips will be written")
                .default_value(".")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help("Allow overwriting existing files in the output directory")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Preview the clips without writing files")
                .action(ArgAction::SetTrue),
        )
        .arg(input_arg())
}

fn copy_command() -> Command {
    Command::new("copy")
        .about("Copy a time range of a recording into a new file")
        .arg(
            Arg::new("start")
                .short('s')
                .long("start")
                .value_name("SECONDS")
                .help("Start of the range in seconds")
                .required(true)
                .value_parser(ValueParser::new(parse_seconds)),
        )
        .arg(
            Arg::new("end")
                .short('e')
                .long("end")
                .value_name("SECONDS")
                .help("End of the range in seconds")
                .required(true)
                .value_parser(ValueParser::new(parse_seconds)),
        )
        .arg(input_arg())
        .arg(
            Arg::new("destination")
                .value_name("DESTINATION")
                .help("Path of the .wav file to create")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}

fn analyze_command() -> Command {
    Command::new("analyze")
        .about("Print energy statistics that help choose --bar-energy")
        .arg(input_arg())
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Split WAV recordings on silence")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(split_command())
        .subcommand(copy_command())
        .subcommand(analyze_command())
}
