//! fms-tool: inspect FMS songs, FMI instruments and controller configs
//!
//! Rendering and playback need a chip emulator, which this crate does not
//! ship. Use `opl_fms::export` and `opl_fms::AudioDevice` with your own
//! `OplBackend`.

use std::env;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use opl_fms::opl::registers::CHANNEL_COUNT;
use opl_fms::sequencer::format_step_line;
use opl_fms::{fms, samples_per_tick, ControllerConfig, INSTRUMENT_PARAMS};

const USAGE: &str = "\
Usage: fms-tool <command> [args]

Commands:
  info <song.fms>                 Show tempo, length and instrument names
  dump <song.fms> [--numbers]     Print the note grid
  instrument <file.fmi>           Print an instrument's parameters
  config <file.json>              Validate a controller config

Set RUST_LOG to change log verbosity (default: info).";

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn cmd_info(path: &str) -> Result<()> {
    let song = fms::read_song(path).with_context(|| format!("reading {}", path))?;
    let spt = samples_per_tick(song.song_delay);
    let seconds = song.song_length() as f64 * spt as f64 / 44_100.0;

    println!("File:     {}", fms::display_name(path));
    println!("Delay:    {} ({} samples per row)", song.song_delay, spt);
    println!("Rows:     {}", song.song_length());
    println!("Duration: {:.1}s", seconds);
    println!();
    for channel in 0..CHANNEL_COUNT {
        let name = song.instrument_name(channel).unwrap_or_default();
        println!("  CH#{}  {}", channel + 1, if name.is_empty() { "-" } else { name.as_str() });
    }
    Ok(())
}

fn cmd_dump(path: &str, use_numbers: bool) -> Result<()> {
    let song = fms::read_song(path).with_context(|| format!("reading {}", path))?;
    for (step, row) in song.used_rows().iter().enumerate() {
        println!("{}", format_step_line(step as i64, row, use_numbers));
    }
    Ok(())
}

fn cmd_instrument(path: &str) -> Result<()> {
    let instrument = fms::read_instrument(path).with_context(|| format!("reading {}", path))?;
    println!("{}", fms::display_name(path));
    for (param, value) in INSTRUMENT_PARAMS.iter().zip(instrument.as_bytes()) {
        let flag = if *value > param.max_value { "  (out of range)" } else { "" };
        println!("  {:<22} {:>3} / {:<3}{}", param.name, value, param.max_value, flag);
    }
    Ok(())
}

fn cmd_config(path: &str) -> Result<()> {
    let config = ControllerConfig::load(path).with_context(|| format!("loading {}", path))?;
    println!("{}", config.to_json_string()?);
    Ok(())
}

fn positional(args: &[String], i: usize) -> Result<&str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("'{}' needs more arguments", args[0]))
}

fn run(args: &[String]) -> Result<()> {
    let command = args.first().ok_or_else(|| anyhow!("missing command"))?;
    let arg = |i: usize| positional(args, i);

    match command.as_str() {
        "info" => cmd_info(arg(1)?),
        "dump" => {
            let use_numbers = args.iter().skip(2).any(|a| a == "--numbers" || a == "-n");
            cmd_dump(arg(1)?, use_numbers)
        }
        "instrument" => cmd_instrument(arg(1)?),
        "config" => cmd_config(arg(1)?),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("unknown command '{}'", other),
    }
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_commands_are_not_offered() {
        for command in ["export", "play"] {
            let err = run(&args(&[command, "song.fms", "out.wav"])).unwrap_err();
            assert!(err.to_string().contains("unknown command"));
            assert!(!USAGE.contains(command));
        }
    }

    #[test]
    fn test_missing_argument_is_reported() {
        let err = run(&args(&["info"])).unwrap_err();
        assert!(err.to_string().contains("needs more arguments"));
    }
}
