//! Program logging.
//!
//! Messages go to the console (info and below on stdout, warnings and errors on stderr) and,
//! for the `run` command, to a pair of log files in the output folder. The level comes from the
//! `GRIDPLAN_LOG_LEVEL` environment variable if set, otherwise from `settings.toml`.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback, Output};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// Set once the global logger is installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The environment variable used to override the log level
pub const LOG_LEVEL_ENV_VAR: &str = "GRIDPLAN_LOG_LEVEL";

/// The log level used when neither the environment nor the settings file gives one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Operational messages from a run
const LOG_INFO_FILE_NAME: &str = "gridplan_info.log";

/// Warnings and errors from a run
const LOG_ERROR_FILE_NAME: &str = "gridplan_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// Accepted levels are `off`, `error`, `warn`, `info`, `debug` and `trace` (case-insensitive).
/// An environment variable setting takes precedence over `log_level_from_settings`.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_dir`: If given, log files are also written to this folder
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let level = resolve_log_level(
        env::var(LOG_LEVEL_ENV_VAR).ok().as_deref(),
        log_level_from_settings,
    )?;

    let stdout = console_chain(level, std::io::stdout().is_terminal(), false);
    let stderr = console_chain(level, std::io::stderr().is_terminal(), true);
    let mut dispatch = Dispatch::new()
        .chain(stdout.chain(std::io::stdout()))
        .chain(stderr.chain(std::io::stderr()));

    if let Some(log_dir) = log_dir {
        let info_file = create_log_file(log_dir, LOG_INFO_FILE_NAME)?;
        let error_file = create_log_file(log_dir, LOG_ERROR_FILE_NAME)?;

        // The info file always records the progress of a run, even if the console is quieter
        dispatch = dispatch
            .chain(file_chain(level.max(LevelFilter::Info), false, info_file))
            .chain(file_chain(LevelFilter::Warn, true, error_file));
    }

    dispatch.apply().context("Logger already initialised")?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// Choose the log level from the environment, then settings, then the default
fn resolve_log_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    let level = from_env.or(from_settings).unwrap_or(DEFAULT_LOG_LEVEL);
    parse_log_level(level)
}

/// Convert a log level string to a [`LevelFilter`]
fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    let level = match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// Open a log file for writing, truncating any previous contents
fn create_log_file(log_dir: &Path, file_name: &str) -> Result<File> {
    let path = log_dir.join(file_name);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("Could not create log file {}", path.display()))
}

/// Split messages between two sinks: warnings and errors, or everything less severe
fn severity_filter(problems: bool) -> impl Fn(&log::Metadata) -> bool + Send + Sync + 'static {
    move |metadata| (metadata.level() <= LevelFilter::Warn) == problems
}

/// A console sink, coloured when attached to a terminal
fn console_chain(level: LevelFilter, use_colour: bool, problems: bool) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let level = if problems {
        level.min(LevelFilter::Warn)
    } else {
        level
    };

    Dispatch::new()
        .filter(severity_filter(problems))
        .format(move |out, message, record| {
            if use_colour {
                write_log(out, colours.color(record.level()), record.target(), message);
            } else {
                write_log_plain(out, message, record);
            }
        })
        .level(level)
}

/// A plain-text file sink
fn file_chain(level: LevelFilter, problems: bool, file: impl Into<Output>) -> Dispatch {
    Dispatch::new()
        .filter(severity_filter(problems))
        .format(write_log_plain)
        .level(level)
        .chain(file)
}

/// Write a log line with a timestamp, level and source module
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("WARN", LevelFilter::Warn)]
    #[case("Debug", LevelFilter::Debug)]
    fn test_parse_log_level(#[case] level: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_log_level(level).unwrap(), expected);
    }

    #[test]
    fn test_parse_log_level_unknown() {
        assert!(parse_log_level("verbose").is_err());
    }

    #[rstest]
    #[case(Some("error"), Some("debug"), LevelFilter::Error)]
    #[case(None, Some("debug"), LevelFilter::Debug)]
    #[case(None, None, LevelFilter::Info)]
    fn test_resolve_log_level(
        #[case] from_env: Option<&str>,
        #[case] from_settings: Option<&str>,
        #[case] expected: LevelFilter,
    ) {
        assert_eq!(
            resolve_log_level(from_env, from_settings).unwrap(),
            expected
        );
    }

    #[test]
    fn test_severity_filter() {
        let metadata = |level| log::Metadata::builder().level(level).build();
        let problems = severity_filter(true);
        let progress = severity_filter(false);

        assert!(problems(&metadata(log::Level::Error)));
        assert!(problems(&metadata(log::Level::Warn)));
        assert!(!problems(&metadata(log::Level::Info)));
        assert!(progress(&metadata(log::Level::Info)));
        assert!(progress(&metadata(log::Level::Trace)));
        assert!(!progress(&metadata(log::Level::Warn)));
    }
}
