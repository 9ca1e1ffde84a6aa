//! Program logging, built on `fern`.
//!
//! Scenario runs report progress for each simulated year at `info`, dispatch detail at `debug` and
//! unmet carbon targets or failed runs as warnings and errors.
use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::{Level, LevelFilter};
use std::env;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the GRIDCAST_LOG_LEVEL
/// environment variable or the settings.toml file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level
const LOG_LEVEL_ENV_VAR: &str = "GRIDCAST_LOG_LEVEL";

/// The file name for the log file containing messages about the ordinary operation of gridcast
const LOG_INFO_FILE_NAME: &str = "gridcast_info.log";

/// The file name for the log file containing warnings and error messages
const LOG_ERROR_FILE_NAME: &str = "gridcast_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Where a chain of the logger writes to
#[derive(Clone, Copy)]
enum Sink {
    /// Messages below warning level
    Progress,
    /// Warnings and errors
    Problems,
}

impl Sink {
    fn accepts(self, level: Level) -> bool {
        match self {
            Self::Progress => level > Level::Warn,
            Self::Problems => level <= Level::Warn,
        }
    }
}

/// Initialise the program logger.
///
/// The level comes from the `GRIDCAST_LOG_LEVEL` environment variable if set, otherwise from
/// `settings.toml`. One of `off`, `error`, `warn`, `info`, `debug` or `trace`.
///
/// Progress messages go to stdout and problems to stderr, coloured by level when attached to a
/// terminal. If `log_file_path` is given, the same messages are also written to
/// `gridcast_info.log` and `gridcast_error.log` in that directory.
///
/// Only the first call in a process has any effect.
pub fn init(log_level_from_settings: &str, log_file_path: Option<&Path>) -> Result<()> {
    if is_logger_initialised() {
        return Ok(());
    }

    let log_level = match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => parse_log_level(&level)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}"))?,
        Err(_) => parse_log_level(log_level_from_settings)?,
    };

    let mut dispatch = Dispatch::new()
        .chain(console_chain(
            Sink::Progress,
            log_level,
            std::io::stdout().is_terminal(),
        ))
        .chain(console_chain(
            Sink::Problems,
            log_level.min(LevelFilter::Warn),
            std::io::stderr().is_terminal(),
        ));

    if let Some(dir) = log_file_path {
        // Files always record at least run progress, whatever the console shows
        dispatch = dispatch
            .chain(file_chain(
                Sink::Progress,
                log_level.max(LevelFilter::Info),
                &dir.join(LOG_INFO_FILE_NAME),
            )?)
            .chain(file_chain(
                Sink::Problems,
                LevelFilter::Warn,
                &dir.join(LOG_ERROR_FILE_NAME),
            )?);
    }

    dispatch
        .apply()
        .map_err(|_| anyhow!("Logger already initialised"))?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// A chain writing to stdout or stderr
fn console_chain(sink: Sink, level: LevelFilter, use_colour: bool) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let chain = Dispatch::new()
        .filter(move |metadata| sink.accepts(metadata.level()))
        .level(level)
        .format(move |out, message, record| {
            let timestamp = Local::now().format("%H:%M:%S");
            if use_colour {
                let level = colours.color(record.level());
                out.finish(format_args!("[{timestamp} {level}] {message}"));
            } else {
                let level = record.level();
                out.finish(format_args!("[{timestamp} {level}] {message}"));
            }
        });

    match sink {
        Sink::Progress => chain.chain(std::io::stdout()),
        Sink::Problems => chain.chain(std::io::stderr()),
    }
}

/// A chain writing to a newly created log file, with full timestamps and the message source
fn file_chain(sink: Sink, level: LevelFilter, file_path: &Path) -> Result<Dispatch> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))?;

    Ok(Dispatch::new()
        .filter(move |metadata| sink.accepts(metadata.level()))
        .level(level)
        .format(|out, message, record| {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            out.finish(format_args!(
                "[{timestamp} {} {}] {message}",
                record.level(),
                record.target()
            ));
        })
        .chain(file))
}

/// Convert a log level string to a [`LevelFilter`]
fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    match log_level.trim().to_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        unknown => bail!("Unknown log level: {unknown}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("WARN", LevelFilter::Warn)]
    #[case("debug", LevelFilter::Debug)]
    #[case(" Info ", LevelFilter::Info)]
    fn test_parse_log_level(#[case] level: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_log_level(level).unwrap(), expected);
    }

    #[test]
    fn test_parse_log_level_unknown() {
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_sink_accepts() {
        assert!(Sink::Progress.accepts(Level::Info));
        assert!(Sink::Progress.accepts(Level::Trace));
        assert!(!Sink::Progress.accepts(Level::Warn));
        assert!(Sink::Problems.accepts(Level::Warn));
        assert!(Sink::Problems.accepts(Level::Error));
        assert!(!Sink::Problems.accepts(Level::Debug));
    }
}
