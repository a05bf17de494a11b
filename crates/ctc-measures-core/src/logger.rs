//! Log output of the measurement runs.
//!
//! Both backends take their level from a [`Verbosity`], the `-q`/`-v` pair
//! of the command line. The plain backend writes one line per record to
//! stderr:
//!
//! ```text
//! [   0.412s] measure: classifying 92 frames against 01_RES
//! [   3.108s] WARN measure: RES: track 4 ends at 95, past the last frame 91
//! ```
//!
//! The context is the emitting module with the `ctc_measures` crate prefix
//! removed, so a line names the stage (classification, consistency, a BIO
//! measure) it came from. The level is printed for everything but `INFO`.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

/// Requested amount of log output: `quiet` keeps warnings and errors, each
/// `verbose` step adds a level below `info`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verbosity {
    pub quiet: bool,
    pub verbose: u8,
}

impl Verbosity {
    pub fn new(quiet: bool, verbose: u8) -> Self {
        Self { quiet, verbose }
    }

    pub fn level(self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Warn,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub fn directive(self) -> &'static str {
        match self.level() {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }
}

/// Module path of a record without the crate prefix, e.g.
/// `ctc_measures_tracking::bio::division` becomes `tracking::bio::division`.
fn context(target: &str) -> &str {
    match target.strip_prefix("ctc_measures") {
        Some("") => "measures",
        Some(rest) => rest
            .strip_prefix('_')
            .or_else(|| rest.strip_prefix("::"))
            .unwrap_or(rest),
        None => target,
    }
}

struct Line<'a> {
    elapsed: f64,
    level: Level,
    target: &'a str,
    args: &'a fmt::Arguments<'a>,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:8.3}s] ", self.elapsed)?;
        if self.level != Level::Info {
            write!(f, "{} ", self.level)?;
        }
        write!(f, "{}: {}", context(self.target), self.args)
    }
}

struct RunLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for RunLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Line {
            elapsed: self.started.elapsed().as_secs_f64(),
            level: record.level(),
            target: record.target(),
            args: record.args(),
        };
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<RunLogger> = OnceLock::new();

/// Install the stderr logger at the level `verbosity` asks for.
///
/// Only the first call installs the logger; later calls return `Ok(())`.
pub fn init_with_level(verbosity: Verbosity) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let level = verbosity.level();
        let logger = LOGGER.get_or_init(|| RunLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber; `RUST_LOG` wins over `verbosity`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    if json {
        let _ = tracing_fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = tracing_fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(tracing_fmt::time::Uptime::default())
            .with_target(false)
            .finish()
            .try_init();
    }
}
