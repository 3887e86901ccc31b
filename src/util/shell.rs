//! Status output on stderr.
//!
//! Every command reports through one shared `Shell`; callers pick a semantic
//! `Status` and the shell renders the aligned, colored prefix. All of it goes
//! to stderr, because stdout is reserved for machine-readable results such as
//! artifact paths and matrix JSON.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Column width of the status prefix.
const STATUS_WIDTH: usize = 12;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Default: status messages + progress bars
    #[default]
    Normal,
    /// --verbose: tracing detail enabled, progress bars suppressed
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

/// Semantic status of a reported line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Created,
    Finished,
    Building,
    Fetching,
    Testing,
    Running,
    Info,
    Skipped,
    Warning,
    Error,
}

impl Status {
    /// Render the right-aligned prefix, with ANSI color when `colored`.
    fn render(self, colored: bool) -> String {
        let label = match self {
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Building => "Building",
            Status::Fetching => "Fetching",
            Status::Testing => "Testing",
            Status::Running => "Running",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        };
        if !colored {
            return format!("{label:>STATUS_WIDTH$}");
        }
        // bold green / cyan / blue / yellow / red
        let ansi = match self {
            Status::Created | Status::Finished => "\x1b[1;32m",
            Status::Building | Status::Fetching | Status::Testing | Status::Running => {
                "\x1b[1;36m"
            }
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        };
        format!("{ansi}{label:>STATUS_WIDTH$}\x1b[0m")
    }
}

/// Central sink for all CLI status output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    colored: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let colored = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };
        Shell { verbosity, colored }
    }

    /// Build a shell from the global `--verbose` / `--no-color` flags.
    pub fn from_flags(verbose: bool, no_color: bool) -> Self {
        Shell::new(
            if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            },
            if no_color {
                ColorChoice::Never
            } else {
                ColorChoice::Auto
            },
        )
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Report one `{status:>12} {message}` line.
    pub fn status(&self, status: Status, msg: impl Display) {
        eprintln!("{} {}", status.render(self.colored), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Byte-granularity progress for downloads.
    ///
    /// Verbose mode and unknown totals degrade to a silent handle so logs
    /// stay line-oriented.
    pub fn bytes_progress(&self, msg: impl Display, total_bytes: u64) -> Progress {
        if self.is_verbose() || total_bytes <= 1 {
            return Progress { bar: None };
        }
        let bar = ProgressBar::new(total_bytes);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(msg.to_string());
        Progress { bar: Some(bar) }
    }
}

/// Download progress handle; a no-op outside interactive normal mode.
pub struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn inc(&mut self, delta: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Human-readable duration: seconds under a minute, tenths of minutes above.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
