use std::{fmt, path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

use crate::executor::Stage;

pub const DEFAULT_BASE_URL: &str = "https://oaktrust-pre.library.tamu.edu";
pub const DEFAULT_TASKS: &str = "get_collections";

/// Command line configuration. Every flag falls back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "dspace-load")]
#[command(about = "Simulated user traffic against a DSpace repository API", long_about = None)]
#[command(version)]
pub struct Config {
    /// Log file, opened in append mode
    #[arg(long, env = "LOG_FILE", default_value = "default.log")]
    pub log_file: PathBuf,

    /// Minimum severity written to the log file
    #[arg(
        long,
        env = "LOG_LEVEL",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Warning
    )]
    pub log_level: LogLevel,

    /// Comma-separated workflow names to run
    #[arg(long, env = "TASKS", default_value = DEFAULT_TASKS)]
    pub tasks: String,

    /// Base URL of the repository under test
    #[arg(long, env = "URL", default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Number of simulated users (defaults to the CPU count)
    #[arg(long, env = "USERS")]
    pub users: Option<usize>,

    /// Seconds to hold the target rate
    #[arg(long, env = "RUN_TIME", default_value_t = 60)]
    pub run_time: u64,

    /// Target workflow iterations per second; unlimited when absent
    #[arg(long, env = "RPS")]
    pub rps: Option<f64>,

    /// Seconds to ramp from zero up to `--rps`
    #[arg(long, env = "RAMP_UP", default_value_t = 0)]
    pub ramp_up: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 60)]
    pub request_timeout: u64,
}

impl Config {
    pub fn users(&self) -> usize {
        self.users.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Translate the rate flags into executor stages.
    ///
    /// Without `--rps` the users run back to back: a zero-length stage jumps
    /// straight to an effectively infinite rate which is then held.
    pub fn stages(&self) -> Vec<Stage> {
        let hold = Duration::from_secs(self.run_time);
        match self.rps {
            None => vec![Stage::new(Duration::ZERO, f64::MAX), Stage::new(hold, f64::MAX)],
            // A zero ramp-up is a zero-length stage, which jumps straight to `rps`.
            Some(rps) => vec![
                Stage::new(Duration::from_secs(self.ramp_up), rps),
                Stage::new(hold, rps),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
