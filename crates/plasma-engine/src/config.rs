//! Process services configuration, validation, and error types.
//!
//! [`ServicesConfig`] is the input to [`Services::boot`]. It can be filled
//! in directly or by consuming the service flags from a command line with
//! [`strip_args`](ServicesConfig::strip_args).
//!
//! [`Services::boot`]: crate::services::Services::boot

use std::error::Error;
use std::fmt;
use std::str::FromStr;

// ── ServiceLayer ───────────────────────────────────────────────────

/// A process-wide service brought up at boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceLayer {
    /// The checkpoint service. Always first up, last down.
    Checkpoint,
    /// Worker thread pipelines.
    Threads,
    /// The inter-rank communication layer.
    Comm,
}

impl fmt::Display for ServiceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkpoint => write!(f, "checkpoint"),
            Self::Threads => write!(f, "threads"),
            Self::Comm => write!(f, "comm"),
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`ServicesConfig::validate()`] or while
/// stripping service flags from a command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Fewer than one thread pipeline requested.
    ThreadPipelines {
        /// The configured value.
        configured: usize,
    },
    /// Fewer than one serial pipeline requested.
    SerialPipelines {
        /// The configured value.
        configured: usize,
    },
    /// A service flag was given without a value.
    MissingValue {
        /// The flag.
        flag: &'static str,
    },
    /// A service flag value could not be parsed.
    InvalidValue {
        /// The flag.
        flag: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadPipelines { configured } => {
                write!(f, "thread_pipelines must be >= 1, got {configured}")
            }
            Self::SerialPipelines { configured } => {
                write!(f, "serial_pipelines must be >= 1, got {configured}")
            }
            Self::MissingValue { flag } => write!(f, "{flag} requires a value"),
            Self::InvalidValue { flag, value } => {
                write!(f, "invalid value '{value}' for {flag}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── ServicesConfig ─────────────────────────────────────────────────

/// Flag for the number of thread pipelines.
pub const TPP_FLAG: &str = "--tpp";
/// Flag for the number of serial pipelines.
pub const SERIAL_FLAG: &str = "--serial.n_pipeline";
/// Flag for dispatching work to the host thread.
pub const DISPATCH_FLAG: &str = "--dispatch_to_host";

/// Configuration for booting process services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicesConfig {
    /// Number of worker thread pipelines. Default: 1. Minimum: 1.
    pub thread_pipelines: usize,
    /// Number of serial pipelines. Default: 1. Minimum: 1.
    pub serial_pipelines: usize,
    /// Whether the host thread also runs pipeline work. Default: true.
    pub dispatch_to_host: bool,
    /// Bring up the communication layer before the thread pipelines.
    /// Default: false.
    pub comm_first: bool,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            thread_pipelines: 1,
            serial_pipelines: 1,
            dispatch_to_host: true,
            comm_first: false,
        }
    }
}

impl ServicesConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_pipelines < 1 {
            return Err(ConfigError::ThreadPipelines {
                configured: self.thread_pipelines,
            });
        }
        if self.serial_pipelines < 1 {
            return Err(ConfigError::SerialPipelines {
                configured: self.serial_pipelines,
            });
        }
        Ok(())
    }

    /// The order in which services come up. Halting runs it backwards.
    pub fn boot_order(&self) -> [ServiceLayer; 3] {
        if self.comm_first {
            [ServiceLayer::Checkpoint, ServiceLayer::Comm, ServiceLayer::Threads]
        } else {
            [ServiceLayer::Checkpoint, ServiceLayer::Threads, ServiceLayer::Comm]
        }
    }

    /// Consume the service flags from `args`, leaving everything else.
    ///
    /// Accepts both `--flag value` and `--flag=value`. The dispatch flag
    /// takes an integer, nonzero meaning true. Later occurrences win.
    /// On error neither `self` nor `args` is changed.
    pub fn strip_args(&mut self, args: &mut Vec<String>) -> Result<(), ConfigError> {
        let mut parsed = self.clone();
        let mut kept = Vec::with_capacity(args.len());
        let mut iter = args.iter().cloned();
        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };
            let flag = match flag.as_str() {
                TPP_FLAG => TPP_FLAG,
                SERIAL_FLAG => SERIAL_FLAG,
                DISPATCH_FLAG => DISPATCH_FLAG,
                _ => {
                    kept.push(arg);
                    continue;
                }
            };
            let value = match inline {
                Some(value) => value,
                None => iter.next().ok_or(ConfigError::MissingValue { flag })?,
            };
            match flag {
                TPP_FLAG => parsed.thread_pipelines = parse(flag, &value)?,
                SERIAL_FLAG => parsed.serial_pipelines = parse(flag, &value)?,
                _ => parsed.dispatch_to_host = parse::<i64>(flag, &value)? != 0,
            }
        }
        *self = parsed;
        *args = kept;
        Ok(())
    }
}

fn parse<T: FromStr>(flag: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag,
        value: value.to_string(),
    })
}
