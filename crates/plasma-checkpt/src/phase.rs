//! Checkpoint service phases.

use std::fmt;

/// Which whole-process serialization operation, if any, is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No checkpoint or restore in progress.
    #[default]
    Idle,
    /// Objects are being written to a stream.
    Checkpoint,
    /// Objects are being materialized and reanimated from a stream.
    Restore,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Checkpoint => write!(f, "checkpoint"),
            Self::Restore => write!(f, "restore"),
        }
    }
}
