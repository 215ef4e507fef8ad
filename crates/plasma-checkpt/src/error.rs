//! Error types for checkpoint and restore.

use std::fmt;
use std::io;

use plasma_core::ObjectId;

use crate::phase::Phase;

/// Errors that can occur while writing, reading, or reassembling a
/// checkpoint stream.
#[derive(Debug)]
pub enum CheckpointError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The stream does not start with the expected `b"PLCK"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the stream.
        found: u8,
    },
    /// The stream structure does not match what the reader expects
    /// (truncation, count mismatch, unconsumed record bytes, ...).
    StreamFormat {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A record carries a type tag with no registered materializer.
    UnknownTypeTag {
        /// The unrecognized tag.
        tag: String,
    },
    /// A deferred reference could not be resolved during reanimation.
    Unresolved {
        /// Object holding the reference.
        from: ObjectId,
        /// The missing (or wrongly typed) target.
        target: ObjectId,
    },
    /// Registered objects have no live owner and cannot be written.
    Orphaned {
        /// The orphaned identities, in registration order.
        ids: Vec<ObjectId>,
    },
    /// A checkpoint or restore was requested while another one is running.
    Reentrant {
        /// The phase that was requested.
        requested: Phase,
        /// The phase already in progress.
        active: Phase,
    },
    /// The control layer failed to serialize or deserialize its state.
    ControlState {
        /// Description from the control layer.
        reason: String,
    },
    /// Another rank reported a failure at a restore barrier.
    PeerFailed {
        /// The barrier at which the failure was observed.
        stage: &'static str,
    },
    /// The rank communicator itself failed.
    Comm {
        /// Description of the communication failure.
        reason: String,
    },
}

impl CheckpointError {
    /// Build a [`CheckpointError::StreamFormat`] from any displayable detail.
    pub fn format(detail: impl Into<String>) -> Self {
        Self::StreamFormat {
            detail: detail.into(),
        }
    }

    /// Whether the run must be terminated rather than retried.
    ///
    /// Ordering and cross-rank consistency violations leave the
    /// cooperating processes in potentially divergent states.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StreamFormat { .. }
                | Self::UnknownTypeTag { .. }
                | Self::Unresolved { .. }
                | Self::Reentrant { .. }
                | Self::PeerFailed { .. }
                | Self::Comm { .. }
        )
    }
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"PLCK\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported checkpoint format version {found}")
            }
            Self::StreamFormat { detail } => write!(f, "malformed checkpoint stream: {detail}"),
            Self::UnknownTypeTag { tag } => write!(f, "no materializer for type tag '{tag}'"),
            Self::Unresolved { from, target } => {
                write!(f, "object {from} references unresolved object {target}")
            }
            Self::Orphaned { ids } => {
                write!(f, "{} registered object(s) unreachable: ", ids.len())?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{id}")?;
                }
                Ok(())
            }
            Self::Reentrant { requested, active } => {
                write!(f, "cannot begin {requested} while {active} is in progress")
            }
            Self::ControlState { reason } => write!(f, "control state: {reason}"),
            Self::PeerFailed { stage } => write!(f, "a peer rank failed during {stage}"),
            Self::Comm { reason } => write!(f, "rank communication failed: {reason}"),
        }
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            return Self::format(format!("truncated stream: {e}"));
        }
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_eof_is_a_format_error() {
        let err: CheckpointError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, CheckpointError::StreamFormat { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn plain_io_errors_are_not_fatal() {
        let err: CheckpointError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, CheckpointError::Io(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn orphaned_lists_every_id() {
        let err = CheckpointError::Orphaned {
            ids: vec![ObjectId(3), ObjectId(9)],
        };
        assert_eq!(err.to_string(), "2 registered object(s) unreachable: #3, #9");
    }

    #[test]
    fn reentrant_names_both_phases() {
        let err = CheckpointError::Reentrant {
            requested: Phase::Checkpoint,
            active: Phase::Restore,
        };
        assert_eq!(
            err.to_string(),
            "cannot begin checkpoint while restore is in progress"
        );
    }
}
