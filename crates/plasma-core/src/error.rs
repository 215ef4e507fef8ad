//! Error types for component construction and list lookup.
//!
//! Checkpoint and restore failures live with the stream machinery in
//! `plasma-checkpt`; this module covers the errors a control layer sees
//! while building and inspecting component lists.

use std::error::Error;
use std::fmt;

use crate::id::{ComponentId, ObjectId};

/// Errors from creating, attaching, or configuring components.
///
/// Construction-time failures leave no registration behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentError {
    /// The component is already linked into a list.
    AlreadyLinked {
        /// Name of the offending component.
        name: String,
    },
    /// A component or collaborator with this name already exists.
    ///
    /// Families do not enforce unique names themselves; callers that
    /// require uniqueness check before creating.
    DuplicateName {
        /// The colliding name.
        name: String,
    },
    /// A required collaborator is missing or inconsistent
    /// (for example, an empty species list).
    Configuration {
        /// Human-readable description of what is missing.
        reason: String,
    },
    /// The named behavior is not present in the family's symbol table.
    UnknownBehavior {
        /// Family label.
        family: &'static str,
        /// The unresolved symbol name.
        symbol: String,
    },
    /// An auxiliary buffer was sized twice.
    AlreadySized {
        /// Name of the offending component.
        name: String,
    },
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyLinked { name } => {
                write!(f, "component '{name}' is already in a list")
            }
            Self::DuplicateName { name } => write!(f, "name '{name}' is already in use"),
            Self::Configuration { reason } => write!(f, "configuration error: {reason}"),
            Self::UnknownBehavior { family, symbol } => {
                write!(f, "unknown {family} behavior '{symbol}'")
            }
            Self::AlreadySized { name } => {
                write!(f, "component '{name}' buffer has already been sized")
            }
        }
    }
}

impl Error for ComponentError {}

/// Errors from keyed or indexed lookup through a list mirror.
///
/// Always recoverable: a failed lookup never touches native state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// Positional lookup past the end of the list.
    Index {
        /// The requested index.
        index: usize,
        /// Number of entries at the time of the lookup.
        len: usize,
    },
    /// No entry with this name.
    Key {
        /// The requested name.
        name: String,
    },
    /// No entry with this component id.
    Id {
        /// The requested id.
        id: ComponentId,
    },
    /// The handle was taken before a destructive mutation of its list.
    Stale {
        /// Object the handle referred to.
        object: ObjectId,
    },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index { index, len } => {
                write!(f, "index {index} out of range for list of length {len}")
            }
            Self::Key { name } => write!(f, "item \"{name}\" not found"),
            Self::Id { id } => write!(f, "no component with id {id}"),
            Self::Stale { object } => {
                write!(f, "handle to {object} was invalidated by a list replacement")
            }
        }
    }
}

impl Error for LookupError {}
