//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of an object registered for checkpointing.
///
/// Allocated sequentially by the object registry of the owning simulation.
/// Identities are written verbatim into checkpoint streams and restored
/// unchanged, so an `ObjectId` names the same object across a process
/// restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifier of a component within its family list.
///
/// Negative values below a family-specific threshold are reserved for
/// built-in fast-path variants; the rest are assigned when a component is
/// appended to a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub i64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ComponentId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Version stamp of a component list.
///
/// Bumped on every destructive mutation (teardown, bulk replace) so that
/// caches and handles can detect staleness even when the member count is
/// unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListVersion(pub u64);

impl ListVersion {
    /// The version following this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ListVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

static LIST_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one component list instance.
///
/// Unlike the list's [`ObjectId`], which every simulation allocates from
/// the same sequence, two live lists never share an instance id. A list
/// restored from a checkpoint gets a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListInstanceId(u64);

impl ListInstanceId {
    /// Allocate an id never returned before in this process.
    pub fn next() -> Self {
        Self(LIST_INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_display_is_prefixed() {
        assert_eq!(ObjectId(7).to_string(), "#7");
    }

    #[test]
    fn list_version_advances() {
        let v = ListVersion::default();
        assert_eq!(v.next(), ListVersion(1));
        assert_eq!(ListVersion(u64::MAX).next(), ListVersion(0));
    }

    #[test]
    fn list_instance_ids_are_unique() {
        let a = ListInstanceId::next();
        let b = ListInstanceId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
