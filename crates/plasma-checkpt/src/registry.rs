//! The object registry: which objects a checkpoint must write.
//!
//! Every checkpointable object registers itself on creation and
//! unregisters on destruction. The registry holds only identities and
//! type tags; the objects themselves are owned elsewhere and reached
//! through an [`ObjectStore`] when a stream is written.

use indexmap::IndexMap;
use plasma_core::ObjectId;

use crate::error::CheckpointError;
use crate::record::RecordWriter;

/// A live object that can serialize itself into a record.
pub trait Checkpoint {
    /// Type tag used to find the materializer on restore.
    fn type_tag(&self) -> &'static str;

    /// Write this object's state.
    ///
    /// References to other objects are written as identities with
    /// [`RecordWriter::ptr`], never as inline copies.
    fn checkpoint(&self, out: &mut RecordWriter) -> Result<(), CheckpointError>;
}

/// Resolves registered identities to live objects at checkpoint time.
pub trait ObjectStore {
    /// The live object registered under `id`, if it is still owned.
    fn object(&self, id: ObjectId) -> Option<&dyn Checkpoint>;
}

/// Ordered set of registered objects with their type tags.
///
/// Registration order is preserved and is the order in which a stream
/// writes and materializes objects. Identities are never reused.
#[derive(Clone, Debug, Default)]
pub struct ObjectRegistry {
    entries: IndexMap<ObjectId, &'static str>,
    cursor: u64,
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from restored entries.
    ///
    /// `cursor` is the next identity to hand out.
    pub fn from_parts(
        entries: impl IntoIterator<Item = (ObjectId, &'static str)>,
        cursor: u64,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            cursor,
        }
    }

    /// Register a new object, returning its identity.
    pub fn register(&mut self, tag: &'static str) -> ObjectId {
        let id = ObjectId(self.cursor);
        self.cursor += 1;
        self.entries.insert(id, tag);
        id
    }

    /// Remove `id`, returning whether it was registered.
    ///
    /// Preserves the order of the remaining entries.
    pub fn unregister(&mut self, id: ObjectId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Type tag of a registered object.
    pub fn tag_of(&self, id: ObjectId) -> Option<&'static str> {
        self.entries.get(&id).copied()
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Next identity to be handed out.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Registered objects in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &'static str)> + '_ {
        self.entries.iter().map(|(id, tag)| (*id, *tag))
    }

    /// Registered identities with no live owner in `store`.
    pub fn orphans(&self, store: &dyn ObjectStore) -> Vec<ObjectId> {
        self.entries
            .keys()
            .copied()
            .filter(|id| store.object(*id).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Only(ObjectId);

    struct Dummy;

    impl Checkpoint for Dummy {
        fn type_tag(&self) -> &'static str {
            "dummy"
        }

        fn checkpoint(&self, _out: &mut RecordWriter) -> Result<(), CheckpointError> {
            Ok(())
        }
    }

    impl ObjectStore for Only {
        fn object(&self, id: ObjectId) -> Option<&dyn Checkpoint> {
            (id == self.0).then_some(&Dummy as &dyn Checkpoint)
        }
    }

    #[test]
    fn identities_are_sequential_and_never_reused() {
        let mut reg = ObjectRegistry::new();
        let a = reg.register("a");
        let b = reg.register("b");
        assert!(reg.unregister(a));
        let c = reg.register("c");
        assert_eq!((a, b, c), (ObjectId(0), ObjectId(1), ObjectId(2)));
        assert_eq!(reg.len(), 2);
        assert!(!reg.unregister(a));
    }

    #[test]
    fn orphans_are_reported_in_order() {
        let mut reg = ObjectRegistry::new();
        let a = reg.register("a");
        let b = reg.register("b");
        let c = reg.register("c");
        assert_eq!(reg.orphans(&Only(b)), vec![a, c]);
    }

    proptest! {
        #[test]
        fn unregister_preserves_relative_order(
            n in 1usize..40,
            drop_mask in proptest::collection::vec(any::<bool>(), 40),
        ) {
            let mut reg = ObjectRegistry::new();
            let ids: Vec<_> = (0..n).map(|_| reg.register("x")).collect();
            let mut kept = Vec::new();
            for (id, drop) in ids.iter().zip(&drop_mask) {
                if *drop {
                    reg.unregister(*id);
                } else {
                    kept.push(*id);
                }
            }
            let order: Vec<_> = reg.iter().map(|(id, _)| id).collect();
            prop_assert_eq!(order, kept);
            prop_assert_eq!(reg.cursor(), n as u64);
        }
    }
}
