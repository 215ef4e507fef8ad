//! Restore-side staging: materialized objects awaiting reanimation.
//!
//! Restore runs in two passes. Materialization reads every record into a
//! staged object without following references. Reanimation then lets each
//! staged object resolve its references against the complete table, after
//! which the owner takes the objects out by identity.

use std::any::{type_name, Any};

use indexmap::IndexMap;
use plasma_core::ObjectId;

use crate::error::CheckpointError;
use crate::record::RecordReader;
use crate::registry::ObjectRegistry;

/// A materialized object that resolves its references in a second pass.
pub trait Reanimate: Any + Send {
    /// Resolve references against the fully materialized table.
    ///
    /// `id` is this object's own identity. The object itself is not
    /// visible in `table` while it reanimates.
    fn reanimate(&mut self, id: ObjectId, table: &ObjectTable) -> Result<(), CheckpointError> {
        let _ = (id, table);
        Ok(())
    }

    /// Upcast for typed lookup.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed removal.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

/// Reads one record into a staged object.
pub type Materializer =
    Box<dyn Fn(&mut RecordReader<'_>) -> Result<Box<dyn Reanimate>, CheckpointError> + Send + Sync>;

/// Materializers keyed by type tag.
#[derive(Default)]
pub struct Materializers {
    table: IndexMap<&'static str, Materializer>,
}

impl Materializers {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the materializer for `tag`, replacing any previous one.
    pub fn define<F>(&mut self, tag: &'static str, f: F)
    where
        F: Fn(&mut RecordReader<'_>) -> Result<Box<dyn Reanimate>, CheckpointError>
            + Send
            + Sync
            + 'static,
    {
        self.table.insert(tag, Box::new(f));
    }

    /// Look up the materializer for a tag read from a stream.
    ///
    /// Returns the interned tag alongside it.
    pub fn resolve(&self, tag: &str) -> Option<(&'static str, &Materializer)> {
        self.table.get_key_value(tag).map(|(k, v)| (*k, v))
    }

    /// Whether a materializer exists for `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.table.contains_key(tag)
    }
}

impl std::fmt::Debug for Materializers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.table.keys()).finish()
    }
}

struct Slot {
    tag: &'static str,
    object: Option<Box<dyn Reanimate>>,
}

/// Staged objects in stream order.
#[derive(Default)]
pub struct ObjectTable {
    slots: IndexMap<ObjectId, Slot>,
}

impl ObjectTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a materialized object.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::StreamFormat`] if `id` is already staged.
    pub fn insert(
        &mut self,
        id: ObjectId,
        tag: &'static str,
        object: Box<dyn Reanimate>,
    ) -> Result<(), CheckpointError> {
        if self.slots.contains_key(&id) {
            return Err(CheckpointError::format(format!(
                "object {id} appears twice in stream"
            )));
        }
        self.slots.insert(
            id,
            Slot {
                tag,
                object: Some(object),
            },
        );
        Ok(())
    }

    /// Number of staged objects.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether every object has been taken.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Type tag of a staged object.
    pub fn tag_of(&self, id: ObjectId) -> Option<&'static str> {
        self.slots.get(&id).map(|s| s.tag)
    }

    /// First staged object with `tag`.
    pub fn find_by_tag(&self, tag: &str) -> Option<ObjectId> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.tag == tag)
            .map(|(id, _)| *id)
    }

    /// Typed view of a staged object.
    pub fn get<T: Reanimate>(&self, id: ObjectId) -> Option<&T> {
        self.slots
            .get(&id)
            .and_then(|slot| slot.object.as_deref())
            .and_then(|obj| obj.as_any().downcast_ref::<T>())
    }

    /// Typed view of the target of a reference held by `from`.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::Unresolved`] if `target` is missing or of
    /// another type.
    pub fn resolve<T: Reanimate>(
        &self,
        from: ObjectId,
        target: ObjectId,
    ) -> Result<&T, CheckpointError> {
        self.get::<T>(target)
            .ok_or(CheckpointError::Unresolved { from, target })
    }

    /// Run the reanimation pass over every staged object, in stream order.
    pub fn reanimate_all(&mut self) -> Result<(), CheckpointError> {
        for index in 0..self.slots.len() {
            let (id, mut object) = match self.slots.get_index_mut(index) {
                Some((id, slot)) => match slot.object.take() {
                    Some(object) => (*id, object),
                    None => continue,
                },
                None => break,
            };
            let result = object.reanimate(id, self);
            if let Some((_, slot)) = self.slots.get_index_mut(index) {
                slot.object = Some(object);
            }
            result?;
        }
        Ok(())
    }

    /// Remove a staged object, transferring ownership to the caller.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::StreamFormat`] if `id` is missing or is not a `T`.
    pub fn take<T: Reanimate>(&mut self, id: ObjectId) -> Result<T, CheckpointError> {
        let slot = self
            .slots
            .shift_remove(&id)
            .ok_or_else(|| CheckpointError::format(format!("object {id} missing from stream")))?;
        let object = slot
            .object
            .ok_or_else(|| CheckpointError::format(format!("object {id} taken during reanimation")))?;
        match object.into_any().downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(_) => Err(CheckpointError::format(format!(
                "object {id} tagged '{}' is not a {}",
                slot.tag,
                type_name::<T>()
            ))),
        }
    }

    /// Snapshot the staged identities as a registry continuing at `cursor`.
    pub fn registry(&self, cursor: u64) -> ObjectRegistry {
        ObjectRegistry::from_parts(self.slots.iter().map(|(id, s)| (*id, s.tag)), cursor)
    }

    /// Staged identities not yet taken.
    pub fn remaining(&self) -> Vec<ObjectId> {
        self.slots.keys().copied().collect()
    }
}

impl std::fmt::Debug for ObjectTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(id, s)| (id, s.tag)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Node {
        next: Option<ObjectId>,
        resolved: Option<u32>,
        value: u32,
    }

    impl Reanimate for Node {
        fn reanimate(&mut self, id: ObjectId, table: &ObjectTable) -> Result<(), CheckpointError> {
            if let Some(next) = self.next {
                self.resolved = Some(table.resolve::<Node>(id, next)?.value);
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
            self
        }
    }

    fn node(next: Option<u64>, value: u32) -> Box<dyn Reanimate> {
        Box::new(Node {
            next: next.map(ObjectId),
            resolved: None,
            value,
        })
    }

    #[test]
    fn forward_references_resolve_after_all_materialized() {
        let mut table = ObjectTable::new();
        table.insert(ObjectId(0), "node", node(Some(1), 10)).unwrap();
        table.insert(ObjectId(1), "node", node(None, 20)).unwrap();
        table.reanimate_all().unwrap();
        let first: Node = table.take(ObjectId(0)).unwrap();
        assert_eq!(first.resolved, Some(20));
        assert_eq!(table.remaining(), vec![ObjectId(1)]);
    }

    #[test]
    fn dangling_reference_is_unresolved() {
        let mut table = ObjectTable::new();
        table.insert(ObjectId(0), "node", node(Some(7), 1)).unwrap();
        match table.reanimate_all() {
            Err(CheckpointError::Unresolved { from, target }) => {
                assert_eq!((from, target), (ObjectId(0), ObjectId(7)));
            }
            other => panic!("expected Unresolved, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_identity_rejected() {
        let mut table = ObjectTable::new();
        table.insert(ObjectId(3), "node", node(None, 1)).unwrap();
        assert!(matches!(
            table.insert(ObjectId(3), "node", node(None, 2)),
            Err(CheckpointError::StreamFormat { .. })
        ));
    }

    #[test]
    fn registry_snapshot_keeps_stream_order() {
        let mut table = ObjectTable::new();
        table.insert(ObjectId(4), "b", node(None, 1)).unwrap();
        table.insert(ObjectId(2), "a", node(None, 1)).unwrap();
        let reg = table.registry(9);
        assert_eq!(
            reg.iter().collect::<Vec<_>>(),
            vec![(ObjectId(4), "b"), (ObjectId(2), "a")]
        );
        assert_eq!(reg.cursor(), 9);
    }
}
