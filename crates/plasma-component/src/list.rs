//! Ordered, owned lists of components.
//!
//! A [`ComponentList`] owns its members in an arena kept in append order.
//! Native order (most recently appended first) is the order in which
//! behaviors are applied and in which the `next` links run; it is simply
//! the arena walked backwards.

use std::any::Any;
use std::marker::PhantomData;

use indexmap::IndexMap;
use plasma_checkpt::{
    Checkpoint, CheckpointError, ObjectRegistry, ObjectTable, Reanimate, RecordReader,
    RecordWriter,
};
use plasma_core::{ComponentError, ComponentId, ListInstanceId, ListVersion, ObjectId};
use tracing::debug;

use crate::component::{Component, Link};
use crate::family::{Builtin, Family};

/// Result of a name or id lookup: a built-in variant or a list member.
#[derive(Debug)]
pub enum Lookup<'a, F: Family> {
    /// A reserved fast-path variant that lives in no list.
    Builtin(&'static Builtin<F::Kind>),
    /// A member of the list.
    Member(&'a Component<F>),
}

impl<F: Family> Lookup<'_, F> {
    /// Name of the found component.
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(b) => b.name,
            Self::Member(c) => c.name(),
        }
    }

    /// Id of the found component.
    pub fn id(&self) -> Option<ComponentId> {
        match self {
            Self::Builtin(b) => Some(b.id),
            Self::Member(c) => c.id(),
        }
    }

    /// Kind of the found component.
    pub fn kind(&self) -> F::Kind {
        match self {
            Self::Builtin(b) => b.kind,
            Self::Member(c) => c.kind(),
        }
    }
}

/// The components of one family attached to a simulation.
#[derive(Debug)]
pub struct ComponentList<F: Family> {
    object: ObjectId,
    instance: ListInstanceId,
    members: IndexMap<ObjectId, Component<F>>,
    version: ListVersion,
}

impl<F: Family> ComponentList<F> {
    /// Create and register an empty list.
    pub fn new(registry: &mut ObjectRegistry) -> Self {
        Self {
            object: registry.register(F::LIST_TAG),
            instance: ListInstanceId::next(),
            members: IndexMap::new(),
            version: ListVersion::default(),
        }
    }

    /// Registry identity of the list itself.
    pub fn object_id(&self) -> ObjectId {
        self.object
    }

    /// Process-unique identity of this list instance.
    pub fn instance(&self) -> ListInstanceId {
        self.instance
    }

    /// Version stamp, bumped on every destructive mutation.
    pub fn version(&self) -> ListVersion {
        self.version
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member count as defined by the family.
    pub fn count(&self) -> usize {
        F::count(self)
    }

    /// Link a component into the list and take ownership of it.
    ///
    /// Assigns the component's id and links it to the previous head.
    /// Returns the component's registry identity.
    ///
    /// # Errors
    ///
    /// [`ComponentError::AlreadyLinked`] if the component is already in a
    /// list. The registration belongs to the linked original and is left
    /// untouched.
    pub fn append(&mut self, mut component: Component<F>) -> Result<ObjectId, ComponentError> {
        if component.is_linked() || self.members.contains_key(&component.object_id()) {
            return Err(ComponentError::AlreadyLinked {
                name: component.name().to_string(),
            });
        }
        let id = F::assign_id(component.kind(), self);
        let link = match self.head() {
            Some(head) => Link::Next(head.object_id()),
            None => Link::End,
        };
        component.attach(id, link);
        let object = component.object_id();
        debug!(
            family = F::LABEL,
            name = component.name(),
            %id,
            %object,
            "appended component"
        );
        self.members.insert(object, component);
        Ok(object)
    }

    /// The most recently appended member.
    pub fn head(&self) -> Option<&Component<F>> {
        self.members.last().map(|(_, c)| c)
    }

    /// Members in append order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Component<F>> + ExactSizeIterator {
        self.members.values()
    }

    /// Members in native order (most recently appended first).
    pub fn iter_native(&self) -> impl Iterator<Item = &Component<F>> {
        self.members.values().rev()
    }

    /// Member by registry identity.
    pub fn get(&self, object: ObjectId) -> Option<&Component<F>> {
        self.members.get(&object)
    }

    /// Mutable member by registry identity.
    pub fn get_mut(&mut self, object: ObjectId) -> Option<&mut Component<F>> {
        self.members.get_mut(&object)
    }

    /// Member at append-order position `index`.
    pub fn get_index(&self, index: usize) -> Option<&Component<F>> {
        self.members.get_index(index).map(|(_, c)| c)
    }

    /// Find by name: built-in variants first, then members in native order.
    pub fn find_by_name(&self, name: &str) -> Option<Lookup<'_, F>> {
        if let Some(builtin) = F::builtin_by_name(name) {
            return Some(Lookup::Builtin(builtin));
        }
        self.iter_native()
            .find(|c| c.name() == name)
            .map(Lookup::Member)
    }

    /// Find by id: built-in variants first, then members in native order.
    pub fn find_by_id(&self, id: ComponentId) -> Option<Lookup<'_, F>> {
        if let Some(builtin) = F::builtin_by_id(id) {
            return Some(Lookup::Builtin(builtin));
        }
        self.iter_native()
            .find(|c| c.id() == Some(id))
            .map(Lookup::Member)
    }

    /// Reject `name` if a member already carries it.
    ///
    /// Lists do not enforce unique names; callers that need them check
    /// here before creating.
    pub fn ensure_unique(&self, name: &str) -> Result<(), ComponentError> {
        if self.members.values().any(|c| c.name() == name) {
            return Err(ComponentError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Tear down every member, unregistering each one.
    ///
    /// Bumps the version stamp so outstanding handles and caches see the
    /// mutation even if the list is refilled to the same length.
    pub fn clear(&mut self, registry: &mut ObjectRegistry) {
        let removed = self.members.len();
        for (object, _) in self.members.drain(..).rev() {
            registry.unregister(object);
        }
        self.version = self.version.next();
        debug!(family = F::LABEL, removed, version = %self.version, "cleared list");
    }

    pub(crate) fn member_by_id_mut(&mut self, id: ComponentId) -> Option<&mut Component<F>> {
        self.members
            .values_mut()
            .rev()
            .find(|c| c.id() == Some(id))
    }

    /// Mutable members in native order, paired with their behavior.
    pub(crate) fn native_parts_mut(
        &mut self,
    ) -> impl Iterator<Item = (&mut F::Params, Option<F::Behavior>)> {
        self.members.values_mut().rev().map(|c| c.parts_mut())
    }
}

impl<F: Family> Checkpoint for ComponentList<F> {
    fn type_tag(&self) -> &'static str {
        F::LIST_TAG
    }

    fn checkpoint(&self, out: &mut RecordWriter) -> Result<(), CheckpointError> {
        out.put_u64(self.members.len() as u64);
        out.put_u64(self.version.0);
        out.ptr(self.head().map(|c| c.object_id()));
        Ok(())
    }
}

/// A list materialized from a checkpoint, before its members are taken.
#[derive(Debug)]
pub struct StagedList<F: Family> {
    object: ObjectId,
    count: u64,
    version: ListVersion,
    head: Option<ObjectId>,
    members: Vec<ObjectId>,
    _family: PhantomData<fn() -> F>,
}

impl<F: Family> StagedList<F> {
    /// Read a list record.
    pub fn materialize(input: &mut RecordReader<'_>) -> Result<Self, CheckpointError> {
        Ok(Self {
            object: input.object(),
            count: input.get_u64()?,
            version: ListVersion(input.get_u64()?),
            head: input.ptr()?,
            members: Vec::new(),
            _family: PhantomData,
        })
    }

    /// Member identities in append order, available after reanimation.
    pub fn members(&self) -> &[ObjectId] {
        &self.members
    }

    /// Move the members out of `table` into a live list.
    ///
    /// Each member's id must be the one the family would assign when
    /// appending it at its position.
    pub fn into_list(self, table: &mut ObjectTable) -> Result<ComponentList<F>, CheckpointError> {
        let mut list = ComponentList {
            object: self.object,
            instance: ListInstanceId::next(),
            members: IndexMap::with_capacity(self.members.len()),
            version: self.version,
        };
        for object in self.members {
            let component: Component<F> = table.take(object)?;
            let expected = F::assign_id(component.kind(), &list);
            if component.id() != Some(expected) {
                return Err(CheckpointError::format(format!(
                    "{} {object} '{}' has id {}, expected {expected} at position {}",
                    F::LABEL,
                    component.name(),
                    component
                        .id()
                        .map_or_else(|| "none".to_string(), |id| id.to_string()),
                    list.len()
                )));
            }
            list.members.insert(object, component);
        }
        Ok(list)
    }
}

impl<F: Family> Reanimate for StagedList<F> {
    /// Walk the `next` chain from the head and store it in append order.
    fn reanimate(&mut self, id: ObjectId, table: &ObjectTable) -> Result<(), CheckpointError> {
        let mut native = Vec::new();
        let mut cursor = self.head;
        while let Some(object) = cursor {
            if native.len() as u64 >= self.count {
                return Err(CheckpointError::format(format!(
                    "{} list {id} chain is longer than its count {}",
                    F::LABEL,
                    self.count
                )));
            }
            let component = table.resolve::<Component<F>>(id, object)?;
            native.push(object);
            cursor = match component.link() {
                Some(Link::Next(next)) => Some(next),
                Some(Link::End) => None,
                None => {
                    return Err(CheckpointError::format(format!(
                        "{} {object} in list {id} is not linked",
                        F::LABEL
                    )))
                }
            };
        }
        if native.len() as u64 != self.count {
            return Err(CheckpointError::format(format!(
                "{} list {id} holds {} members, record says {}",
                F::LABEL,
                native.len(),
                self.count
            )));
        }
        native.reverse();
        self.members = native;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryKind, BoundaryParams, ParticleBc};
    use crate::symbols::Symbols;

    fn tallies(registry: &mut ObjectRegistry, names: &[&str]) -> ComponentList<ParticleBc> {
        let symbols = Symbols::with_builtins();
        let mut list = ComponentList::new(registry);
        for name in names {
            let c = Component::create(
                registry,
                &symbols,
                name,
                BoundaryKind::AbsorbTally,
                BoundaryParams::None,
                Some("absorb_tally"),
            )
            .unwrap();
            list.append(c).unwrap();
        }
        list
    }

    fn staged(list: &ComponentList<ParticleBc>) -> (StagedList<ParticleBc>, ObjectTable) {
        let mut table = ObjectTable::new();
        for c in list.iter() {
            table
                .insert(c.object_id(), ParticleBc::TAG, Box::new(c.clone()))
                .unwrap();
        }
        let staged = StagedList {
            object: list.object_id(),
            count: list.len() as u64,
            version: list.version(),
            head: list.head().map(|c| c.object_id()),
            members: list.iter().map(|c| c.object_id()).collect(),
            _family: PhantomData,
        };
        (staged, table)
    }

    #[test]
    fn debug_output_names_members_and_behaviors() {
        let mut registry = ObjectRegistry::new();
        let list = tallies(&mut registry, &["left"]);
        let rendered = format!("{list:?}");
        assert!(rendered.contains("\"left\""), "{rendered}");
        assert!(rendered.contains("absorb_tally"), "{rendered}");
    }

    #[test]
    fn restored_list_gets_fresh_instance() {
        let mut registry = ObjectRegistry::new();
        let list = tallies(&mut registry, &["a", "b"]);
        let (staged, mut table) = staged(&list);
        let restored = staged.into_list(&mut table).unwrap();
        assert_eq!(restored.object_id(), list.object_id());
        assert_ne!(restored.instance(), list.instance());
        assert_eq!(restored.count(), 2);
    }

    #[test]
    fn restored_ids_out_of_sequence_are_rejected() {
        let mut registry = ObjectRegistry::new();
        let mut list = tallies(&mut registry, &["a", "b"]);
        let first = list.get_index(0).unwrap().object_id();
        let (_, second) = list.members.get_index_mut(1).unwrap();
        second.attach(ComponentId(-9), Link::Next(first));

        let (staged, mut table) = staged(&list);
        match staged.into_list(&mut table) {
            Err(CheckpointError::StreamFormat { detail }) => {
                assert!(detail.contains("expected -4"), "{detail}")
            }
            other => panic!("expected StreamFormat, got {other:?}"),
        }
    }
}
