//! Handles to list members held by a control layer.

use std::fmt;
use std::marker::PhantomData;

use plasma_component::{Component, ComponentList, Family};
use plasma_core::{ListInstanceId, ListVersion, LookupError, ObjectId};

/// A reference to a list member that does not borrow the list.
///
/// Carries the list instance and version it was taken at. Once the list is
/// torn down (and its version bumped) the handle no longer resolves, even
/// if a new member happens to reuse its position. It never resolves
/// against a different list.
pub struct ComponentHandle<F: Family> {
    list: ListInstanceId,
    object: ObjectId,
    version: ListVersion,
    _family: PhantomData<fn() -> F>,
}

impl<F: Family> ComponentHandle<F> {
    pub(crate) fn new(list: ListInstanceId, object: ObjectId, version: ListVersion) -> Self {
        Self {
            list,
            object,
            version,
            _family: PhantomData,
        }
    }

    /// Registry identity of the member.
    pub fn object_id(&self) -> ObjectId {
        self.object
    }

    /// Instance of the list the handle was taken from.
    pub fn list(&self) -> ListInstanceId {
        self.list
    }

    /// List version the handle was taken at.
    pub fn version(&self) -> ListVersion {
        self.version
    }

    /// The member this handle refers to.
    ///
    /// # Errors
    ///
    /// [`LookupError::Stale`] if `list` is not the list the handle was
    /// taken from, the list was destructively mutated after the handle was
    /// taken, or the member is no longer in `list`.
    pub fn resolve<'a>(&self, list: &'a ComponentList<F>) -> Result<&'a Component<F>, LookupError> {
        if list.instance() != self.list || list.version() != self.version {
            return Err(LookupError::Stale {
                object: self.object,
            });
        }
        list.get(self.object).ok_or(LookupError::Stale {
            object: self.object,
        })
    }
}

impl<F: Family> Clone for ComponentHandle<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: Family> Copy for ComponentHandle<F> {}

impl<F: Family> PartialEq for ComponentHandle<F> {
    fn eq(&self, other: &Self) -> bool {
        self.list == other.list && self.object == other.object && self.version == other.version
    }
}

impl<F: Family> Eq for ComponentHandle<F> {}

impl<F: Family> fmt::Debug for ComponentHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}@{})", F::LABEL, self.object, self.version)
    }
}
