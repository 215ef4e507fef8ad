//! Owners of component lists.

use crate::family::Family;
use crate::list::ComponentList;

/// Something that owns the list of family `F` together with the registry
/// its members are registered in.
///
/// Prototypes and list mirrors act on a host rather than on a bare list,
/// because tearing a list down must also unregister its members.
pub trait ListHost<F: Family> {
    /// The owned list.
    fn list(&self) -> &ComponentList<F>;

    /// Mutable access to the owned list.
    fn list_mut(&mut self) -> &mut ComponentList<F>;

    /// Destroy every member, unregistering each one.
    fn clear_list(&mut self);
}
