//! The component family abstraction.
//!
//! A family is a zero-sized marker type naming one kind of pluggable
//! behavior (particle boundary conditions, collision operators, emitters).
//! Everything that differs between families (the closed kind enumeration,
//! parameter payload, behavior signature, id assignment and counting) is
//! expressed through the [`Family`] trait; [`Component`] and
//! [`ComponentList`] are written once against it.
//!
//! [`Component`]: crate::component::Component
//! [`ComponentList`]: crate::list::ComponentList

use std::fmt;

use plasma_checkpt::Persist;
use plasma_core::ComponentId;

use crate::list::ComponentList;
use crate::symbols::{SymbolTable, Symbols};

/// Closed enumeration of the variants within a family.
pub trait Kind: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Stable numeric code written to checkpoints.
    fn code(self) -> u32;

    /// Inverse of [`code`](Self::code).
    fn from_code(code: u32) -> Option<Self>;

    /// Human-readable label.
    fn label(self) -> &'static str;
}

/// A built-in fast-path variant recognized without being in any list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Builtin<K> {
    /// Fixed name.
    pub name: &'static str,
    /// Reserved id.
    pub id: ComponentId,
    /// Variant kind.
    pub kind: K,
}

/// One kind of pluggable, checkpointable component.
pub trait Family: Sized + Send + 'static {
    /// Human-readable family name used in errors and logs.
    const LABEL: &'static str;
    /// Registry type tag of a component.
    const TAG: &'static str;
    /// Registry type tag of the family's list.
    const LIST_TAG: &'static str;
    /// Built-in variants with reserved ids, checked before list members.
    const BUILTINS: &'static [Builtin<Self::Kind>];

    /// The family's variant enumeration.
    type Kind: Kind;
    /// Per-instance parameter payload.
    type Params: Persist + Clone + fmt::Debug + Send + 'static;
    /// Behavior function pointer.
    type Behavior: Copy + fmt::Debug + Send + Sync + 'static;

    /// Id for a component of `kind` about to be appended to `list`.
    fn assign_id(kind: Self::Kind, list: &ComponentList<Self>) -> ComponentId;

    /// Number of members of `list`.
    fn count(list: &ComponentList<Self>) -> usize {
        list.len()
    }

    /// This family's behavior symbol table.
    fn symbols(symbols: &Symbols) -> &SymbolTable<Self::Behavior>;

    /// Mutable access to this family's behavior symbol table.
    fn symbols_mut(symbols: &mut Symbols) -> &mut SymbolTable<Self::Behavior>;

    /// The built-in variant with reserved `id`, if any.
    fn builtin_by_id(id: ComponentId) -> Option<&'static Builtin<Self::Kind>> {
        Self::BUILTINS.iter().find(|b| b.id == id)
    }

    /// The built-in variant named `name`, if any.
    fn builtin_by_name(name: &str) -> Option<&'static Builtin<Self::Kind>> {
        Self::BUILTINS.iter().find(|b| b.name == name)
    }
}
