//! Behavior symbol tables.
//!
//! Behaviors are plain function pointers, which cannot be written to a
//! checkpoint. Each family keeps a table mapping a stable symbol name to
//! its function; checkpoints store the name and restore resolves it back
//! through the same table.

use indexmap::IndexMap;

use crate::boundary::{self, BoundaryBehavior};
use crate::collision::CollisionBehavior;
use crate::emitter::EmitterBehavior;
use crate::family::Family;

/// Name-to-function table for one family.
#[derive(Clone, Debug)]
pub struct SymbolTable<B> {
    entries: IndexMap<&'static str, B>,
}

impl<B> Default for SymbolTable<B> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<B: Copy> SymbolTable<B> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `f`, replacing any previous binding.
    pub fn define(&mut self, name: &'static str, f: B) {
        self.entries.insert(name, f);
    }

    /// Look up `name`, returning the interned name with the function.
    pub fn resolve(&self, name: &str) -> Option<(&'static str, B)> {
        self.entries.get_key_value(name).map(|(k, f)| (*k, *f))
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Bound names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Number of bound symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no symbols are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The symbol tables of every family.
///
/// Shared between the simulation that creates components and the
/// restore path that rebuilds them; both must see the same bindings.
#[derive(Clone, Debug, Default)]
pub struct Symbols {
    pub(crate) particle_bc: SymbolTable<BoundaryBehavior>,
    pub(crate) collision_op: SymbolTable<CollisionBehavior>,
    pub(crate) emitter: SymbolTable<EmitterBehavior>,
}

impl Symbols {
    /// Empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables pre-populated with the built-in behaviors.
    pub fn with_builtins() -> Self {
        let mut symbols = Self::new();
        boundary::define_builtin_behaviors(&mut symbols.particle_bc);
        symbols
    }

    /// The table for family `F`.
    pub fn table<F: Family>(&self) -> &SymbolTable<F::Behavior> {
        F::symbols(self)
    }

    /// Mutable table for family `F`.
    pub fn table_mut<F: Family>(&mut self) -> &mut SymbolTable<F::Behavior> {
        F::symbols_mut(self)
    }

    /// Bind a behavior for family `F`.
    pub fn define<F: Family>(&mut self, name: &'static str, f: F::Behavior) -> &mut Self {
        F::symbols_mut(self).define(name, f);
        self
    }
}
