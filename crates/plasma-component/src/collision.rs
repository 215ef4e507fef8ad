//! Collision operators.

use plasma_core::{ComponentId, SpeciesList};

use crate::family::{Builtin, Family, Kind};
use crate::list::ComponentList;
use crate::symbols::{SymbolTable, Symbols};

/// Collision operator variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    /// Unspecified.
    Unknown,
    /// Langevin drag and diffusion.
    Langevin,
    /// Takizuke-Abe binary collisions.
    TakizukeAbe,
    /// User-supplied operator.
    User,
}

impl Kind for CollisionKind {
    fn code(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Langevin => 1,
            Self::TakizukeAbe => 2,
            Self::User => 3,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Langevin),
            2 => Some(Self::TakizukeAbe),
            3 => Some(Self::User),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Langevin => "langevin",
            Self::TakizukeAbe => "takizuke-abe",
            Self::User => "user",
        }
    }
}

/// Collision behavior: operator state plus the species it acts on.
pub type CollisionBehavior = fn(&mut Vec<u8>, &mut SpeciesList);

/// Collision operator family marker.
#[derive(Clone, Copy, Debug)]
pub enum CollisionOp {}

impl Family for CollisionOp {
    const LABEL: &'static str = "collision operator";
    const TAG: &'static str = "collision_op";
    const LIST_TAG: &'static str = "collision_op_list";
    const BUILTINS: &'static [Builtin<CollisionKind>] = &[];

    type Kind = CollisionKind;
    type Params = Vec<u8>;
    type Behavior = CollisionBehavior;

    fn assign_id(_kind: CollisionKind, list: &ComponentList<Self>) -> ComponentId {
        ComponentId(Self::count(list) as i64)
    }

    fn symbols(symbols: &Symbols) -> &SymbolTable<CollisionBehavior> {
        &symbols.collision_op
    }

    fn symbols_mut(symbols: &mut Symbols) -> &mut SymbolTable<CollisionBehavior> {
        &mut symbols.collision_op
    }
}

impl ComponentList<CollisionOp> {
    /// Apply every operator in native order (most recently appended first).
    pub fn apply_all(&mut self, species: &mut SpeciesList) {
        for (state, behavior) in self.native_parts_mut() {
            if let Some(f) = behavior {
                f(state, species);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use plasma_checkpt::ObjectRegistry;

    fn stamp(state: &mut Vec<u8>, species: &mut SpeciesList) {
        let marker = state[0];
        if let Some(s) = species.get_mut(0) {
            s.np = s.np * 10 + u64::from(marker);
        }
    }

    #[test]
    fn ids_count_up_and_apply_runs_most_recent_first() {
        let mut symbols = Symbols::new();
        symbols.define::<CollisionOp>("stamp", stamp);
        let mut reg = ObjectRegistry::new();
        let mut list = ComponentList::<CollisionOp>::new(&mut reg);
        for (name, marker) in [("first", 1u8), ("second", 2u8)] {
            let c = Component::create(
                &mut reg,
                &symbols,
                name,
                CollisionKind::User,
                vec![marker],
                Some("stamp"),
            )
            .unwrap();
            list.append(c).unwrap();
        }
        let ids: Vec<_> = list.iter().map(|c| c.id().unwrap()).collect();
        assert_eq!(ids, vec![ComponentId(0), ComponentId(1)]);

        let mut species = SpeciesList::new();
        species.define("ion", 1.0, 1836.0).unwrap();
        list.apply_all(&mut species);
        assert_eq!(species.get(0).unwrap().np, 21);
    }

    #[test]
    fn no_builtins() {
        let mut reg = ObjectRegistry::new();
        let list = ComponentList::<CollisionOp>::new(&mut reg);
        assert!(list.find_by_id(ComponentId(-1)).is_none());
    }
}
