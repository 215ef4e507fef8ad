//! Particle emitters.
//!
//! An emitter carries an opaque state blob and, once sized, a voxel
//! buffer listing where it emits. The buffer can be sized exactly once.

use plasma_checkpt::{CheckpointError, Persist, RecordReader, RecordWriter};
use plasma_core::{ComponentError, ComponentId, SpeciesList};

use crate::component::Component;
use crate::family::{Builtin, Family, Kind};
use crate::list::ComponentList;
use crate::symbols::{SymbolTable, Symbols};

/// Emitter variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmitterKind {
    /// Unspecified.
    Unknown,
    /// Space-charge-limited emission.
    ChildLangmuir,
    /// User-supplied emitter.
    User,
}

impl Kind for EmitterKind {
    fn code(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::ChildLangmuir => 1,
            Self::User => 2,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::ChildLangmuir),
            2 => Some(Self::User),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::ChildLangmuir => "child-langmuir",
            Self::User => "user",
        }
    }
}

/// Emitter state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmitterParams {
    /// Behavior-specific state.
    pub state: Vec<u8>,
    /// Packed voxel/face indices, `None` until sized.
    pub voxels: Option<Vec<i32>>,
}

impl EmitterParams {
    /// Params with the given state and no voxel buffer.
    pub fn new(state: Vec<u8>) -> Self {
        Self {
            state,
            voxels: None,
        }
    }
}

impl Persist for EmitterParams {
    fn persist(&self, out: &mut RecordWriter) {
        out.bytes(&self.state);
        out.put_u8(u8::from(self.voxels.is_some()));
        if let Some(voxels) = &self.voxels {
            out.i32s(voxels);
        }
    }

    fn restore(input: &mut RecordReader<'_>) -> Result<Self, CheckpointError> {
        let state = input.bytes()?;
        let voxels = match input.get_u8()? {
            0 => None,
            _ => Some(input.i32s()?),
        };
        Ok(Self { state, voxels })
    }
}

/// Emitter behavior: state, voxel buffer, and the species to emit into.
pub type EmitterBehavior = fn(&mut Vec<u8>, &mut [i32], &mut SpeciesList);

/// Emitter family marker.
#[derive(Clone, Copy, Debug)]
pub enum Emitter {}

impl Family for Emitter {
    const LABEL: &'static str = "emitter";
    const TAG: &'static str = "emitter";
    const LIST_TAG: &'static str = "emitter_list";
    const BUILTINS: &'static [Builtin<EmitterKind>] = &[];

    type Kind = EmitterKind;
    type Params = EmitterParams;
    type Behavior = EmitterBehavior;

    fn assign_id(_kind: EmitterKind, list: &ComponentList<Self>) -> ComponentId {
        ComponentId(Self::count(list) as i64)
    }

    fn symbols(symbols: &Symbols) -> &SymbolTable<EmitterBehavior> {
        &symbols.emitter
    }

    fn symbols_mut(symbols: &mut Symbols) -> &mut SymbolTable<EmitterBehavior> {
        &mut symbols.emitter
    }
}

impl Component<Emitter> {
    /// Allocate a zeroed voxel buffer of `n` entries.
    ///
    /// # Errors
    ///
    /// [`ComponentError::AlreadySized`] if the buffer already exists.
    pub fn size(&mut self, n: usize) -> Result<&mut [i32], ComponentError> {
        if self.params().voxels.is_some() {
            return Err(ComponentError::AlreadySized {
                name: self.name().to_string(),
            });
        }
        Ok(self.params_mut().voxels.insert(vec![0; n]).as_mut_slice())
    }
}

impl ComponentList<Emitter> {
    /// Run every emitter in native order (most recently appended first).
    pub fn apply_all(&mut self, species: &mut SpeciesList) {
        for (params, behavior) in self.native_parts_mut() {
            if let Some(f) = behavior {
                let EmitterParams { state, voxels } = params;
                f(state, voxels.as_deref_mut().unwrap_or_default(), species);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasma_checkpt::ObjectRegistry;

    fn inject(state: &mut Vec<u8>, voxels: &mut [i32], species: &mut SpeciesList) {
        if let Some(s) = species.get_mut(0) {
            s.np += u64::from(state[0]) * voxels.len().max(1) as u64;
        }
    }

    fn setup() -> (ObjectRegistry, Symbols, ComponentList<Emitter>) {
        let mut symbols = Symbols::new();
        symbols.define::<Emitter>("inject", inject);
        let mut reg = ObjectRegistry::new();
        let list = ComponentList::new(&mut reg);
        (reg, symbols, list)
    }

    #[test]
    fn sizing_twice_is_rejected() {
        let (mut reg, symbols, _) = setup();
        let mut e = Component::<Emitter>::create(
            &mut reg,
            &symbols,
            "cathode",
            EmitterKind::ChildLangmuir,
            EmitterParams::new(vec![1]),
            Some("inject"),
        )
        .unwrap();
        assert_eq!(e.size(4).unwrap().len(), 4);
        match e.size(2) {
            Err(ComponentError::AlreadySized { name }) => assert_eq!(name, "cathode"),
            other => panic!("expected AlreadySized, got {other:?}"),
        }
        assert_eq!(e.params().voxels.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn apply_passes_voxel_buffer() {
        let (mut reg, symbols, mut list) = setup();
        let mut e = Component::<Emitter>::create(
            &mut reg,
            &symbols,
            "cathode",
            EmitterKind::User,
            EmitterParams::new(vec![3]),
            Some("inject"),
        )
        .unwrap();
        e.size(2).unwrap();
        list.append(e).unwrap();

        let mut species = SpeciesList::new();
        species.define("electron", -1.0, 1.0).unwrap();
        list.apply_all(&mut species);
        assert_eq!(species.get(0).unwrap().np, 6);
    }

    #[test]
    fn unknown_behavior_registers_nothing() {
        let (mut reg, symbols, _) = setup();
        let before = reg.len();
        let err = Component::<Emitter>::create(
            &mut reg,
            &symbols,
            "x",
            EmitterKind::User,
            EmitterParams::default(),
            Some("missing"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ComponentError::UnknownBehavior {
                family: "emitter",
                symbol: "missing".into()
            }
        );
        assert_eq!(reg.len(), before);
    }
}
