//! Particle boundary conditions.
//!
//! Two variants, reflection and absorption, are built in with reserved
//! ids `-1` and `-2`; they are recognized by id alone and never need to
//! be in a list. Every other boundary condition is appended with id
//! `-(3 + count)`, so ids form a strictly decreasing sequence and the
//! list length can be read off the most recent id.

use plasma_checkpt::{CheckpointError, Persist, RecordReader, RecordWriter};
use plasma_core::{ComponentId, LookupError, SpeciesList};
use smallvec::SmallVec;

use crate::family::{Builtin, Family, Kind};
use crate::list::ComponentList;
use crate::symbols::{SymbolTable, Symbols};

/// Reserved id of the built-in reflecting boundary.
pub const REFLECT_PARTICLES: ComponentId = ComponentId(-1);

/// Reserved id of the built-in absorbing boundary.
pub const ABSORB_PARTICLES: ComponentId = ComponentId(-2);

/// Particle boundary condition variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// Unspecified (user-defined behavior).
    Unknown,
    /// Specular reflection.
    Reflect,
    /// Absorption.
    Absorb,
    /// Absorb and reinject from a drifting Maxwellian.
    MaxwellianReflux,
    /// Absorb and tally per species.
    AbsorbTally,
}

impl Kind for BoundaryKind {
    fn code(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Reflect => 1,
            Self::Absorb => 2,
            Self::MaxwellianReflux => 3,
            Self::AbsorbTally => 4,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Reflect),
            2 => Some(Self::Absorb),
            3 => Some(Self::MaxwellianReflux),
            4 => Some(Self::AbsorbTally),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Reflect => "reflect particles",
            Self::Absorb => "absorb particles",
            Self::MaxwellianReflux => "maxwellian reflux",
            Self::AbsorbTally => "absorb tally",
        }
    }
}

/// Per-instance boundary state.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BoundaryParams {
    /// No state.
    #[default]
    None,
    /// Thermal speeds per species index.
    Reflux {
        /// Parallel thermal speed.
        vth_para: SmallVec<[f32; 4]>,
        /// Perpendicular thermal speed.
        vth_perp: SmallVec<[f32; 4]>,
    },
    /// Absorbed-particle counts per species index.
    Tally {
        /// Counts, one per species.
        absorbed: SmallVec<[u64; 4]>,
    },
}

impl Persist for BoundaryParams {
    fn persist(&self, out: &mut RecordWriter) {
        match self {
            Self::None => out.put_u8(0),
            Self::Reflux { vth_para, vth_perp } => {
                out.put_u8(1);
                for speeds in [vth_para, vth_perp] {
                    out.put_u32(speeds.len() as u32);
                    for v in speeds {
                        out.put_f32(*v);
                    }
                }
            }
            Self::Tally { absorbed } => {
                out.put_u8(2);
                out.put_u32(absorbed.len() as u32);
                for n in absorbed {
                    out.put_u64(*n);
                }
            }
        }
    }

    fn restore(input: &mut RecordReader<'_>) -> Result<Self, CheckpointError> {
        match input.get_u8()? {
            0 => Ok(Self::None),
            1 => {
                let vth_para = restore_speeds(input)?;
                let vth_perp = restore_speeds(input)?;
                Ok(Self::Reflux { vth_para, vth_perp })
            }
            2 => {
                let n = input.get_u32()?;
                let mut absorbed = SmallVec::new();
                for _ in 0..n {
                    absorbed.push(input.get_u64()?);
                }
                Ok(Self::Tally { absorbed })
            }
            other => Err(CheckpointError::format(format!(
                "unknown boundary parameter tag {other}"
            ))),
        }
    }
}

fn restore_speeds(input: &mut RecordReader<'_>) -> Result<SmallVec<[f32; 4]>, CheckpointError> {
    let n = input.get_u32()?;
    (0..n).map(|_| input.get_f32()).collect()
}

/// A particle reaching a boundary face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    /// Index of the particle's species.
    pub species: usize,
    /// Face of the voxel that was crossed (0..6).
    pub face: u8,
}

/// What became of a particle after a boundary interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The particle stays, mirrored back into the domain.
    Reflected,
    /// The particle was removed.
    Absorbed,
    /// The particle was removed and a replacement injected.
    Reinjected,
}

/// Boundary behavior function.
pub type BoundaryBehavior = fn(&mut BoundaryParams, Hit, &mut SpeciesList) -> Disposition;

/// Particle boundary condition family marker.
#[derive(Clone, Copy, Debug)]
pub enum ParticleBc {}

impl Family for ParticleBc {
    const LABEL: &'static str = "particle boundary condition";
    const TAG: &'static str = "particle_bc";
    const LIST_TAG: &'static str = "particle_bc_list";
    const BUILTINS: &'static [Builtin<BoundaryKind>] = &[
        Builtin {
            name: "reflect particles",
            id: REFLECT_PARTICLES,
            kind: BoundaryKind::Reflect,
        },
        Builtin {
            name: "absorb particles",
            id: ABSORB_PARTICLES,
            kind: BoundaryKind::Absorb,
        },
    ];

    type Kind = BoundaryKind;
    type Params = BoundaryParams;
    type Behavior = BoundaryBehavior;

    fn assign_id(kind: BoundaryKind, list: &ComponentList<Self>) -> ComponentId {
        match kind {
            BoundaryKind::Reflect => REFLECT_PARTICLES,
            BoundaryKind::Absorb => ABSORB_PARTICLES,
            _ => ComponentId(-3 - Self::count(list) as i64),
        }
    }

    /// Derived from the head id when the head is user-defined.
    ///
    /// Only valid while lists never lose individual members; the arena
    /// length is the ground truth this must agree with.
    fn count(list: &ComponentList<Self>) -> usize {
        match list.head().and_then(|h| h.id()) {
            Some(ComponentId(id)) if id <= -3 => {
                let n = (-id - 2) as usize;
                debug_assert_eq!(n, list.len(), "boundary id sequence out of step");
                n
            }
            _ => list.len(),
        }
    }

    fn symbols(symbols: &Symbols) -> &SymbolTable<BoundaryBehavior> {
        &symbols.particle_bc
    }

    fn symbols_mut(symbols: &mut Symbols) -> &mut SymbolTable<BoundaryBehavior> {
        &mut symbols.particle_bc
    }
}

fn remove_particle(hit: Hit, species: &mut SpeciesList) {
    if let Some(s) = species.get_mut(hit.species) {
        s.np = s.np.saturating_sub(1);
    }
}

fn reflect(_hit: Hit, _species: &mut SpeciesList) -> Disposition {
    Disposition::Reflected
}

fn absorb(hit: Hit, species: &mut SpeciesList) -> Disposition {
    remove_particle(hit, species);
    Disposition::Absorbed
}

/// Reinject with the species' thermal speeds; absorb if none are known.
fn maxwellian_reflux(
    params: &mut BoundaryParams,
    hit: Hit,
    species: &mut SpeciesList,
) -> Disposition {
    match params {
        BoundaryParams::Reflux { vth_para, .. } if hit.species < vth_para.len() => {
            Disposition::Reinjected
        }
        _ => absorb(hit, species),
    }
}

fn absorb_tally(params: &mut BoundaryParams, hit: Hit, species: &mut SpeciesList) -> Disposition {
    if let BoundaryParams::Tally { absorbed } = params {
        if let Some(n) = absorbed.get_mut(hit.species) {
            *n += 1;
        }
    }
    absorb(hit, species)
}

pub(crate) fn define_builtin_behaviors(table: &mut SymbolTable<BoundaryBehavior>) {
    table.define("maxwellian_reflux", maxwellian_reflux);
    table.define("absorb_tally", absorb_tally);
}

impl ComponentList<ParticleBc> {
    /// Dispatch a boundary hit to the boundary condition with `id`.
    ///
    /// The two built-in variants are handled without a lookup.
    ///
    /// # Errors
    ///
    /// [`LookupError::Id`] if no member carries `id`.
    pub fn interact(
        &mut self,
        id: ComponentId,
        hit: Hit,
        species: &mut SpeciesList,
    ) -> Result<Disposition, LookupError> {
        match id {
            REFLECT_PARTICLES => return Ok(reflect(hit, species)),
            ABSORB_PARTICLES => return Ok(absorb(hit, species)),
            _ => {}
        }
        let member = self
            .member_by_id_mut(id)
            .ok_or(LookupError::Id { id })?;
        Ok(match member.kind() {
            BoundaryKind::Reflect => reflect(hit, species),
            BoundaryKind::Absorb => absorb(hit, species),
            _ => match member.parts_mut() {
                (params, Some(f)) => f(params, hit, species),
                (_, None) => absorb(hit, species),
            },
        })
    }
}
