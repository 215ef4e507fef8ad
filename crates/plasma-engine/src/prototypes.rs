//! Prototype factories for the stock components.
//!
//! Each factory validates nothing up front; the checks run when the
//! prototype is applied, against the simulation it is applied to. Names
//! must be unique within their list.

use indexmap::IndexMap;
use plasma_component::{
    BoundaryKind, BoundaryParams, CollisionKind, CollisionOp, Emitter, EmitterKind,
    EmitterParams, ParticleBc, Prototype,
};
use plasma_core::ComponentError;
use smallvec::SmallVec;

use crate::simulation::Simulation;

fn empty_species(name: &str) -> ComponentError {
    ComponentError::Configuration {
        reason: format!("species list is empty, cannot create '{name}'"),
    }
}

fn thermal_speeds(
    name: &str,
    which: &str,
    speeds: &IndexMap<String, f32>,
    sim: &Simulation,
) -> Result<SmallVec<[f32; 4]>, ComponentError> {
    sim.species()
        .iter()
        .map(|sp| {
            speeds
                .get(&sp.name)
                .copied()
                .ok_or_else(|| ComponentError::Configuration {
                    reason: format!(
                        "no {which} thermal speed for species '{}' in '{name}'",
                        sp.name
                    ),
                })
        })
        .collect()
}

/// A boundary condition that reflects particles.
pub fn reflect_particles(name: &str) -> Prototype<ParticleBc, Simulation> {
    let name = name.to_string();
    Prototype::new(name.clone(), move |sim: &mut Simulation| {
        sim.particle_bcs().ensure_unique(&name)?;
        sim.define_particle_bc(&name, BoundaryKind::Reflect, BoundaryParams::None, None)
    })
}

/// A boundary condition that absorbs particles.
pub fn absorb_particles(name: &str) -> Prototype<ParticleBc, Simulation> {
    let name = name.to_string();
    Prototype::new(name.clone(), move |sim: &mut Simulation| {
        sim.particle_bcs().ensure_unique(&name)?;
        sim.define_particle_bc(&name, BoundaryKind::Absorb, BoundaryParams::None, None)
    })
}

/// A boundary condition that reinjects absorbed particles from a
/// Maxwellian with per-species thermal speeds, keyed by species name.
///
/// Every defined species must have both speeds.
pub fn maxwellian_reflux(
    name: &str,
    vth_para: IndexMap<String, f32>,
    vth_perp: IndexMap<String, f32>,
) -> Prototype<ParticleBc, Simulation> {
    let name = name.to_string();
    Prototype::new(name.clone(), move |sim: &mut Simulation| {
        if sim.species().is_empty() {
            return Err(empty_species(&name));
        }
        let params = BoundaryParams::Reflux {
            vth_para: thermal_speeds(&name, "parallel", &vth_para, sim)?,
            vth_perp: thermal_speeds(&name, "perpendicular", &vth_perp, sim)?,
        };
        sim.particle_bcs().ensure_unique(&name)?;
        sim.define_particle_bc(
            &name,
            BoundaryKind::MaxwellianReflux,
            params,
            Some("maxwellian_reflux"),
        )
    })
}

/// A boundary condition that absorbs particles and counts them per species.
pub fn absorb_tally(name: &str) -> Prototype<ParticleBc, Simulation> {
    let name = name.to_string();
    Prototype::new(name.clone(), move |sim: &mut Simulation| {
        let n = sim.species().len();
        if n == 0 {
            return Err(empty_species(&name));
        }
        sim.particle_bcs().ensure_unique(&name)?;
        let params = BoundaryParams::Tally {
            absorbed: std::iter::repeat(0).take(n).collect(),
        };
        sim.define_particle_bc(&name, BoundaryKind::AbsorbTally, params, Some("absorb_tally"))
    })
}

/// A collision operator running the behavior bound to `symbol`.
pub fn collision_op(
    name: &str,
    kind: CollisionKind,
    symbol: Option<&str>,
    params: Vec<u8>,
) -> Prototype<CollisionOp, Simulation> {
    let name = name.to_string();
    let symbol = symbol.map(str::to_string);
    Prototype::new(name.clone(), move |sim: &mut Simulation| {
        sim.collision_ops().ensure_unique(&name)?;
        sim.define_collision_op(&name, kind, params, symbol.as_deref())
    })
}

/// An emitter running the behavior bound to `symbol`, with a voxel buffer
/// of `voxels` entries when given.
pub fn emitter(
    name: &str,
    kind: EmitterKind,
    symbol: Option<&str>,
    state: Vec<u8>,
    voxels: Option<usize>,
) -> Prototype<Emitter, Simulation> {
    let name = name.to_string();
    let symbol = symbol.map(str::to_string);
    Prototype::new(name.clone(), move |sim: &mut Simulation| {
        sim.emitters().ensure_unique(&name)?;
        sim.define_emitter(
            &name,
            kind,
            EmitterParams::new(state),
            symbol.as_deref(),
            voxels,
        )
    })
}
