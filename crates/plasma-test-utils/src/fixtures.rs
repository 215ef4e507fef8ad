//! Deterministic component behaviors for tests.
//!
//! - [`drag`]: collision behavior that counts its invocations in its state
//!   and adds one macro-particle to species 0.
//! - [`record_step`]: collision behavior that appends the species count
//!   to its state.
//! - [`inject`]: emitter behavior that bumps every voxel entry and
//!   doubles species 0.

use plasma_core::SpeciesList;

pub fn drag(state: &mut Vec<u8>, species: &mut SpeciesList) {
    match state.first_mut() {
        Some(n) => *n = n.wrapping_add(1),
        None => state.push(1),
    }
    if let Some(s) = species.get_mut(0) {
        s.np += 1;
    }
}

pub fn record_step(state: &mut Vec<u8>, species: &mut SpeciesList) {
    state.push(species.len() as u8);
}

pub fn inject(state: &mut Vec<u8>, voxels: &mut [i32], species: &mut SpeciesList) {
    state.push(voxels.len() as u8);
    for v in voxels.iter_mut() {
        *v += 1;
    }
    if let Some(s) = species.get_mut(0) {
        s.np *= 2;
    }
}
