//! Test fixtures and behaviors for Plasma development.
//!
//! Provides a symbol table with deterministic test behaviors bound
//! ([`test_symbols`]), a populated [`Simulation`] builder, and helpers for
//! booting single-rank services.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::Arc;

use indexmap::IndexMap;
use plasma_component::{CollisionOp, ComponentList, Emitter, EmitterKind, Family, Symbols};
use plasma_engine::prototypes;
use plasma_engine::{Services, ServicesConfig, Simulation, SingleRank};

pub use fixtures::{drag, inject, record_step};

/// Built-in symbols plus the fixture behaviors under their usual names:
/// `drag` and `record_step` (collision), `inject` (emitter).
pub fn test_symbols() -> Arc<Symbols> {
    let mut symbols = Symbols::with_builtins();
    symbols
        .define::<CollisionOp>("drag", drag)
        .define::<CollisionOp>("record_step", record_step)
        .define::<Emitter>("inject", inject);
    Arc::new(symbols)
}

/// Services for a single-process run with the default configuration.
pub fn single_rank_services() -> Services {
    match Services::boot(ServicesConfig::default(), Box::new(SingleRank)) {
        Ok(services) => services,
        Err(e) => panic!("single-rank boot failed: {e}"),
    }
}

/// Thermal speeds keyed by species name.
pub fn speeds(pairs: &[(&str, f32)]) -> IndexMap<String, f32> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Names of a list's members in append order.
pub fn names<F: Family>(list: &ComponentList<F>) -> Vec<String> {
    list.iter().map(|c| c.name().to_string()).collect()
}

/// Builder for a simulation with species and components already attached.
pub struct TestSimulationBuilder {
    symbols: Arc<Symbols>,
    species: Vec<(String, f32, f32)>,
    boundaries: Vec<String>,
    collisions: Vec<String>,
    emitters: Vec<(String, usize)>,
    field_damp: Option<f32>,
}

impl TestSimulationBuilder {
    pub fn new() -> Self {
        Self {
            symbols: test_symbols(),
            species: Vec::new(),
            boundaries: Vec::new(),
            collisions: Vec::new(),
            emitters: Vec::new(),
            field_damp: None,
        }
    }

    pub fn symbols(mut self, symbols: Arc<Symbols>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn species(mut self, name: &str, q: f32, m: f32) -> Self {
        self.species.push((name.to_string(), q, m));
        self
    }

    pub fn field_array(mut self, damp: f32) -> Self {
        self.field_damp = Some(damp);
        self
    }

    /// Absorb-tally boundary conditions, one per name.
    pub fn boundaries(mut self, names: &[&str]) -> Self {
        self.boundaries.extend(names.iter().map(|s| s.to_string()));
        self
    }

    /// `drag` collision operators, one per name.
    pub fn collisions(mut self, names: &[&str]) -> Self {
        self.collisions.extend(names.iter().map(|s| s.to_string()));
        self
    }

    /// `inject` emitters with a voxel buffer of `voxels` entries.
    pub fn emitter(mut self, name: &str, voxels: usize) -> Self {
        self.emitters.push((name.to_string(), voxels));
        self
    }

    pub fn build(self) -> Simulation {
        let mut sim = Simulation::new(self.symbols);
        for (name, q, m) in &self.species {
            sim.define_species(name, *q, *m)
                .unwrap_or_else(|e| panic!("species '{name}': {e}"));
        }
        if let Some(damp) = self.field_damp {
            sim.define_field_array(damp)
                .unwrap_or_else(|e| panic!("field array: {e}"));
        }
        for name in &self.boundaries {
            prototypes::absorb_tally(name)
                .apply(&mut sim)
                .unwrap_or_else(|e| panic!("boundary '{name}': {e}"));
        }
        for name in &self.collisions {
            prototypes::collision_op(
                name,
                plasma_component::CollisionKind::Langevin,
                Some("drag"),
                vec![0],
            )
            .apply(&mut sim)
            .unwrap_or_else(|e| panic!("collision '{name}': {e}"));
        }
        for (name, voxels) in &self.emitters {
            prototypes::emitter(name, EmitterKind::User, Some("inject"), vec![], Some(*voxels))
                .apply(&mut sim)
                .unwrap_or_else(|e| panic!("emitter '{name}': {e}"));
        }
        sim
    }
}

impl Default for TestSimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Two species, a field array, three tally boundaries `a`, `b`, `c`, one
/// collision operator and one emitter.
pub fn populated_simulation() -> Simulation {
    TestSimulationBuilder::new()
        .species("electron", -1.0, 1.0)
        .species("ion", 1.0, 1836.0)
        .field_array(0.01)
        .boundaries(&["a", "b", "c"])
        .collisions(&["drag"])
        .emitter("cathode", 3)
        .build()
}
