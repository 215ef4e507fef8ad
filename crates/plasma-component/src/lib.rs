//! Pluggable, checkpointable component families for Plasma simulations.
//!
//! A component family is a kind of runtime-selectable behavior (particle
//! boundary conditions, collision operators, emitters). Components are
//! created with a name, kind, parameters and a behavior resolved from a
//! symbol table, then appended to their family's list, which assigns
//! their id and owns them.
//!
//! # Architecture
//!
//! - [`Family`] captures what differs between families; [`Component`] and
//!   [`ComponentList`] are generic over it
//! - [`ParticleBc`], [`CollisionOp`] and [`Emitter`] are the three families
//! - [`Symbols`] binds behavior names to functions for checkpointing
//! - [`Prototype`] defers create-and-append to a single consuming step
//! - [`ListHost`] is implemented by whatever owns the lists and registry
//! - [`restore`] wires component records into a checkpoint reader

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod collision;
pub mod component;
pub mod emitter;
pub mod family;
pub mod host;
pub mod list;
pub mod prototype;
pub mod restore;
pub mod symbols;

pub use boundary::{
    BoundaryBehavior, BoundaryKind, BoundaryParams, Disposition, Hit, ParticleBc,
    ABSORB_PARTICLES, REFLECT_PARTICLES,
};
pub use collision::{CollisionBehavior, CollisionKind, CollisionOp};
pub use component::{BoundBehavior, Component, Link};
pub use emitter::{Emitter, EmitterBehavior, EmitterKind, EmitterParams};
pub use family::{Builtin, Family, Kind};
pub use host::ListHost;
pub use list::{ComponentList, Lookup, StagedList};
pub use prototype::Prototype;
pub use symbols::{SymbolTable, Symbols};
