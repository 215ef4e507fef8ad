//! Plasma: checkpointable pluggable components for distributed particle
//! simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Plasma sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use plasma::engine::prototypes;
//! use plasma::prelude::*;
//!
//! let services = Services::boot(ServicesConfig::default(), Box::new(SingleRank)).unwrap();
//!
//! let mut sim = Simulation::new(Arc::new(Symbols::with_builtins()));
//! sim.define_species("electron", -1.0, 1.0).unwrap();
//!
//! // Control layers see the list in append order.
//! let mut walls = ListMirror::<ParticleBc>::new();
//! walls.append(&mut sim, prototypes::absorb_tally("left")).unwrap();
//! walls.append(&mut sim, prototypes::absorb_tally("right")).unwrap();
//! assert_eq!(walls.render(&sim), "['left', 'right']");
//!
//! let mut stream = Vec::new();
//! services.checkpt(&mut sim, &mut stream, |_| Ok(Vec::new())).unwrap();
//!
//! let (restored, ()) = services
//!     .restore(&mut stream.as_slice(), Arc::new(Symbols::with_builtins()), |_, _| Ok(()))
//!     .unwrap();
//! let mut view = ListMirror::<ParticleBc>::new();
//! assert_eq!(view.keys(&restored), ["left", "right"]);
//! services.halt();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `plasma-core` | Ids, species, component and lookup errors |
//! | [`checkpt`] | `plasma-checkpt` | Object registry, record codec, stream format, restore staging |
//! | [`component`] | `plasma-component` | Component families, lists, symbol tables, prototypes |
//! | [`engine`] | `plasma-engine` | Simulation context, services, checkpoint orchestration |
//! | [`bridge`] | `plasma-bridge` | List mirrors and handles for control layers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Ids, species and error types (`plasma-core`).
pub use plasma_core as types;

/// Object registry and checkpoint stream (`plasma-checkpt`).
///
/// Most users only touch [`checkpt::CheckpointError`] and
/// [`checkpt::Phase`]; the rest is for implementing new checkpointable
/// objects.
pub use plasma_checkpt as checkpt;

/// Component families (`plasma-component`).
///
/// [`component::ParticleBc`], [`component::CollisionOp`] and
/// [`component::Emitter`], generic over [`component::Family`].
pub use plasma_component as component;

/// Simulation context and process services (`plasma-engine`).
pub use plasma_engine as engine;

/// List mirrors for control layers (`plasma-bridge`).
pub use plasma_bridge as bridge;

/// Common imports for typical Plasma usage.
///
/// ```rust
/// use plasma::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use plasma_core::{ComponentError, ComponentId, LookupError, ObjectId, Species};

    // Checkpoint
    pub use plasma_checkpt::{CheckpointError, Phase};

    // Components
    pub use plasma_component::{
        CollisionKind, CollisionOp, Emitter, EmitterKind, Family, ListHost, ParticleBc,
        Prototype, Symbols,
    };

    // Engine
    pub use plasma_engine::{
        BootError, RankComm, Services, ServicesConfig, Simulation, SingleRank,
    };

    // Bridge
    pub use plasma_bridge::{ComponentHandle, ListMirror};
}
