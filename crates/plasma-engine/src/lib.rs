//! Simulation context, process services and checkpoint orchestration.
//!
//! A [`Simulation`] owns the object registry, species, and the three
//! component lists. [`Services`] are booted once per process (rank) and
//! drive whole-process checkpoint and restore of a simulation.
//!
//! # Architecture
//!
//! - [`config`]: [`ServicesConfig`] with validation and command-line flags
//! - [`comm`]: the [`RankComm`] barrier, single-rank and in-process ranks
//! - [`services`]: boot and halt in a fixed service order
//! - [`checkpoint`]: session guards, checkpoint and two-barrier restore
//! - [`simulation`]: the registry owner and its stream record
//! - [`prototypes`]: deferred factories for the stock components

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod comm;
pub mod config;
pub mod control;
pub mod prototypes;
pub mod services;
pub mod simulation;

pub use checkpoint::{rank_path, CheckpointSession, RestoreSession};
pub use comm::{CommError, LocalRank, LocalRanks, RankComm, SingleRank};
pub use config::{ConfigError, ServiceLayer, ServicesConfig};
pub use control::ControlState;
pub use services::{BootError, Services};
pub use simulation::Simulation;
