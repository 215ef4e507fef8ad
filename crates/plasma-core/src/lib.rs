//! Core types for the Plasma simulation control layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers shared by the registry, component families and the
//! list bridge, the component error taxonomy, and the simulation
//! collaborators that component construction consults.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod species;

pub use error::{ComponentError, LookupError};
pub use id::{ComponentId, ListInstanceId, ListVersion, ObjectId};
pub use species::{FieldArray, Species, SpeciesList};
