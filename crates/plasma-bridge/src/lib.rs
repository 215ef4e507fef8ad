//! Control-layer view of Plasma component lists.
//!
//! A scripting or control layer wants to treat a component list like an
//! ordered mapping: index it, look members up by name, iterate in the
//! order they were added, and replace the whole list at once. The lists
//! themselves are owned by the simulation. This crate keeps a cached view
//! that notices any mutation made behind its back.
//!
//! # Architecture
//!
//! - [`ListMirror`] caches names and handles in append order and rebuilds
//!   whenever the list instance, its count or its version changed
//! - [`ComponentHandle`] refers to a member without borrowing the list and
//!   refuses to resolve against another list or once the list has been
//!   torn down

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod handle;
pub mod mirror;

pub use handle::ComponentHandle;
pub use mirror::ListMirror;
