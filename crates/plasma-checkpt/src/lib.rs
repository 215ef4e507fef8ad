//! Checkpoint streams and the object registry for Plasma simulations.
//!
//! Whole-process checkpointing works over a registry of identified
//! objects. Each object writes a self-describing record; references to
//! other objects are written as identities. Restore is two-pass: every
//! record is materialized first, then each staged object reanimates by
//! resolving its references against the complete table.
//!
//! # Architecture
//!
//! - [`ObjectRegistry`] tracks identities and type tags in registration order
//! - [`Checkpoint`] / [`ObjectStore`] give the writer access to live objects
//! - [`Materializers`] / [`Reanimate`] / [`ObjectTable`] drive restore
//! - [`write_stream`] and [`read_stream`] frame the records
//!
//! # Format
//!
//! ```text
//! [MAGIC "PLCK"] [VERSION u8] [StreamOrigin] [cursor u64] [count u64]
//! [Record 1] ... [Record N] [END "DONE"] [count u64]
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod phase;
pub mod record;
pub mod registry;
pub mod stream;
pub mod table;

pub use error::CheckpointError;
pub use phase::Phase;
pub use record::{Persist, RecordReader, RecordWriter};
pub use registry::{Checkpoint, ObjectRegistry, ObjectStore};
pub use stream::{read_stream, write_stream, StreamHeader, StreamOrigin};
pub use table::{Materializer, Materializers, ObjectTable, Reanimate};

/// Magic bytes at the start of every checkpoint stream.
pub const MAGIC: [u8; 4] = *b"PLCK";

/// Marker preceding the trailing record count.
pub const END_MARKER: [u8; 4] = *b"DONE";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
