//! Whole-stream framing: header, object records, trailer.
//!
//! ```text
//! [MAGIC "PLCK"] [VERSION u8] [producer str] [rank u32] [world_size u32]
//! [cursor u64] [count u64]
//! count × { [id u64] [tag str] [blob bytes] [fields bytes] }
//! [END "DONE"] [count u64]
//! ```

use std::io::{Read, Write};

use plasma_core::ObjectId;
use tracing::debug;

use crate::codec::{
    read_length_prefixed_bytes, read_length_prefixed_str, read_u32_le, read_u64_le, read_u8,
    write_length_prefixed_bytes, write_length_prefixed_str, write_u32_le, write_u64_le, write_u8,
};
use crate::error::CheckpointError;
use crate::record::{RecordReader, RecordWriter};
use crate::registry::{ObjectRegistry, ObjectStore};
use crate::table::{Materializers, ObjectTable};
use crate::{END_MARKER, FORMAT_VERSION, MAGIC};

/// Who wrote a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamOrigin {
    /// Producer identification (crate name and version).
    pub producer: String,
    /// Rank of the writing process.
    pub rank: u32,
    /// Number of cooperating processes.
    pub world_size: u32,
}

/// Decoded stream header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    /// Who wrote the stream.
    pub origin: StreamOrigin,
    /// Registry cursor at checkpoint time.
    pub cursor: u64,
    /// Number of object records that follow.
    pub object_count: u64,
}

/// Write every registered object to `w`, in registration order.
///
/// Returns the number of records written.
///
/// # Errors
///
/// [`CheckpointError::Orphaned`] if a registered identity has no live
/// object in `store`; nothing after the header is meaningful in that case.
pub fn write_stream(
    w: &mut dyn Write,
    origin: &StreamOrigin,
    registry: &ObjectRegistry,
    store: &dyn ObjectStore,
) -> Result<u64, CheckpointError> {
    let count = registry.len() as u64;

    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_length_prefixed_str(w, &origin.producer)?;
    write_u32_le(w, origin.rank)?;
    write_u32_le(w, origin.world_size)?;
    write_u64_le(w, registry.cursor())?;
    write_u64_le(w, count)?;

    for (id, tag) in registry.iter() {
        let object = store
            .object(id)
            .ok_or_else(|| CheckpointError::Orphaned { ids: vec![id] })?;
        if object.type_tag() != tag {
            return Err(CheckpointError::format(format!(
                "object {id} registered as '{tag}' but reports '{}'",
                object.type_tag()
            )));
        }
        let mut record = RecordWriter::new();
        object.checkpoint(&mut record)?;

        write_u64_le(w, id.0)?;
        write_length_prefixed_str(w, tag)?;
        write_length_prefixed_bytes(w, record.blob())?;
        write_length_prefixed_bytes(w, record.fields())?;
        debug!(object = %id, tag, blob = record.blob().len(), "checkpointed object");
    }

    w.write_all(&END_MARKER)?;
    write_u64_le(w, count)?;
    Ok(count)
}

fn read_header(r: &mut dyn Read) -> Result<StreamHeader, CheckpointError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(CheckpointError::InvalidMagic);
    }

    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion { found: version });
    }

    let origin = StreamOrigin {
        producer: read_length_prefixed_str(r)?,
        rank: read_u32_le(r)?,
        world_size: read_u32_le(r)?,
    };
    Ok(StreamHeader {
        origin,
        cursor: read_u64_le(r)?,
        object_count: read_u64_le(r)?,
    })
}

/// Materialize every record in `r` into an [`ObjectTable`].
///
/// References between objects are not followed; call
/// [`ObjectTable::reanimate_all`] once the table is complete.
///
/// # Errors
///
/// - [`CheckpointError::InvalidMagic`] / [`CheckpointError::UnsupportedVersion`]
///   for a foreign or newer stream.
/// - [`CheckpointError::UnknownTypeTag`] for a record no materializer handles.
/// - [`CheckpointError::StreamFormat`] for truncation, a record that is not
///   consumed exactly, or a trailer that disagrees with the header count.
pub fn read_stream(
    r: &mut dyn Read,
    materializers: &Materializers,
) -> Result<(StreamHeader, ObjectTable), CheckpointError> {
    let header = read_header(r)?;
    let mut table = ObjectTable::new();

    for _ in 0..header.object_count {
        let id = ObjectId(read_u64_le(r)?);
        if id.0 >= header.cursor {
            return Err(CheckpointError::format(format!(
                "object {id} beyond registry cursor {}",
                header.cursor
            )));
        }
        let tag = read_length_prefixed_str(r)?;
        let blob = read_length_prefixed_bytes(r)?;
        let fields = read_length_prefixed_bytes(r)?;

        let (tag, materialize) = materializers
            .resolve(&tag)
            .ok_or(CheckpointError::UnknownTypeTag { tag })?;
        let mut reader = RecordReader::new(id, &blob, &fields);
        let object = materialize(&mut reader)?;
        reader.finish()?;
        table.insert(id, tag, object)?;
    }

    let mut end = [0u8; 4];
    r.read_exact(&mut end)?;
    if end != END_MARKER {
        return Err(CheckpointError::format("missing end-of-stream marker"));
    }
    let trailer = read_u64_le(r)?;
    if trailer != header.object_count {
        return Err(CheckpointError::format(format!(
            "trailer count {trailer} does not match header count {}",
            header.object_count
        )));
    }
    debug!(objects = table.len(), rank = header.origin.rank, "materialized stream");
    Ok((header, table))
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::registry::Checkpoint;
    use crate::table::Reanimate;

    #[derive(Debug, PartialEq)]
    struct Label(String);

    impl Checkpoint for Label {
        fn type_tag(&self) -> &'static str {
            "label"
        }

        fn checkpoint(&self, out: &mut RecordWriter) -> Result<(), CheckpointError> {
            out.str(&self.0);
            Ok(())
        }
    }

    impl Reanimate for Label {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
            self
        }
    }

    struct Store(Vec<(ObjectId, Label)>);

    impl ObjectStore for Store {
        fn object(&self, id: ObjectId) -> Option<&dyn Checkpoint> {
            self.0
                .iter()
                .find(|(i, _)| *i == id)
                .map(|(_, l)| l as &dyn Checkpoint)
        }
    }

    fn origin() -> StreamOrigin {
        StreamOrigin {
            producer: "test".into(),
            rank: 0,
            world_size: 1,
        }
    }

    fn materializers() -> Materializers {
        let mut m = Materializers::new();
        m.define("label", |r| Ok(Box::new(Label(r.str()?)) as Box<dyn Reanimate>));
        m
    }

    fn sample() -> (ObjectRegistry, Store) {
        let mut reg = ObjectRegistry::new();
        let a = reg.register("label");
        let b = reg.register("label");
        (
            reg,
            Store(vec![(a, Label("a".into())), (b, Label("b".into()))]),
        )
    }

    #[test]
    fn stream_round_trip_preserves_ids_and_order() {
        let (reg, store) = sample();
        let mut buf = Vec::new();
        assert_eq!(write_stream(&mut buf, &origin(), &reg, &store).unwrap(), 2);

        let (header, mut table) = read_stream(&mut buf.as_slice(), &materializers()).unwrap();
        assert_eq!(header.origin, origin());
        assert_eq!(header.cursor, 2);
        assert_eq!(table.remaining(), vec![ObjectId(0), ObjectId(1)]);
        let b: Label = table.take(ObjectId(1)).unwrap();
        assert_eq!(b, Label("b".into()));
    }

    #[test]
    fn orphan_aborts_write() {
        let (mut reg, store) = sample();
        let ghost = reg.register("label");
        match write_stream(&mut Vec::new(), &origin(), &reg, &store) {
            Err(CheckpointError::Orphaned { ids }) => assert_eq!(ids, vec![ghost]),
            other => panic!("expected Orphaned, got {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        let (reg, store) = sample();
        let mut buf = Vec::new();
        write_stream(&mut buf, &origin(), &reg, &store).unwrap();
        match read_stream(&mut buf.as_slice(), &Materializers::new()) {
            Err(CheckpointError::UnknownTypeTag { tag }) => assert_eq!(tag, "label"),
            other => panic!("expected UnknownTypeTag, got {other:?}"),
        }
    }

    #[test]
    fn bad_magic_rejected() {
        let buf = b"NOPE\x01".to_vec();
        assert!(matches!(
            read_stream(&mut buf.as_slice(), &materializers()),
            Err(CheckpointError::InvalidMagic)
        ));
    }

    #[test]
    fn truncated_stream_is_format_error() {
        let (reg, store) = sample();
        let mut buf = Vec::new();
        write_stream(&mut buf, &origin(), &reg, &store).unwrap();
        buf.truncate(buf.len() - 6);
        let err = read_stream(&mut buf.as_slice(), &materializers()).unwrap_err();
        assert!(matches!(err, CheckpointError::StreamFormat { .. }), "{err}");
    }

    #[test]
    fn trailer_mismatch_is_format_error() {
        let (reg, store) = sample();
        let mut buf = Vec::new();
        write_stream(&mut buf, &origin(), &reg, &store).unwrap();
        let n = buf.len();
        buf[n - 8] = 5;
        match read_stream(&mut buf.as_slice(), &materializers()) {
            Err(CheckpointError::StreamFormat { detail }) => {
                assert!(detail.contains("trailer"), "{detail}")
            }
            other => panic!("expected StreamFormat, got {other:?}"),
        }
    }
}
