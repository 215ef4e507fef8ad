//! Opaque control-layer state carried through a checkpoint.

use std::any::Any;

use plasma_checkpt::{Checkpoint, CheckpointError, Reanimate, RecordReader, RecordWriter};

/// Registry tag of the control-state object.
pub const CONTROL_STATE_TAG: &str = "control_state";

/// Serialized control-layer state.
///
/// The bytes are produced by the pickle callback of a checkpoint and
/// handed back to the unpickle callback of a restore. The engine never
/// interprets them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlState {
    bytes: Vec<u8>,
}

impl ControlState {
    /// Wrap serialized bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The serialized bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn replace(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
    }

    pub(crate) fn materialize(input: &mut RecordReader<'_>) -> Result<Self, CheckpointError> {
        Ok(Self {
            bytes: input.bytes()?,
        })
    }
}

impl Checkpoint for ControlState {
    fn type_tag(&self) -> &'static str {
        CONTROL_STATE_TAG
    }

    fn checkpoint(&self, out: &mut RecordWriter) -> Result<(), CheckpointError> {
        out.bytes(&self.bytes);
        Ok(())
    }
}

impl Reanimate for ControlState {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasma_core::ObjectId;

    #[test]
    fn record_round_trip() {
        let state = ControlState::new(vec![1, 2, 3]);
        let mut out = RecordWriter::new();
        state.checkpoint(&mut out).unwrap();
        let mut input = RecordReader::new(ObjectId(0), out.blob(), out.fields());
        let back = ControlState::materialize(&mut input).unwrap();
        input.finish().unwrap();
        assert_eq!(back, state);
    }
}
