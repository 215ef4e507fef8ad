//! Per-object record encoding.
//!
//! Each object writes two sections: a fixed-size `blob` of scalar state and
//! a `fields` section of variable-length members (strings, symbol names,
//! object references, buffers). The reader consumes both in the same order
//! and [`RecordReader::finish`] rejects a record whose sections were not
//! fully consumed.

use std::io::Read;

use plasma_core::ObjectId;

use crate::codec::{
    read_length_prefixed_bytes, read_length_prefixed_str, read_u32_le, read_u64_le, read_u8,
};
use crate::error::CheckpointError;

/// Serializes one object's state into a record.
#[derive(Clone, Debug, Default)]
pub struct RecordWriter {
    blob: Vec<u8>,
    fields: Vec<u8>,
}

impl RecordWriter {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Blob (scalar) section ───────────────────────────────────

    /// Append a byte to the blob.
    pub fn put_u8(&mut self, v: u8) {
        self.blob.push(v);
    }

    /// Append a little-endian u32 to the blob.
    pub fn put_u32(&mut self, v: u32) {
        self.blob.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a little-endian u64 to the blob.
    pub fn put_u64(&mut self, v: u64) {
        self.blob.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a little-endian i64 to the blob.
    pub fn put_i64(&mut self, v: i64) {
        self.blob.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a little-endian f32 to the blob.
    pub fn put_f32(&mut self, v: f32) {
        self.blob.extend_from_slice(&v.to_le_bytes());
    }

    // ── Fields (variable) section ───────────────────────────────

    /// Append a length-prefixed string field.
    pub fn str(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    /// Append a length-prefixed byte field.
    pub fn bytes(&mut self, b: &[u8]) {
        self.fields
            .extend_from_slice(&(b.len() as u32).to_le_bytes());
        self.fields.extend_from_slice(b);
    }

    /// Append an optional symbol name (behavior reference by name).
    pub fn sym(&mut self, name: Option<&str>) {
        match name {
            Some(name) => {
                self.fields.push(1);
                self.str(name);
            }
            None => self.fields.push(0),
        }
    }

    /// Append an optional reference to another registered object.
    pub fn ptr(&mut self, target: Option<ObjectId>) {
        match target {
            Some(id) => {
                self.fields.push(1);
                self.fields.extend_from_slice(&id.0.to_le_bytes());
            }
            None => self.fields.push(0),
        }
    }

    /// Append a counted `i32` buffer.
    pub fn i32s(&mut self, values: &[i32]) {
        self.fields
            .extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            self.fields.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// The blob section written so far.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// The fields section written so far.
    pub fn fields(&self) -> &[u8] {
        &self.fields
    }
}

/// Deserializes one object's record, in the order it was written.
#[derive(Debug)]
pub struct RecordReader<'a> {
    object: ObjectId,
    blob: &'a [u8],
    fields: &'a [u8],
}

impl<'a> RecordReader<'a> {
    /// Wrap the two sections of the record for `object`.
    pub fn new(object: ObjectId, blob: &'a [u8], fields: &'a [u8]) -> Self {
        Self {
            object,
            blob,
            fields,
        }
    }

    /// Identity of the object being read.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    fn context(&self, e: CheckpointError) -> CheckpointError {
        match e {
            CheckpointError::StreamFormat { detail } => {
                CheckpointError::format(format!("record {}: {detail}", self.object))
            }
            other => other,
        }
    }

    fn blob_array<const N: usize>(&mut self) -> Result<[u8; N], CheckpointError> {
        let mut buf = [0u8; N];
        self.blob
            .read_exact(&mut buf)
            .map_err(|e| self.context(e.into()))?;
        Ok(buf)
    }

    // ── Blob (scalar) section ───────────────────────────────────

    /// Read a byte from the blob.
    pub fn get_u8(&mut self) -> Result<u8, CheckpointError> {
        Ok(self.blob_array::<1>()?[0])
    }

    /// Read a little-endian u32 from the blob.
    pub fn get_u32(&mut self) -> Result<u32, CheckpointError> {
        Ok(u32::from_le_bytes(self.blob_array()?))
    }

    /// Read a little-endian u64 from the blob.
    pub fn get_u64(&mut self) -> Result<u64, CheckpointError> {
        Ok(u64::from_le_bytes(self.blob_array()?))
    }

    /// Read a little-endian i64 from the blob.
    pub fn get_i64(&mut self) -> Result<i64, CheckpointError> {
        Ok(i64::from_le_bytes(self.blob_array()?))
    }

    /// Read a little-endian f32 from the blob.
    pub fn get_f32(&mut self) -> Result<f32, CheckpointError> {
        Ok(f32::from_le_bytes(self.blob_array()?))
    }

    // ── Fields (variable) section ───────────────────────────────

    /// Read a string field.
    pub fn str(&mut self) -> Result<String, CheckpointError> {
        read_length_prefixed_str(&mut self.fields).map_err(|e| self.context(e))
    }

    /// Read a byte field.
    pub fn bytes(&mut self) -> Result<Vec<u8>, CheckpointError> {
        read_length_prefixed_bytes(&mut self.fields).map_err(|e| self.context(e))
    }

    /// Read an optional symbol name.
    pub fn sym(&mut self) -> Result<Option<String>, CheckpointError> {
        match self.flag()? {
            true => Ok(Some(self.str()?)),
            false => Ok(None),
        }
    }

    /// Read an optional object reference.
    pub fn ptr(&mut self) -> Result<Option<ObjectId>, CheckpointError> {
        match self.flag()? {
            true => {
                let raw = read_u64_le(&mut self.fields).map_err(|e| self.context(e))?;
                Ok(Some(ObjectId(raw)))
            }
            false => Ok(None),
        }
    }

    /// Read a counted `i32` buffer.
    pub fn i32s(&mut self) -> Result<Vec<i32>, CheckpointError> {
        let len = read_u32_le(&mut self.fields).map_err(|e| self.context(e))? as usize;
        if len.saturating_mul(4) > self.fields.len() {
            return Err(self.context(CheckpointError::format(format!(
                "i32 buffer of {len} entries exceeds remaining {} bytes",
                self.fields.len()
            ))));
        }
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            let mut buf = [0u8; 4];
            self.fields
                .read_exact(&mut buf)
                .map_err(|e| self.context(e.into()))?;
            out.push(i32::from_le_bytes(buf));
        }
        Ok(out)
    }

    fn flag(&mut self) -> Result<bool, CheckpointError> {
        match read_u8(&mut self.fields).map_err(|e| self.context(e))? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(self.context(CheckpointError::format(format!(
                "invalid presence flag {other}"
            )))),
        }
    }

    /// Verify that both sections were consumed exactly.
    pub fn finish(self) -> Result<(), CheckpointError> {
        if !self.blob.is_empty() || !self.fields.is_empty() {
            return Err(CheckpointError::format(format!(
                "record {}: {} blob and {} field bytes left unread",
                self.object,
                self.blob.len(),
                self.fields.len()
            )));
        }
        Ok(())
    }
}

/// A value that can be stored inside an object's record.
///
/// Implemented by component parameter types; the owning object decides
/// where in its record the value lands.
pub trait Persist: Sized {
    /// Write the value.
    fn persist(&self, out: &mut RecordWriter);

    /// Read the value back, consuming exactly what [`persist`](Self::persist)
    /// wrote.
    fn restore(input: &mut RecordReader<'_>) -> Result<Self, CheckpointError>;
}

impl Persist for () {
    fn persist(&self, _out: &mut RecordWriter) {}

    fn restore(_input: &mut RecordReader<'_>) -> Result<Self, CheckpointError> {
        Ok(())
    }
}

impl Persist for Vec<u8> {
    fn persist(&self, out: &mut RecordWriter) {
        out.bytes(self);
    }

    fn restore(input: &mut RecordReader<'_>) -> Result<Self, CheckpointError> {
        input.bytes()
    }
}

impl Persist for String {
    fn persist(&self, out: &mut RecordWriter) {
        out.str(self);
    }

    fn restore(input: &mut RecordReader<'_>) -> Result<Self, CheckpointError> {
        input.str()
    }
}
