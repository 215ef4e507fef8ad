//! Binary primitives for the checkpoint stream.
//!
//! All integers are little-endian. Strings and byte arrays are
//! length-prefixed with a `u32` length. Records carry their own
//! length-prefixed blob and field sections so a reader can verify that
//! a materializer consumed exactly what the writer produced.

use std::io::{Read, Write};

use crate::error::CheckpointError;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CheckpointError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), CheckpointError> {
    write_length_prefixed_bytes(w, s.as_bytes())
}

/// Write a length-prefixed byte array (u32 length + bytes).
pub fn write_length_prefixed_bytes(w: &mut dyn Write, b: &[u8]) -> Result<(), CheckpointError> {
    let len = u32::try_from(b.len())
        .map_err(|_| CheckpointError::format(format!("section of {} bytes too long", b.len())))?;
    write_u32_le(w, len)?;
    w.write_all(b)?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, CheckpointError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, CheckpointError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a length-prefixed byte array.
///
/// The buffer grows with the bytes actually read, so a corrupt length
/// prefix cannot force a huge allocation.
pub fn read_length_prefixed_bytes(r: &mut dyn Read) -> Result<Vec<u8>, CheckpointError> {
    let len = read_u32_le(r)? as u64;
    let mut buf = Vec::new();
    r.take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(CheckpointError::format(format!(
            "truncated section: expected {len} bytes, got {}",
            buf.len()
        )));
    }
    Ok(buf)
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, CheckpointError> {
    let buf = read_length_prefixed_bytes(r)?;
    String::from_utf8(buf)
        .map_err(|e| CheckpointError::format(format!("invalid UTF-8 string: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefixed_str_layout() {
        let mut buf = Vec::new();
        write_length_prefixed_str(&mut buf, "ab").unwrap();
        assert_eq!(buf, vec![2, 0, 0, 0, b'a', b'b']);
        let mut cursor = buf.as_slice();
        assert_eq!(read_length_prefixed_str(&mut cursor).unwrap(), "ab");
        assert!(cursor.is_empty());
    }

    #[test]
    fn oversized_length_prefix_is_truncation() {
        let buf = vec![0xff, 0xff, 0xff, 0x7f, 1, 2, 3];
        let mut cursor = buf.as_slice();
        match read_length_prefixed_bytes(&mut cursor) {
            Err(CheckpointError::StreamFormat { detail }) => {
                assert!(detail.contains("truncated"), "{detail}")
            }
            other => panic!("expected StreamFormat, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_rejected() {
        let buf = vec![1, 0, 0, 0, 0xff];
        let mut cursor = buf.as_slice();
        assert!(matches!(
            read_length_prefixed_str(&mut cursor),
            Err(CheckpointError::StreamFormat { .. })
        ));
    }

    #[test]
    fn short_integer_read_is_format_error() {
        let buf = vec![1, 2];
        let mut cursor = buf.as_slice();
        assert!(matches!(
            read_u64_le(&mut cursor),
            Err(CheckpointError::StreamFormat { .. })
        ));
    }
}
