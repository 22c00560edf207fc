//! Directional serialization contract used for save games.
//!
//! A single `serialize(&mut self, s: &mut dyn Serializer)` method per type
//! handles both directions: when `s.is_reading()` the `io_*` calls overwrite
//! the fields, otherwise they copy the fields out.  Fields are visited in a
//! fixed order, so a write followed by a read reproduces the value exactly.
//!
//! The byte layout of [`BinaryWriter`] / [`BinaryReader`] is little-endian
//! with `u32` length prefixes for sequences.

use crate::{NavError, NavResult};

/// A directional field-by-field serializer.
pub trait Serializer {
    /// `true` when fields are being filled from the archive.
    fn is_reading(&self) -> bool;

    fn io_u8(&mut self, v: &mut u8) -> NavResult<()>;
    fn io_u16(&mut self, v: &mut u16) -> NavResult<()>;
    fn io_u32(&mut self, v: &mut u32) -> NavResult<()>;
    fn io_u64(&mut self, v: &mut u64) -> NavResult<()>;
    fn io_f32(&mut self, v: &mut f32) -> NavResult<()>;
    fn io_f64(&mut self, v: &mut f64) -> NavResult<()>;

    fn io_bool(&mut self, v: &mut bool) -> NavResult<()> {
        let mut byte = *v as u8;
        self.io_u8(&mut byte)?;
        *v = byte != 0;
        Ok(())
    }

    /// Sequence length prefix.  Writes `len` and returns it, or returns the
    /// stored length when reading.
    fn io_len(&mut self, len: usize) -> NavResult<usize> {
        let mut n = u32::try_from(len)
            .map_err(|_| NavError::InvalidData(format!("sequence too long: {len}")))?;
        self.io_u32(&mut n)?;
        Ok(n as usize)
    }

    fn io_string(&mut self, v: &mut String) -> NavResult<()> {
        let len = self.io_len(v.len())?;
        if self.is_reading() {
            let mut bytes = vec![0u8; len];
            for b in &mut bytes {
                self.io_u8(b)?;
            }
            *v = String::from_utf8(bytes).map_err(|e| NavError::InvalidData(e.to_string()))?;
        } else {
            for mut b in v.bytes() {
                self.io_u8(&mut b)?;
            }
        }
        Ok(())
    }
}

/// Serialize a `Vec<T>` element by element with a length prefix.
///
/// When reading, the vector is cleared and refilled with `T::default()`
/// values that `f` then overwrites.
pub fn io_vec<T: Default>(
    s: &mut dyn Serializer,
    v: &mut Vec<T>,
    mut f: impl FnMut(&mut dyn Serializer, &mut T) -> NavResult<()>,
) -> NavResult<()> {
    let len = s.io_len(v.len())?;
    if s.is_reading() {
        v.clear();
        v.reserve(len);
        for _ in 0..len {
            let mut item = T::default();
            f(&mut *s, &mut item)?;
            v.push(item);
        }
    } else {
        for item in v.iter_mut() {
            f(&mut *s, item)?;
        }
    }
    Ok(())
}

// ── BinaryWriter ──────────────────────────────────────────────────────────────

/// Writes fields into an in-memory little-endian byte buffer.
#[derive(Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Serializer for BinaryWriter {
    fn is_reading(&self) -> bool {
        false
    }

    fn io_u8(&mut self, v: &mut u8) -> NavResult<()> {
        self.buf.push(*v);
        Ok(())
    }

    fn io_u16(&mut self, v: &mut u16) -> NavResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn io_u32(&mut self, v: &mut u32) -> NavResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn io_u64(&mut self, v: &mut u64) -> NavResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn io_f32(&mut self, v: &mut f32) -> NavResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn io_f64(&mut self, v: &mut f64) -> NavResult<()> {
        self.buf.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }
}

// ── BinaryReader ──────────────────────────────────────────────────────────────

/// Reads fields back from a buffer produced by [`BinaryWriter`].
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> NavResult<[u8; N]> {
        let remaining = self.remaining();
        if remaining < N {
            return Err(NavError::UnexpectedEof { needed: N, remaining });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

impl Serializer for BinaryReader<'_> {
    fn is_reading(&self) -> bool {
        true
    }

    fn io_u8(&mut self, v: &mut u8) -> NavResult<()> {
        *v = self.take::<1>()?[0];
        Ok(())
    }

    fn io_u16(&mut self, v: &mut u16) -> NavResult<()> {
        *v = u16::from_le_bytes(self.take()?);
        Ok(())
    }

    fn io_u32(&mut self, v: &mut u32) -> NavResult<()> {
        *v = u32::from_le_bytes(self.take()?);
        Ok(())
    }

    fn io_u64(&mut self, v: &mut u64) -> NavResult<()> {
        *v = u64::from_le_bytes(self.take()?);
        Ok(())
    }

    fn io_f32(&mut self, v: &mut f32) -> NavResult<()> {
        *v = f32::from_le_bytes(self.take()?);
        Ok(())
    }

    fn io_f64(&mut self, v: &mut f64) -> NavResult<()> {
        *v = f64::from_le_bytes(self.take()?);
        Ok(())
    }
}
