//! Binary writer bound to an encryption profile.

use std::io::Write;

use crate::crypto::Keystream;
use crate::profile::EncryptionProfile;
use crate::{Error, Result};

/// Writes little-endian primitives and encoded fields to a byte stream.
///
/// The writer is bound to one profile for its lifetime: every encoded field
/// uses that profile's IV and user key.
pub struct UnitWriter<W> {
    inner: W,
    keystream: Keystream,
    position: u64,
}

impl<W: Write> UnitWriter<W> {
    /// Creates a writer that encodes fields under `profile`.
    pub fn new(inner: W, profile: &EncryptionProfile) -> Self {
        Self {
            inner,
            keystream: profile.keystream(),
            position: 0,
        }
    }

    /// Returns the IV this writer encodes with.
    pub fn iv(&self) -> [u8; 4] {
        self.keystream.iv()
    }

    /// Returns the number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Writes bytes verbatim.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    /// Writes one byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    /// Writes a little-endian u16.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Writes a little-endian u32.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Encodes `data` with the keystream and writes it.
    pub fn write_encoded(&mut self, data: &[u8]) -> Result<()> {
        let mut buf = data.to_vec();
        self.keystream.apply(&mut buf);
        self.write_raw(&buf)
    }

    /// Writes a length-prefixed encoded UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u16::try_from(value.len())
            .map_err(|_| Error::Codec(format!("name too long: {} bytes", value.len())))?;
        self.write_u16(len)?;
        self.write_encoded(value.as_bytes())
    }

    /// Flushes the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Returns a reference to the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consumes the writer, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
