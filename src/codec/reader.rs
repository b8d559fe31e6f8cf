//! Binary reader bound to an encryption profile.

use std::io::{self, Read, Seek, SeekFrom};

use crate::crypto::Keystream;
use crate::profile::EncryptionProfile;
use crate::{Error, Result};

/// Reads little-endian primitives and encoded fields, tracking the offset.
pub struct UnitReader<R> {
    inner: R,
    keystream: Keystream,
    position: u64,
}

impl<R: Read + Seek> UnitReader<R> {
    /// Creates a reader that decodes fields under `profile`.
    ///
    /// `inner` must be positioned at the start of the file.
    pub fn new(inner: R, profile: &EncryptionProfile) -> Self {
        Self {
            inner,
            keystream: profile.keystream(),
            position: 0,
        }
    }

    /// Returns the current offset from the start of the file.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads exactly `len` bytes verbatim.
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(eof_to_format)?;
        self.position += len as u64;
        Ok(buf)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads `len` encoded bytes and decodes them.
    pub fn read_decoded(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = self.read_raw(len)?;
        self.keystream.apply(&mut buf);
        Ok(buf)
    }

    /// Reads a length-prefixed encoded UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_decoded(len)?;
        String::from_utf8(bytes)
            .map_err(|_| Error::InvalidFormat("name is not valid UTF-8".into()))
    }

    /// Skips `len` bytes without reading them.
    pub fn skip(&mut self, len: u64) -> Result<()> {
        let offset = i64::try_from(len)
            .map_err(|_| Error::InvalidFormat(format!("skip of {} bytes", len)))?;
        self.inner.seek(SeekFrom::Current(offset))?;
        self.position += len;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(eof_to_format)?;
        self.position += N as u64;
        Ok(buf)
    }
}

fn eof_to_format(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::InvalidFormat("unexpected end of file".into())
    } else {
        Error::Io(e)
    }
}
