//! Data units and loose units.

use super::Origin;
use crate::profile::EncryptionProfile;
use crate::{Error, Result};

/// Where a unit's body currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Decoded bytes held in memory (new or edited units).
    Plain(Vec<u8>),
    /// Encoded bytes still in the source file, not yet read.
    ///
    /// The bytes are encoded under the profile the file was loaded with.
    Stored {
        /// Byte offset of the encoded body in the source file.
        offset: u64,
        /// Length of the encoded body.
        len: u32,
        /// CRC-32 of the decoded body.
        crc: u32,
    },
}

impl Payload {
    /// Returns the decoded body length.
    pub fn len(&self) -> usize {
        match self {
            Payload::Plain(data) => data.len(),
            Payload::Stored { len, .. } => *len as usize,
        }
    }

    /// Returns true if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One leaf record of an archive (an "image").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUnit {
    name: String,
    payload: Payload,
    /// Set when the unit must be re-encoded on the next save.
    ///
    /// Unchanged units with a stored payload are copied byte for byte.
    pub changed: bool,
}

impl DataUnit {
    /// Creates a new in-memory unit. New units are always marked changed.
    pub fn new(name: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Plain(body.into()),
            changed: true,
        }
    }

    /// Creates a unit whose body is still in its source file.
    pub fn stored(name: impl Into<String>, offset: u64, len: u32, crc: u32) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Stored { offset, len, crc },
            changed: false,
        }
    }

    /// Returns the unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Replaces the body and marks the unit changed.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.payload = Payload::Plain(body.into());
        self.changed = true;
    }

    /// Returns the decoded body, reading it from `origin` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detached`] if the body is stored and the origin's file
    /// was released, or [`Error::CorruptUnit`] if it fails its checksum under
    /// the origin's profile.
    pub fn body(&self, origin: &Origin) -> Result<Vec<u8>> {
        match &self.payload {
            Payload::Plain(data) => Ok(data.clone()),
            Payload::Stored { offset, len, crc } => {
                let mut data = origin.read_stored(&self.name, *offset, *len)?;
                origin.profile().keystream().apply(&mut data);
                let actual = crc32fast::hash(&data);
                if actual != *crc {
                    return Err(Error::corrupt_unit(&self.name, *crc, actual));
                }
                Ok(data)
            }
        }
    }
}

/// A data unit saved as a standalone file, with no enclosing archive.
#[derive(Debug)]
pub struct LooseUnit {
    unit: DataUnit,
    origin: Origin,
}

impl LooseUnit {
    /// Creates an in-memory loose unit that has never been saved.
    pub fn new(unit: DataUnit, profile: EncryptionProfile) -> Self {
        Self {
            unit,
            origin: Origin::detached(profile),
        }
    }

    /// Wraps a unit loaded from `origin`.
    pub fn from_origin(unit: DataUnit, origin: Origin) -> Self {
        Self { unit, origin }
    }

    /// Returns the unit.
    pub fn unit(&self) -> &DataUnit {
        &self.unit
    }

    /// Returns the unit mutably.
    pub fn unit_mut(&mut self) -> &mut DataUnit {
        &mut self.unit
    }

    /// Returns where the unit was loaded from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns the origin mutably.
    pub fn origin_mut(&mut self) -> &mut Origin {
        &mut self.origin
    }

    /// Returns the decoded body.
    pub fn body(&self) -> Result<Vec<u8>> {
        self.unit.body(&self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileId;

    #[test]
    fn test_new_unit_is_changed() {
        let unit = DataUnit::new("Item.img", b"body".to_vec());
        assert!(unit.changed);
        assert_eq!(unit.payload().len(), 4);
        assert_eq!(unit.name(), "Item.img");
    }

    #[test]
    fn test_stored_unit_is_unchanged() {
        let unit = DataUnit::stored("Mob.img", 100, 20, 0);
        assert!(!unit.changed);
        assert!(matches!(unit.payload(), Payload::Stored { offset: 100, .. }));
    }

    #[test]
    fn test_set_body_marks_changed() {
        let mut unit = DataUnit::stored("Npc.img", 0, 3, 0);
        unit.set_body(b"new".to_vec());
        assert!(unit.changed);
        assert_eq!(unit.payload(), &Payload::Plain(b"new".to_vec()));
    }

    #[test]
    fn test_stored_body_without_source_is_detached() {
        let unit = DataUnit::stored("Skill.img", 0, 3, 0);
        let origin = Origin::detached(EncryptionProfile::builtin(ProfileId::Gms));
        match unit.body(&origin) {
            Err(Error::Detached { name }) => assert_eq!(name, "Skill.img"),
            other => panic!("Expected Detached, got: {:?}", other),
        }
    }

    #[test]
    fn test_loose_unit_plain_body() {
        let loose = LooseUnit::new(
            DataUnit::new("Data.img", b"abc".to_vec()),
            EncryptionProfile::builtin(ProfileId::Bms),
        );
        assert_eq!(loose.body().unwrap(), b"abc");
        assert!(loose.origin().path().is_none());
    }
}
