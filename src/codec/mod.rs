//! Archive codec seam.
//!
//! The save pipeline never touches archive bytes directly. It drives an
//! [`ArchiveCodec`] through a [`UnitWriter`] bound to the target profile, and
//! loads files back through the same codec. [`PackageCodec`] is the
//! implementation shipped with the crate.
//!
//! # Example
//!
//! ```rust
//! use wzsave::codec::{ArchiveCodec, PackageCodec, UnitWriter};
//! use wzsave::model::{DataUnit, Hierarchy};
//! use wzsave::profile::{EncryptionProfile, FormatVersion, ProfileId};
//!
//! let profile = EncryptionProfile::builtin(ProfileId::Ems);
//! let mut archive = Hierarchy::new("String.wz", profile.clone(), FormatVersion::new(95));
//! archive.root_mut().add_unit(DataUnit::new("Eqp.img", b"data".to_vec()));
//!
//! let mut writer = UnitWriter::new(Vec::new(), &profile);
//! PackageCodec.write_hierarchy(&archive, archive.version(), &mut writer)?;
//! assert!(writer.position() > 0);
//! # Ok::<(), wzsave::Error>(())
//! ```

mod package;
mod reader;
mod writer;

use std::io::Write;

use crate::Result;
use crate::model::{Hierarchy, LooseUnit, Origin};
use crate::profile::FormatVersion;

pub use package::{ARCHIVE_MAGIC, KEY_CHECK, PackageCodec, UNIT_MAGIC};
pub use reader::UnitReader;
pub use writer::UnitWriter;

/// Serializes and deserializes archives and loose units.
///
/// Writers are bound to the target profile; origins carry the open source
/// file and the profile it must be decoded with. A unit that is stored and
/// unchanged may be copied byte for byte from its origin, so callers must
/// mark units changed before writing under a different cipher.
pub trait ArchiveCodec {
    /// Writes a whole archive with the given format version.
    fn write_hierarchy<W: Write>(
        &self,
        hierarchy: &Hierarchy,
        version: FormatVersion,
        out: &mut UnitWriter<W>,
    ) -> Result<()>;

    /// Writes a loose unit. `force_rewrite` re-encodes even unchanged bodies.
    fn write_unit<W: Write>(
        &self,
        unit: &LooseUnit,
        out: &mut UnitWriter<W>,
        force_rewrite: bool,
    ) -> Result<()>;

    /// Reads an archive from `origin`. Unit bodies stay in the file.
    fn read_hierarchy(&self, origin: Origin) -> Result<Hierarchy>;

    /// Reads a loose unit from `origin`.
    fn read_loose_unit(&self, origin: Origin) -> Result<LooseUnit>;
}

impl<C: ArchiveCodec + ?Sized> ArchiveCodec for &C {
    fn write_hierarchy<W: Write>(
        &self,
        hierarchy: &Hierarchy,
        version: FormatVersion,
        out: &mut UnitWriter<W>,
    ) -> Result<()> {
        (**self).write_hierarchy(hierarchy, version, out)
    }

    fn write_unit<W: Write>(
        &self,
        unit: &LooseUnit,
        out: &mut UnitWriter<W>,
        force_rewrite: bool,
    ) -> Result<()> {
        (**self).write_unit(unit, out, force_rewrite)
    }

    fn read_hierarchy(&self, origin: Origin) -> Result<Hierarchy> {
        (**self).read_hierarchy(origin)
    }

    fn read_loose_unit(&self, origin: Origin) -> Result<LooseUnit> {
        (**self).read_loose_unit(origin)
    }
}
