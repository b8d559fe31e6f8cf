//! Directories and whole-archive hierarchies.

use std::fmt;

use super::{DataUnit, Origin};
use crate::Result;
use crate::profile::{EncryptionProfile, FormatVersion};

/// A directory inside an archive.
///
/// Trees are built, walked and dropped without recursion, so nesting depth
/// is bounded only by memory.
#[derive(Default)]
pub struct Directory {
    name: String,
    directories: Vec<Directory>,
    units: Vec<DataUnit>,
}

impl Directory {
    /// Creates an empty directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directories: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Returns the directory name. The root directory's name is empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the immediate subdirectories.
    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    /// Returns the immediate subdirectories mutably.
    pub fn directories_mut(&mut self) -> &mut Vec<Directory> {
        &mut self.directories
    }

    /// Returns the units directly in this directory.
    pub fn units(&self) -> &[DataUnit] {
        &self.units
    }

    /// Returns the units directly in this directory mutably.
    pub fn units_mut(&mut self) -> &mut Vec<DataUnit> {
        &mut self.units
    }

    /// Appends a subdirectory and returns it.
    pub fn add_directory(&mut self, directory: Directory) -> &mut Directory {
        self.directories.push(directory);
        let last = self.directories.len() - 1;
        &mut self.directories[last]
    }

    /// Appends a unit and returns it.
    pub fn add_unit(&mut self, unit: DataUnit) -> &mut DataUnit {
        self.units.push(unit);
        let last = self.units.len() - 1;
        &mut self.units[last]
    }

    /// Iterates over every unit in this subtree, depth first.
    pub fn walk_units(&self) -> Units<'_> {
        Units {
            stack: vec![self],
            current: Default::default(),
        }
    }

    /// Iterates mutably over every unit in this subtree, depth first.
    pub fn walk_units_mut(&mut self) -> UnitsMut<'_> {
        UnitsMut {
            stack: vec![self],
            current: Default::default(),
        }
    }

    /// Returns the number of units in this subtree.
    pub fn unit_count(&self) -> usize {
        self.walk_units().count()
    }

    /// Returns the number of directories in this subtree, excluding itself.
    pub fn directory_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(dir) = stack.pop() {
            count += dir.directories.len();
            stack.extend(dir.directories.iter());
        }
        count
    }

    /// Lists the slash-separated path of every unit, depth first.
    pub fn unit_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        let mut stack: Vec<(String, &Directory)> = vec![(String::new(), self)];
        while let Some((prefix, dir)) = stack.pop() {
            for unit in &dir.units {
                paths.push(format!("{}{}", prefix, unit.name()));
            }
            for sub in dir.directories.iter().rev() {
                stack.push((format!("{}{}/", prefix, sub.name), sub));
            }
        }
        paths
    }
}

impl Drop for Directory {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.directories);
        while let Some(mut dir) = stack.pop() {
            stack.append(&mut dir.directories);
        }
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subdirs: Vec<&str> = self.directories.iter().map(|d| d.name()).collect();
        f.debug_struct("Directory")
            .field("name", &self.name)
            .field("directories", &subdirs)
            .field("units", &self.units)
            .finish()
    }
}

/// Depth-first iterator over the units of a directory tree.
pub struct Units<'a> {
    stack: Vec<&'a Directory>,
    current: std::slice::Iter<'a, DataUnit>,
}

impl<'a> Iterator for Units<'a> {
    type Item = &'a DataUnit;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(unit) = self.current.next() {
                return Some(unit);
            }
            let dir = self.stack.pop()?;
            self.stack.extend(dir.directories.iter().rev());
            self.current = dir.units.iter();
        }
    }
}

/// Depth-first mutable iterator over the units of a directory tree.
///
/// Uses an explicit stack, so deeply nested archives cannot overflow the
/// call stack.
pub struct UnitsMut<'a> {
    stack: Vec<&'a mut Directory>,
    current: std::slice::IterMut<'a, DataUnit>,
}

impl<'a> Iterator for UnitsMut<'a> {
    type Item = &'a mut DataUnit;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(unit) = self.current.next() {
                return Some(unit);
            }
            let Directory {
                directories, units, ..
            } = self.stack.pop()?;
            self.stack.extend(directories.iter_mut().rev());
            self.current = units.iter_mut();
        }
    }
}

/// A whole archive: a root directory plus the file it was loaded from.
#[derive(Debug)]
pub struct Hierarchy {
    name: String,
    root: Directory,
    version: FormatVersion,
    origin: Origin,
}

impl Hierarchy {
    /// Creates an empty archive that has never been saved.
    pub fn new(name: impl Into<String>, profile: EncryptionProfile, version: FormatVersion) -> Self {
        Self {
            name: name.into(),
            root: Directory::default(),
            version,
            origin: Origin::detached(profile),
        }
    }

    /// Assembles an archive loaded from `origin`.
    pub fn from_parts(
        name: impl Into<String>,
        root: Directory,
        version: FormatVersion,
        origin: Origin,
    ) -> Self {
        Self {
            name: name.into(),
            root,
            version,
            origin,
        }
    }

    /// Returns the archive name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Returns the root directory mutably.
    pub fn root_mut(&mut self) -> &mut Directory {
        &mut self.root
    }

    /// Returns the format version the archive was loaded with.
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Sets the format version used by the next save.
    pub fn set_version(&mut self, version: FormatVersion) {
        self.version = version;
    }

    /// Returns the profile the archive was loaded with.
    pub fn profile(&self) -> &EncryptionProfile {
        self.origin.profile()
    }

    /// Returns where the archive was loaded from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns the origin mutably.
    pub fn origin_mut(&mut self) -> &mut Origin {
        &mut self.origin
    }

    /// Returns the decoded body of one of this archive's units.
    pub fn unit_body(&self, unit: &DataUnit) -> Result<Vec<u8>> {
        unit.body(&self.origin)
    }
}
