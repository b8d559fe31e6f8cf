//! The save state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::options::SaveOptions;
use super::outcome::{CommitOutcome, SaveState};
use super::propagate::propagate;
use super::replace::{AtomicReplacer, hierarchy_staging_path, same_path};
use super::writer::ArchiveWriter;
use crate::codec::ArchiveCodec;
use crate::crypto::KeyTable;
use crate::model::ArchiveUnit;
use crate::profile::{EncryptionProfile, FormatVersion, KeyPrompt, ProfileSelection};
use crate::registry::FileRegistry;
use crate::{Error, Result};

/// One user save action.
///
/// The unit is borrowed mutably for the whole save, so a unit cannot be
/// saved twice at once. On success it is replaced by the freshly loaded file.
#[derive(Debug)]
pub struct SaveRequest<'a> {
    /// The unit to save.
    pub unit: &'a mut ArchiveUnit,
    /// Where to save it. May be the path it was loaded from.
    pub target: PathBuf,
    /// The cipher to save under.
    pub selection: ProfileSelection,
    /// Format version to write. `None` keeps the archive's current version.
    /// Ignored for loose units.
    pub version: Option<i32>,
}

impl<'a> SaveRequest<'a> {
    /// Creates a request that keeps the current format version.
    pub fn new(
        unit: &'a mut ArchiveUnit,
        target: impl Into<PathBuf>,
        selection: ProfileSelection,
    ) -> Self {
        Self {
            unit,
            target: target.into(),
            selection,
            version: None,
        }
    }

    /// Sets the format version to write.
    pub fn version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }
}

/// How the written file reaches the target path.
enum Staged {
    /// Already at the target.
    InPlace,
    /// Staged next to the target; swap in with the replacer.
    Swap(PathBuf),
    /// Staged next to the target; copy over it.
    Copy(PathBuf),
}

/// Runs save requests through resolve, propagate, write, replace and reload.
///
/// # Example
///
/// ```rust,no_run
/// use wzsave::commit::{CommitCoordinator, SaveRequest};
/// use wzsave::codec::PackageCodec;
/// use wzsave::profile::{NoPrompt, ProfileSelection, EncryptionProfile, ProfileId};
/// use wzsave::registry::{CodecRegistry, FileRegistry};
/// use wzsave::model::UnitKind;
///
/// let mut registry = CodecRegistry::new(PackageCodec);
/// let mut unit = registry.load(
///     "Map.wz".as_ref(),
///     UnitKind::Hierarchy,
///     &EncryptionProfile::builtin(ProfileId::Gms),
/// )?;
///
/// let mut coordinator = CommitCoordinator::new(PackageCodec, registry, NoPrompt);
/// let outcome = coordinator.save(SaveRequest::new(&mut unit, "Map.wz", ProfileSelection::Ems));
/// assert!(outcome.is_committed());
/// # Ok::<(), wzsave::Error>(())
/// ```
#[derive(Debug)]
pub struct CommitCoordinator<C, R, P> {
    codec: C,
    registry: R,
    prompt: P,
    keys: Arc<KeyTable>,
    options: SaveOptions,
}

impl<C, R, P> CommitCoordinator<C, R, P>
where
    C: ArchiveCodec,
    R: FileRegistry,
    P: KeyPrompt,
{
    /// Creates a coordinator using the process-wide key table.
    pub fn new(codec: C, registry: R, prompt: P) -> Self {
        Self {
            codec,
            registry,
            prompt,
            keys: KeyTable::shared(),
            options: SaveOptions::default(),
        }
    }

    /// Uses `keys` instead of the process-wide key table.
    pub fn with_key_table(mut self, keys: Arc<KeyTable>) -> Self {
        self.keys = keys;
        self
    }

    /// Sets the save options.
    pub fn with_options(mut self, options: SaveOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the save options.
    pub fn options(&self) -> &SaveOptions {
        &self.options
    }

    /// Returns the key table in use.
    pub fn key_table(&self) -> &Arc<KeyTable> {
        &self.keys
    }

    /// Returns the file registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Returns the file registry mutably.
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Saves a unit and reports how far the save got.
    ///
    /// Never retries. Every failure stops the save in the state it had
    /// reached; see [`Error`] for what each kind leaves on disk.
    pub fn save(&mut self, request: SaveRequest<'_>) -> CommitOutcome {
        let name = request.unit.name().to_string();
        let mut state = SaveState::Idle;
        match self.run(request, &name, &mut state) {
            Ok(path) => {
                log::info!("Saved '{}' to {}", name, path.display());
                CommitOutcome::Committed(path)
            }
            Err(error) => {
                if error.is_cancelled() {
                    log::info!("Save of '{}' cancelled", name);
                } else if error.is_committed() {
                    log::warn!("Save of '{}' committed with error: {}", name, error);
                } else {
                    log::error!("Save of '{}' aborted in state {}: {}", name, state, error);
                }
                CommitOutcome::Aborted { state, error }
            }
        }
    }

    fn run(&mut self, request: SaveRequest<'_>, name: &str, state: &mut SaveState) -> Result<PathBuf> {
        let SaveRequest {
            unit,
            target,
            selection,
            version,
        } = request;

        let version = version.map(FormatVersion::try_from).transpose()?;
        let keys = Arc::clone(&self.keys);
        let mut lease = keys.lease();
        let profile = EncryptionProfile::resolve(selection, &mut self.prompt, &mut lease)?;
        advance(state, SaveState::ProfileResolved, name);

        if let ArchiveUnit::Hierarchy(hierarchy) = &mut *unit {
            let old = hierarchy.profile().clone();
            propagate(hierarchy.root_mut(), &old, &profile);
        }
        advance(state, SaveState::Propagated, name);

        let source = unit.source_path().map(Path::to_path_buf);
        let in_place = source.as_deref().is_some_and(|s| same_path(s, &target));
        let staged = self.write(unit, &target, &profile, version, in_place)?;
        drop(lease);
        advance(state, SaveState::Written, name);

        self.commit(unit, staged, &target)?;
        if let Some(source) = &source {
            self.registry.release(source);
        }
        advance(state, SaveState::Replaced, name);

        if self.options.reload {
            let fresh = self
                .registry
                .load(&target, unit.kind(), &profile)
                .map_err(|e| Error::ReloadFailed {
                    path: target.clone(),
                    source: Box::new(e),
                })?;
            *unit = fresh;
            advance(state, SaveState::Reloaded, name);
        }

        advance(state, SaveState::Done, name);
        Ok(target)
    }

    fn write(
        &self,
        unit: &ArchiveUnit,
        target: &Path,
        profile: &EncryptionProfile,
        version: Option<FormatVersion>,
        in_place: bool,
    ) -> Result<Staged> {
        let writer = ArchiveWriter::new(&self.codec)
            .sync(self.options.sync)
            .cleanup_staging(self.options.cleanup_staging);

        match unit {
            ArchiveUnit::Hierarchy(hierarchy) => {
                let version = version.unwrap_or(hierarchy.version());
                if in_place {
                    let staging = hierarchy_staging_path(target);
                    writer.stage_hierarchy(hierarchy, &staging, profile, version)?;
                    Ok(Staged::Swap(staging))
                } else {
                    writer.write_hierarchy(hierarchy, target, profile, version)?;
                    Ok(Staged::InPlace)
                }
            }
            ArchiveUnit::Loose(loose) => {
                if version.is_some() {
                    log::debug!("Loose units carry no version; ignoring requested version");
                }
                let staging = writer.stage_loose_unit(loose, target, profile)?;
                Ok(Staged::Copy(staging))
            }
        }
    }

    fn commit(&self, unit: &mut ArchiveUnit, staged: Staged, target: &Path) -> Result<()> {
        // The target may be the open source; release it before touching it
        unit.origin_mut().detach();

        let replacer = AtomicReplacer::new(self.options.strategy).sync(self.options.sync);
        let result = match &staged {
            Staged::InPlace => Ok(()),
            Staged::Swap(staging) => replacer.replace(staging, target),
            Staged::Copy(staging) => replacer.copy_into_place(staging, target),
        };

        if result.is_err() && unit.source_path().is_some_and(Path::exists) {
            if let Err(e) = unit.origin_mut().reopen() {
                log::warn!("Failed to reattach '{}' to its source: {}", unit.name(), e);
            }
        }
        result
    }
}

fn advance(state: &mut SaveState, next: SaveState, name: &str) {
    log::debug!("Save '{}': {} -> {}", name, state, next);
    *state = next;
}
