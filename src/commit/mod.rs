//! The save pipeline.
//!
//! A save resolves the target profile, propagates dirty flags when the cipher
//! changes, writes the new file to a side file, swaps it into place and loads
//! it back. [`CommitCoordinator`] runs those steps as one state machine per
//! request; the other types here are the individual steps.
//!
//! The pipeline never deletes the file at the target path before its
//! replacement is completely written.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wzsave::codec::PackageCodec;
//! use wzsave::commit::{CommitCoordinator, SaveOptions, SaveRequest};
//! use wzsave::crypto::KeyTable;
//! use wzsave::model::{ArchiveUnit, DataUnit, Hierarchy};
//! use wzsave::profile::{EncryptionProfile, FormatVersion, NoPrompt, ProfileId, ProfileSelection};
//! use wzsave::registry::CodecRegistry;
//!
//! let dir = tempfile::tempdir()?;
//! let target = dir.path().join("Quest.wz");
//!
//! let mut archive = Hierarchy::new(
//!     "Quest.wz",
//!     EncryptionProfile::builtin(ProfileId::Gms),
//!     FormatVersion::new(83),
//! );
//! archive.root_mut().add_unit(DataUnit::new("Act.img", b"act".to_vec()));
//! let mut unit = ArchiveUnit::from(archive);
//!
//! let mut coordinator = CommitCoordinator::new(PackageCodec, CodecRegistry::new(PackageCodec), NoPrompt)
//!     .with_key_table(Arc::new(KeyTable::new()))
//!     .with_options(SaveOptions::new().backup());
//!
//! let outcome = coordinator.save(SaveRequest::new(&mut unit, &target, ProfileSelection::Ems));
//! assert!(outcome.is_committed());
//! assert_eq!(unit.source_path(), Some(target.as_path()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod coordinator;
mod options;
mod outcome;
mod propagate;
mod replace;
mod worker;
mod writer;

pub use coordinator::{CommitCoordinator, SaveRequest};
pub use options::{ReplaceStrategy, SaveOptions};
pub use outcome::{CommitOutcome, SaveState};
pub use propagate::propagate;
pub use replace::{
    AtomicReplacer, backup_path, hierarchy_staging_path, loose_staging_path, same_path,
};
pub use worker::{SaveJob, SaveReport, SaveWorker};
pub use writer::ArchiveWriter;
