//! # wzsave
//!
//! Re-encryption and atomic save pipeline for WZ game-data archives.
//!
//! An editor that saves an archive under a different cipher than it was
//! loaded with has to get several things right at once: every unit that is
//! normally copied verbatim must be re-encoded, the new file must be written
//! beside the old one, the old file may only disappear once its replacement
//! is complete, and the editor must end up bound to the new file. This crate
//! does that, and nothing else.
//!
//! ## Quick Start
//!
//! ### Re-encrypting an Archive in Place
//!
//! ```rust,no_run
//! use wzsave::commit::{CommitCoordinator, SaveRequest};
//! use wzsave::codec::PackageCodec;
//! use wzsave::model::UnitKind;
//! use wzsave::profile::{EncryptionProfile, NoPrompt, ProfileId, ProfileSelection};
//! use wzsave::registry::{CodecRegistry, FileRegistry};
//! use wzsave::Result;
//!
//! fn main() -> Result<()> {
//!     let mut registry = CodecRegistry::new(PackageCodec);
//!     let mut unit = registry.load(
//!         "Character.wz".as_ref(),
//!         UnitKind::Hierarchy,
//!         &EncryptionProfile::builtin(ProfileId::Gms),
//!     )?;
//!
//!     let mut coordinator = CommitCoordinator::new(PackageCodec, registry, NoPrompt);
//!     let outcome = coordinator.save(
//!         SaveRequest::new(&mut unit, "Character.wz", ProfileSelection::Bms).version(176),
//!     );
//!     let path = outcome.into_result()?;
//!     println!("Saved {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ### Saving Under a Custom Key
//!
//! Custom profiles ask a [`KeyPrompt`](profile::KeyPrompt) for the IV and
//! user key. Returning `None` cancels the save before any file is touched.
//!
//! ```rust,no_run
//! use wzsave::commit::{CommitCoordinator, SaveRequest};
//! use wzsave::codec::PackageCodec;
//! use wzsave::model::{ArchiveUnit, DataUnit, LooseUnit};
//! use wzsave::profile::{CustomKey, EncryptionProfile, ProfileId, ProfileSelection};
//! use wzsave::registry::CodecRegistry;
//!
//! let prompt = || CustomKey::from_hex("0a0b0c0d", &"42".repeat(32)).ok();
//! let mut coordinator = CommitCoordinator::new(PackageCodec, CodecRegistry::new(PackageCodec), prompt);
//!
//! let mut unit: ArchiveUnit = LooseUnit::new(
//!     DataUnit::new("Weapon.img", b"...".to_vec()),
//!     EncryptionProfile::builtin(ProfileId::Gms),
//! )
//! .into();
//! let outcome = coordinator.save(SaveRequest::new(&mut unit, "Weapon.img", ProfileSelection::Custom));
//! ```
//!
//! ## Error Handling
//!
//! Every failure names what is left on disk; see [`Error`].
//!
//! ```rust
//! use wzsave::commit::CommitOutcome;
//!
//! fn report(outcome: CommitOutcome) {
//!     match outcome {
//!         CommitOutcome::Committed(path) => println!("Saved {}", path.display()),
//!         CommitOutcome::Aborted { error, .. } if error.is_cancelled() => {}
//!         CommitOutcome::Aborted { error, .. } => {
//!             if let Some(staged) = error.staged_path() {
//!                 eprintln!("New archive kept at {}", staged.display());
//!             }
//!             eprintln!("Save failed: {}", error);
//!         }
//!     }
//! }
//! ```
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod codec;
pub mod commit;
pub mod crypto;
pub mod error;
pub mod model;
pub mod profile;
pub mod registry;

pub use commit::{CommitCoordinator, CommitOutcome, SaveOptions, SaveRequest};
pub use error::{Error, Result};
pub use model::{ArchiveUnit, UnitKind};
pub use profile::{EncryptionProfile, FormatVersion, ProfileId, ProfileSelection};
