//! Command implementations for the CLI tool.

use std::path::Path;

use wzsave::codec::PackageCodec;
use wzsave::commit::{
    CommitCoordinator, CommitOutcome, ReplaceStrategy, SaveOptions, SaveRequest, SaveState,
};
use wzsave::model::{ArchiveUnit, UnitKind};
use wzsave::profile::{EncryptionProfile, KeyPrompt, ProfileSelection};
use wzsave::registry::{CodecRegistry, FileRegistry};

use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::interrupt;
use crate::keys::TerminalPrompt;
use crate::output::{InfoSummary, SaveSummary, UnitLine, create_formatter};
use crate::{KeyArgs, OutputFormat, Profile, ReplaceArgs};

/// Configuration for the info command.
pub struct InfoConfig<'a> {
    pub path: &'a Path,
    pub profile: Profile,
    pub loose: bool,
    pub verify: bool,
    pub key: KeyArgs,
    pub format: OutputFormat,
}

/// Configuration for the save and save-unit commands.
pub struct SaveConfig<'a> {
    pub path: &'a Path,
    pub output: Option<&'a Path>,
    pub from: Profile,
    pub to: Profile,
    pub version: Option<i32>,
    pub loose: bool,
    pub replace: ReplaceArgs,
    pub key: KeyArgs,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Info command implementation
pub fn info(config: &InfoConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let profile = match source_profile(config.profile, &config.key) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let mut registry = CodecRegistry::new(PackageCodec);
    let unit = match open_unit(&mut registry, config.path, kind(config.loose), &profile) {
        Ok(u) => u,
        Err(code) => return code,
    };

    let summary = summarize(config.path, &unit, config.verify);
    print!("{}", formatter.format_info(&summary));

    if summary.failed_units() > 0 {
        ExitCode::WrongKey
    } else {
        ExitCode::Success
    }
}

/// Save command implementation
pub fn save(config: &SaveConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let profile = match source_profile(config.from, &config.key) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let mut registry = CodecRegistry::new(PackageCodec);
    let mut unit = match open_unit(&mut registry, config.path, kind(config.loose), &profile) {
        Ok(u) => u,
        Err(code) => return code,
    };

    let strategy = if config.replace.backup {
        ReplaceStrategy::BackupThenRename
    } else {
        ReplaceStrategy::DeleteThenRename
    };
    let options = SaveOptions::new()
        .strategy(strategy)
        .sync(!config.replace.no_sync)
        .cleanup_staging(!config.replace.keep_staging);
    let prompt = TerminalPrompt::new(
        "Target",
        config.key.to_iv.clone(),
        config.key.to_key.clone(),
    );
    let mut coordinator =
        CommitCoordinator::new(PackageCodec, registry, prompt).with_options(options);

    let target = config.output.unwrap_or(config.path).to_path_buf();
    let selection = ProfileSelection::from(config.to);
    let mut request = SaveRequest::new(&mut unit, &target, selection);
    request.version = config.version;
    let outcome = {
        let _saving = interrupt::saving();
        coordinator.save(request)
    };

    let code = match &outcome {
        CommitOutcome::Committed(_) => ExitCode::Success,
        CommitOutcome::Aborted { error, .. } => error_to_exit_code(error),
    };
    let summary = SaveSummary {
        source: config.path.to_path_buf(),
        target,
        profile: selection.to_string(),
        state: match &outcome {
            CommitOutcome::Committed(_) => SaveState::Done.to_string(),
            CommitOutcome::Aborted { state, .. } => state.to_string(),
        },
        committed: outcome.file_committed(),
        error: outcome.error().map(|e| e.to_string()),
        staged: outcome
            .error()
            .and_then(|e| e.staged_path())
            .map(Path::to_path_buf),
    };

    if !(config.quiet && code == ExitCode::Success) {
        print!("{}", formatter.format_save(&summary));
    }
    code
}

fn kind(loose: bool) -> UnitKind {
    if loose {
        UnitKind::Loose
    } else {
        UnitKind::Hierarchy
    }
}

/// Resolves the profile a file is read with, prompting for custom keys.
fn source_profile(profile: Profile, key: &KeyArgs) -> Result<EncryptionProfile, ExitCode> {
    match profile {
        Profile::Custom => {
            let mut prompt =
                TerminalPrompt::new("Source", key.from_iv.clone(), key.from_key.clone());
            prompt
                .prompt_custom_key()
                .map(EncryptionProfile::custom)
                .ok_or_else(|| {
                    eprintln!("Custom key entry cancelled");
                    ExitCode::Cancelled
                })
        }
        builtin => Ok(EncryptionProfile::builtin(ProfileSelection::from(builtin).id())),
    }
}

fn open_unit(
    registry: &mut CodecRegistry<PackageCodec>,
    path: &Path,
    kind: UnitKind,
    profile: &EncryptionProfile,
) -> Result<ArchiveUnit, ExitCode> {
    registry.load(path, kind, profile).map_err(|e| {
        eprintln!("Error opening {}: {}", path.display(), e);
        error_to_exit_code(&e)
    })
}

fn summarize(path: &Path, unit: &ArchiveUnit, verify: bool) -> InfoSummary {
    match unit {
        ArchiveUnit::Hierarchy(h) => {
            let units = h
                .root()
                .unit_paths()
                .into_iter()
                .zip(h.root().walk_units())
                .map(|(unit_path, u)| UnitLine {
                    path: unit_path,
                    size: u.payload().len(),
                    error: if verify {
                        h.unit_body(u).err().map(|e| e.to_string())
                    } else {
                        None
                    },
                })
                .collect();
            InfoSummary {
                path: path.to_path_buf(),
                kind: "archive",
                profile: h.profile().id().to_string(),
                version: Some(h.version().get()),
                directories: h.root().directory_count(),
                units,
                verified: verify,
            }
        }
        ArchiveUnit::Loose(l) => InfoSummary {
            path: path.to_path_buf(),
            kind: "loose unit",
            profile: l.origin().profile().id().to_string(),
            version: None,
            directories: 0,
            units: vec![UnitLine {
                path: l.unit().name().to_string(),
                size: l.unit().payload().len(),
                error: if verify {
                    l.body().err().map(|e| e.to_string())
                } else {
                    None
                },
            }],
            verified: verify,
        },
    }
}
