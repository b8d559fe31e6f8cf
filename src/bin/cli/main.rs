//! CLI tool for re-saving WZ archives.

mod commands;
mod exit_codes;
mod interrupt;
mod keys;
mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;
use wzsave::ProfileSelection;

/// Re-encrypt and save WZ archives
#[derive(Parser)]
#[command(name = "wzsave")]
#[command(author, version, about = "Re-encrypt and save WZ archives", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Only print errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show archive contents and check unit integrity (alias: i)
    #[command(alias = "i")]
    Info {
        /// Archive or loose unit file
        archive: PathBuf,

        /// Profile the file is encrypted with
        #[arg(short = 'p', long, value_enum, default_value = "gms")]
        profile: Profile,

        /// Treat the file as a single loose unit
        #[arg(long)]
        loose: bool,

        /// Decode every unit and verify its checksum
        #[arg(long)]
        verify: bool,

        #[command(flatten)]
        key: KeyArgs,
    },

    /// Re-save an archive under another profile (alias: s)
    #[command(alias = "s")]
    Save {
        /// Archive to save
        archive: PathBuf,

        /// Profile the archive is currently encrypted with
        #[arg(long, value_enum, default_value = "gms")]
        from: Profile,

        /// Profile to save under
        #[arg(long, value_enum)]
        to: Profile,

        /// Write to this path instead of replacing the archive
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Format version to write (0-32767)
        #[arg(long = "format-version", allow_negative_numbers = true)]
        format_version: Option<i32>,

        #[command(flatten)]
        replace: ReplaceArgs,

        #[command(flatten)]
        key: KeyArgs,
    },

    /// Re-save a loose data unit under another profile
    SaveUnit {
        /// Unit file to save
        unit: PathBuf,

        /// Profile the unit is currently encrypted with
        #[arg(long, value_enum, default_value = "gms")]
        from: Profile,

        /// Profile to save under
        #[arg(long, value_enum)]
        to: Profile,

        /// Write to this path instead of replacing the unit
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        replace: ReplaceArgs,

        #[command(flatten)]
        key: KeyArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Custom key material. Prompted for when a custom profile needs it and it
/// was not given.
#[derive(clap::Args, Clone, Default)]
pub struct KeyArgs {
    /// IV of the custom profile being read, as 8 hex digits
    #[arg(long, env = "WZSAVE_FROM_IV")]
    from_iv: Option<String>,

    /// User key of the custom profile being read, as 64 hex digits
    #[arg(long, env = "WZSAVE_FROM_KEY", hide_env_values = true)]
    from_key: Option<String>,

    /// IV of the custom profile to save under, as 8 hex digits
    #[arg(long, env = "WZSAVE_TO_IV")]
    to_iv: Option<String>,

    /// User key of the custom profile to save under, as 64 hex digits
    #[arg(long, env = "WZSAVE_TO_KEY", hide_env_values = true)]
    to_key: Option<String>,
}

#[derive(clap::Args, Clone, Copy, Default)]
pub struct ReplaceArgs {
    /// Keep a .bak copy of the original until the new file is in place
    #[arg(long)]
    backup: bool,

    /// Skip fsync of the new file
    #[arg(long)]
    no_sync: bool,

    /// Keep partially written staging files after a failure
    #[arg(long)]
    keep_staging: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    Gms,
    Ems,
    Bms,
    Custom,
}

impl From<Profile> for ProfileSelection {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Gms => ProfileSelection::Gms,
            Profile::Ems => ProfileSelection::Ems,
            Profile::Bms => ProfileSelection::Bms,
            Profile::Custom => ProfileSelection::Custom,
        }
    }
}

fn main() {
    // Set up Ctrl+C handler
    interrupt::install();

    let cli = Cli::parse();

    let default_filter = if cli.quiet { "error" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let exit_code = match cli.command {
        Commands::Info {
            archive,
            profile,
            loose,
            verify,
            key,
        } => commands::info(&commands::InfoConfig {
            path: &archive,
            profile,
            loose,
            verify,
            key,
            format: cli.format,
        }),

        Commands::Save {
            archive,
            from,
            to,
            output,
            format_version,
            replace,
            key,
        } => commands::save(&commands::SaveConfig {
            path: &archive,
            output: output.as_deref(),
            from,
            to,
            version: format_version,
            loose: false,
            replace,
            key,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::SaveUnit {
            unit,
            from,
            to,
            output,
            replace,
            key,
        } => commands::save(&commands::SaveConfig {
            path: &unit,
            output: output.as_deref(),
            from,
            to,
            version: None,
            loose: true,
            replace,
            key,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    let exit_code = if interrupt::interrupted() {
        ExitCode::UserInterrupt
    } else {
        exit_code
    };
    std::process::exit(exit_code.code());
}
