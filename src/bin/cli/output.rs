//! Output formatting for CLI operations.

use serde_json::json;
use std::path::PathBuf;

/// One unit in an info listing.
pub struct UnitLine {
    pub path: String,
    pub size: usize,
    /// Verification error, if the unit was checked and failed.
    pub error: Option<String>,
}

/// What `info` reports about a file.
pub struct InfoSummary {
    pub path: PathBuf,
    pub kind: &'static str,
    pub profile: String,
    pub version: Option<u16>,
    pub directories: usize,
    pub units: Vec<UnitLine>,
    pub verified: bool,
}

impl InfoSummary {
    pub fn failed_units(&self) -> usize {
        self.units.iter().filter(|u| u.error.is_some()).count()
    }
}

/// What `save` reports.
pub struct SaveSummary {
    pub source: PathBuf,
    pub target: PathBuf,
    pub profile: String,
    pub state: String,
    pub committed: bool,
    pub error: Option<String>,
    pub staged: Option<PathBuf>,
}

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats file information
    fn format_info(&self, info: &InfoSummary) -> String;

    /// Formats a save result
    fn format_save(&self, save: &SaveSummary) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_info(&self, info: &InfoSummary) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}:\n", info.path.display()));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Kind:           {}\n", info.kind));
        output.push_str(&format!("  Profile:        {}\n", info.profile));
        if let Some(version) = info.version {
            output.push_str(&format!("  Version:        {}\n", version));
        }
        output.push_str(&format!("  Directories:    {}\n", info.directories));
        output.push_str(&format!("  Units:          {}\n", info.units.len()));
        let total: u64 = info.units.iter().map(|u| u.size as u64).sum();
        output.push_str(&format!("  Total size:     {}\n", humanize_bytes(total)));
        output.push('\n');

        for unit in &info.units {
            let status = match (&unit.error, info.verified) {
                (Some(_), _) => "FAIL",
                (None, true) => "ok",
                (None, false) => "",
            };
            output.push_str(&format!(
                "{:>12} {:>4} {}\n",
                humanize_bytes(unit.size as u64),
                status,
                unit.path
            ));
            if let Some(error) = &unit.error {
                output.push_str(&format!("{:>17} {}\n", "", error));
            }
        }

        if info.verified {
            output.push_str(&"-".repeat(40));
            output.push('\n');
            match info.failed_units() {
                0 => output.push_str("All units decoded\n"),
                n => output.push_str(&format!("{} units failed to decode\n", n)),
            }
        }

        output
    }

    fn format_save(&self, save: &SaveSummary) -> String {
        let mut output = String::new();

        if save.committed && save.error.is_none() {
            output.push_str(&format!(
                "Saved {} to {} ({})\n",
                save.source.display(),
                save.target.display(),
                save.profile
            ));
            return output;
        }

        if save.committed {
            output.push_str(&format!("Saved {}, but:\n", save.target.display()));
        } else {
            output.push_str(&format!("Save stopped after step '{}':\n", save.state));
        }
        if let Some(error) = &save.error {
            output.push_str(&format!("  {}\n", error));
        }
        if let Some(staged) = &save.staged {
            output.push_str(&format!(
                "  The new archive is intact at {}; move it to {} by hand.\n",
                staged.display(),
                save.target.display()
            ));
        }

        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_info(&self, info: &InfoSummary) -> String {
        let obj = json!({
            "path": info.path.display().to_string(),
            "kind": info.kind,
            "profile": info.profile,
            "version": info.version,
            "directory_count": info.directories,
            "unit_count": info.units.len(),
            "verified": info.verified,
            "failed_units": info.failed_units(),
            "units": info.units.iter().map(|u| json!({
                "path": u.path,
                "size": u.size,
                "error": u.error,
            })).collect::<Vec<_>>(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_save(&self, save: &SaveSummary) -> String {
        let obj = json!({
            "success": save.committed && save.error.is_none(),
            "committed": save.committed,
            "source": save.source.display().to_string(),
            "target": save.target.display().to_string(),
            "profile": save.profile,
            "state": save.state,
            "error": save.error,
            "staged": save.staged.as_ref().map(|p| p.display().to_string()),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
