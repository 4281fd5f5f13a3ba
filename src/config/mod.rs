//! Automation configuration
//!
//! Mirrors the JSON document consumed by the tool:
//!
//! ```json
//! {
//!   "backup_rules": { "folders": ["docs"], "exclude_patterns": ["*.tmp"], "retention_days": 30 },
//!   "file_organization": { "rules": [
//!     { "pattern": "*.log", "destination": "archive_logs", "older_than_days": 30, "create_year_folders": true }
//!   ] },
//!   "cleanup": { "remove_duplicates": true, "max_file_age_days": 365, "delete_empty_folders": true },
//!   "on_conflict": "auto_rename"
//! }
//! ```
//!
//! Unknown keys are ignored. Rule-level validation happens when a rule is
//! used, so one malformed rule never rejects the whole file.

use crate::error::{AutomationError, Result};
use crate::execution::ConflictPolicy;
use crate::pattern::GlobPattern;
use crate::security::PathValidator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retention used when `backup_rules.retention_days` is absent
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Root configuration object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub backup_rules: Option<BackupRule>,
    pub file_organization: Option<FileOrganization>,
    pub cleanup: Option<CleanupPolicy>,
    /// What to do when a move target already exists
    pub on_conflict: ConflictPolicy,
}

/// Folders to archive and how long to keep their archives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRule {
    #[serde(default, rename = "folders")]
    pub folder_names: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// 0 disables pruning
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for BackupRule {
    fn default() -> Self {
        Self {
            folder_names: Vec::new(),
            exclude_patterns: Vec::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

impl BackupRule {
    /// Validate a configured folder name and resolve it to a root-relative path
    pub fn validate_folder(folder: &str) -> std::result::Result<PathBuf, String> {
        let relative = PathValidator::validate_relative(folder)?;
        if PathValidator::is_reserved(&relative) {
            return Err(format!(
                "folder '{}' lies inside a reserved area (backups/ or quarantine/)",
                folder
            ));
        }
        Ok(relative)
    }
}

/// Wrapper matching the `file_organization` object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrganization {
    pub rules: Vec<OrganizationRule>,
}

/// A relocation rule as written in the configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationRule {
    pub pattern: Option<String>,
    pub destination: Option<String>,
    pub older_than_days: Option<f64>,
    #[serde(rename = "create_year_folders", alias = "bucket_by_year")]
    pub bucket_by_year: bool,
}

/// An organization rule that passed validation
#[derive(Debug, Clone)]
pub struct ValidRule {
    pub pattern: GlobPattern,
    /// Destination relative to the workspace root
    pub destination: PathBuf,
    pub older_than_days: Option<f64>,
    pub bucket_by_year: bool,
}

impl OrganizationRule {
    /// Check the rule shape; the error is a human-readable reason
    pub fn validate(&self) -> std::result::Result<ValidRule, String> {
        let pattern = self
            .pattern
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| "missing pattern".to_string())?;
        let destination = self
            .destination
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| "missing destination".to_string())?;

        let pattern = GlobPattern::new(pattern).map_err(|e| e.to_string())?;

        let destination = PathValidator::validate_relative(destination)?;
        if PathValidator::is_reserved(&destination) {
            return Err(format!(
                "destination '{}' lies inside a reserved area (backups/ or quarantine/)",
                destination.display()
            ));
        }

        if let Some(days) = self.older_than_days {
            if !days.is_finite() || days < 0.0 {
                return Err(format!("older_than_days must be a non-negative number, got {}", days));
            }
        }

        Ok(ValidRule {
            pattern,
            destination,
            older_than_days: self.older_than_days,
            bucket_by_year: self.bucket_by_year,
        })
    }

    /// Compact description used in events
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Which cleanup passes run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupPolicy {
    pub remove_duplicates: bool,
    /// Expiry only runs when this is set and greater than zero
    pub max_file_age_days: Option<f64>,
    pub delete_empty_folders: bool,
}

impl CleanupPolicy {
    /// The expiry age, if the expiry pass is enabled
    pub fn expiry_days(&self) -> Option<f64> {
        self.max_file_age_days
            .filter(|days| days.is_finite() && *days > 0.0)
    }

    pub fn any_enabled(&self) -> bool {
        self.remove_duplicates || self.expiry_days().is_some() || self.delete_empty_folders
    }
}

impl AutomationConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(json: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| AutomationError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Organization rules, empty when the section is absent
    pub fn organization_rules(&self) -> &[OrganizationRule] {
        self.file_organization
            .as_ref()
            .map(|f| f.rules.as_slice())
            .unwrap_or(&[])
    }
}

/// Load the configuration file; a missing file is fatal
pub fn load_config(path: &Path) -> Result<AutomationConfig> {
    if !path.is_file() {
        return Err(AutomationError::ConfigMissing(path.to_path_buf()));
    }

    let json = fs::read_to_string(path).map_err(|e| AutomationError::io(path, e))?;
    AutomationConfig::from_json(&json, path)
}
