//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. The core never reads environment variables itself; binaries do that and
//! hand the raw values to the parsing helpers here.

use crate::constants::{DIRECTORY_YAML_FILENAME, DOSES_DIR_NAME, SCHEMES_DIR_NAME};
use crate::{VaccinationError, VaccinationResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Whether the dose store rejects a second record for the same
/// `(patient, scheme, dose number)`.
///
/// The clinic system historically allowed duplicates (for example a re-recorded correction), so
/// [`DoseUniqueness::Permissive`] is the default. With [`DoseUniqueness::Enforced`] the store
/// fails the write with [`VaccinationError::Conflict`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DoseUniqueness {
    #[default]
    Permissive,
    Enforced,
}

impl FromStr for DoseUniqueness {
    type Err = VaccinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(DoseUniqueness::Permissive),
            "enforced" => Ok(DoseUniqueness::Enforced),
            other => Err(VaccinationError::Validation(format!(
                "unknown dose uniqueness policy '{}' (expected 'permissive' or 'enforced')",
                other
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    dose_uniqueness: DoseUniqueness,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`VaccinationError::Validation`] if `data_dir` is empty.
    pub fn new(data_dir: PathBuf, dose_uniqueness: DoseUniqueness) -> VaccinationResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(VaccinationError::Validation(
                "data_dir cannot be empty".into(),
            ));
        }

        Ok(Self {
            data_dir,
            dose_uniqueness,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn schemes_dir(&self) -> PathBuf {
        self.data_dir.join(SCHEMES_DIR_NAME)
    }

    pub fn doses_dir(&self) -> PathBuf {
        self.data_dir.join(DOSES_DIR_NAME)
    }

    pub fn directory_file(&self) -> PathBuf {
        self.data_dir.join(DIRECTORY_YAML_FILENAME)
    }

    pub fn dose_uniqueness(&self) -> DoseUniqueness {
        self.dose_uniqueness
    }
}

/// Parse the dose uniqueness policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DoseUniqueness::Permissive`].
pub fn dose_uniqueness_from_env_value(value: Option<String>) -> VaccinationResult<DoseUniqueness> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<DoseUniqueness>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_policy_defaults_to_permissive() {
        assert_eq!(
            dose_uniqueness_from_env_value(None).unwrap(),
            DoseUniqueness::Permissive
        );
        assert_eq!(
            dose_uniqueness_from_env_value(Some("  ".into())).unwrap(),
            DoseUniqueness::Permissive
        );
    }

    #[test]
    fn policy_parsing_is_case_insensitive() {
        assert_eq!(
            dose_uniqueness_from_env_value(Some("Enforced".into())).unwrap(),
            DoseUniqueness::Enforced
        );
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = dose_uniqueness_from_env_value(Some("strict".into())).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn empty_data_dir_is_rejected() {
        assert!(CoreConfig::new(PathBuf::new(), DoseUniqueness::Permissive).is_err());
    }

    #[test]
    fn derived_paths_live_under_data_dir() {
        let cfg = CoreConfig::new(PathBuf::from("/srv/vax"), DoseUniqueness::Enforced).unwrap();
        assert_eq!(cfg.schemes_dir(), PathBuf::from("/srv/vax/schemes"));
        assert_eq!(cfg.doses_dir(), PathBuf::from("/srv/vax/doses"));
        assert_eq!(cfg.directory_file(), PathBuf::from("/srv/vax/directory.yaml"));
        assert_eq!(cfg.dose_uniqueness(), DoseUniqueness::Enforced);
    }
}
