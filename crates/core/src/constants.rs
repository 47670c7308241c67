//! Constants used throughout the vaccination core crate.
//!
//! Field limits mirror the request schemas of the clinic API; path and filename constants keep
//! the file-backed stores consistent.

/// Smallest number of doses a scheme may define.
pub const MIN_DOSES_TOTAL: u32 = 1;

/// Largest number of doses a scheme may define.
pub const MAX_DOSES_TOTAL: u32 = 10;

/// Default directory for vaccination data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "vaccination_data";

/// Directory name for vaccine scheme storage.
pub const SCHEMES_DIR_NAME: &str = "schemes";

/// Directory name for administered-dose storage.
pub const DOSES_DIR_NAME: &str = "doses";

/// Filename for a scheme definition inside its sharded directory.
pub const SCHEME_YAML_FILENAME: &str = "scheme.yaml";

/// Extension used for dose record files.
pub const DOSE_RECORD_EXTENSION: &str = "yaml";

/// Filename for the optional patient/staff name directory.
pub const DIRECTORY_YAML_FILENAME: &str = "directory.yaml";

/// Display name used in reports when a patient cannot be resolved.
pub const UNKNOWN_PATIENT_NAME: &str = "Unknown";

/// Display name used in reports when a scheme cannot be resolved.
pub const UNKNOWN_SCHEME_NAME: &str = "N/A";
