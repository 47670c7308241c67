use vax_types::TextError;
use vax_uuid::UuidError;

#[derive(Debug, thiserror::Error)]
pub enum VaccinationError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid identifier: {0}")]
    Uuid(#[from] UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("store lock poisoned by a panicked writer")]
    StorePoisoned,
}

impl VaccinationError {
    /// True for caller-input errors (`Validation`, `Uuid`, `Text`).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            VaccinationError::Validation(_) | VaccinationError::Uuid(_) | VaccinationError::Text(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for VaccinationError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        VaccinationError::StorePoisoned
    }
}

pub type VaccinationResult<T> = std::result::Result<T, VaccinationError>;
