//! Persistence seams of the engine.
//!
//! The engine reads and writes through these traits only. Two implementations ship with the
//! crate: in-memory stores (tests, embedding) and YAML file stores laid out in sharded UUID
//! directories.

pub mod memory;
pub mod yaml;

use crate::dose::DoseRecord;
use crate::scheme::{SchemePatch, VaccineScheme};
use crate::VaccinationResult;
use chrono::NaiveDate;
use vax_uuid::{ClinicId, PatientId, SchemeId, UserId};

/// Vaccine scheme definitions.
pub trait SchemeStore: Send + Sync {
    /// Persists a new scheme.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VaccinationError::Conflict`] if another scheme already has the same name.
    fn create(&self, scheme: VaccineScheme) -> VaccinationResult<VaccineScheme>;

    fn get(&self, id: &SchemeId) -> VaccinationResult<Option<VaccineScheme>>;

    /// All schemes sorted by name; inactive ones are left out when `active_only` is set.
    fn list(&self, active_only: bool) -> VaccinationResult<Vec<VaccineScheme>>;

    /// Applies `patch` to the stored scheme and returns the result.
    ///
    /// # Errors
    ///
    /// - [`crate::VaccinationError::NotFound`] if `id` is unknown.
    /// - [`crate::VaccinationError::Conflict`] if the patch renames onto an existing name.
    fn update(&self, id: &SchemeId, patch: &SchemePatch) -> VaccinationResult<VaccineScheme>;
}

/// Administered-dose records.
pub trait DoseRecordStore: Send + Sync {
    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VaccinationError::Conflict`] when the store enforces dose uniqueness and
    /// a record for the same patient, scheme and dose number already exists.
    fn create(&self, record: DoseRecord) -> VaccinationResult<DoseRecord>;

    /// Every record of `patient_id` in `clinic_id`, oldest administration first.
    fn list_by_patient(
        &self,
        clinic_id: &ClinicId,
        patient_id: &PatientId,
    ) -> VaccinationResult<Vec<DoseRecord>>;

    /// Records of `clinic_id` whose `next_dose_date` is set and strictly before `as_of`.
    fn list_overdue_candidates(
        &self,
        clinic_id: &ClinicId,
        as_of: NaiveDate,
    ) -> VaccinationResult<Vec<DoseRecord>>;

    /// True if any record of `patient_id` for `scheme_id` has exactly `dose_number`.
    fn exists_next_dose(
        &self,
        patient_id: &PatientId,
        scheme_id: &SchemeId,
        dose_number: u32,
    ) -> VaccinationResult<bool>;
}

/// Display names of patients and staff, used only to enrich reports.
pub trait NameDirectory: Send + Sync {
    fn patient_name(&self, patient_id: &PatientId) -> VaccinationResult<Option<String>>;

    fn staff_name(&self, user_id: &UserId) -> VaccinationResult<Option<String>>;
}

pub(crate) fn duplicate_name_conflict(name: &vax_types::SchemeName) -> crate::VaccinationError {
    crate::VaccinationError::Conflict(format!("a vaccine scheme named '{}' already exists", name))
}

pub(crate) fn duplicate_dose_conflict(record: &DoseRecord) -> crate::VaccinationError {
    crate::VaccinationError::Conflict(format!(
        "dose {} of scheme {} is already recorded for patient {}",
        record.dose_number, record.vaccine_scheme_id, record.patient_id
    ))
}

pub(crate) fn same_dose(a: &DoseRecord, b: &DoseRecord) -> bool {
    a.patient_id == b.patient_id
        && a.vaccine_scheme_id == b.vaccine_scheme_id
        && a.dose_number == b.dose_number
}
