//! In-memory stores.
//!
//! Each store guards its data with a single `RwLock`, so a write (including the uniqueness
//! checks it performs) is atomic with respect to every other call on the same store.

use super::{
    duplicate_dose_conflict, duplicate_name_conflict, same_dose, DoseRecordStore, NameDirectory,
    SchemeStore,
};
use crate::config::DoseUniqueness;
use crate::dose::DoseRecord;
use crate::scheme::{SchemePatch, VaccineScheme};
use crate::{VaccinationError, VaccinationResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::RwLock;
use vax_uuid::{ClinicId, PatientId, SchemeId, UserId};

#[derive(Debug, Default)]
pub struct InMemorySchemeStore {
    schemes: RwLock<HashMap<SchemeId, VaccineScheme>>,
}

impl InMemorySchemeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchemeStore for InMemorySchemeStore {
    fn create(&self, scheme: VaccineScheme) -> VaccinationResult<VaccineScheme> {
        let mut schemes = self.schemes.write()?;

        if schemes.values().any(|s| s.name == scheme.name) {
            return Err(duplicate_name_conflict(&scheme.name));
        }
        if schemes.contains_key(&scheme.id) {
            return Err(VaccinationError::Conflict(format!(
                "vaccine scheme {} already exists",
                scheme.id
            )));
        }

        schemes.insert(scheme.id, scheme.clone());
        Ok(scheme)
    }

    fn get(&self, id: &SchemeId) -> VaccinationResult<Option<VaccineScheme>> {
        Ok(self.schemes.read()?.get(id).cloned())
    }

    fn list(&self, active_only: bool) -> VaccinationResult<Vec<VaccineScheme>> {
        let mut listed: Vec<VaccineScheme> = self
            .schemes
            .read()?
            .values()
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    fn update(&self, id: &SchemeId, patch: &SchemePatch) -> VaccinationResult<VaccineScheme> {
        let mut schemes = self.schemes.write()?;

        if let Some(name) = &patch.name {
            if schemes.values().any(|s| &s.name == name && &s.id != id) {
                return Err(duplicate_name_conflict(name));
            }
        }

        let scheme = schemes
            .get_mut(id)
            .ok_or_else(|| VaccinationError::NotFound(format!("vaccine scheme {}", id)))?;
        patch.apply_to(scheme);
        Ok(scheme.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDoseRecordStore {
    uniqueness: DoseUniqueness,
    records: RwLock<Vec<DoseRecord>>,
}

impl InMemoryDoseRecordStore {
    pub fn new(uniqueness: DoseUniqueness) -> Self {
        Self {
            uniqueness,
            records: RwLock::new(Vec::new()),
        }
    }
}

impl DoseRecordStore for InMemoryDoseRecordStore {
    fn create(&self, record: DoseRecord) -> VaccinationResult<DoseRecord> {
        let mut records = self.records.write()?;

        if self.uniqueness == DoseUniqueness::Enforced
            && records.iter().any(|r| same_dose(r, &record))
        {
            return Err(duplicate_dose_conflict(&record));
        }

        records.push(record.clone());
        Ok(record)
    }

    fn list_by_patient(
        &self,
        clinic_id: &ClinicId,
        patient_id: &PatientId,
    ) -> VaccinationResult<Vec<DoseRecord>> {
        let mut listed: Vec<DoseRecord> = self
            .records
            .read()?
            .iter()
            .filter(|r| &r.clinic_id == clinic_id && &r.patient_id == patient_id)
            .cloned()
            .collect();
        listed.sort_by_key(|r| r.administered_at);
        Ok(listed)
    }

    fn list_overdue_candidates(
        &self,
        clinic_id: &ClinicId,
        as_of: NaiveDate,
    ) -> VaccinationResult<Vec<DoseRecord>> {
        let mut listed: Vec<DoseRecord> = self
            .records
            .read()?
            .iter()
            .filter(|r| &r.clinic_id == clinic_id && r.is_overdue_anchor(as_of))
            .cloned()
            .collect();
        listed.sort_by_key(|r| r.next_dose_date);
        Ok(listed)
    }

    fn exists_next_dose(
        &self,
        patient_id: &PatientId,
        scheme_id: &SchemeId,
        dose_number: u32,
    ) -> VaccinationResult<bool> {
        Ok(self.records.read()?.iter().any(|r| {
            &r.patient_id == patient_id
                && &r.vaccine_scheme_id == scheme_id
                && r.dose_number == dose_number
        }))
    }
}

/// Name directory backed by two maps, filled by the embedding application.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    patients: RwLock<HashMap<PatientId, String>>,
    staff: RwLock<HashMap<UserId, String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_patient(&self, id: PatientId, name: impl Into<String>) -> VaccinationResult<()> {
        self.patients.write()?.insert(id, name.into());
        Ok(())
    }

    pub fn insert_staff(&self, id: UserId, name: impl Into<String>) -> VaccinationResult<()> {
        self.staff.write()?.insert(id, name.into());
        Ok(())
    }
}

impl NameDirectory for InMemoryDirectory {
    fn patient_name(&self, patient_id: &PatientId) -> VaccinationResult<Option<String>> {
        Ok(self.patients.read()?.get(patient_id).cloned())
    }

    fn staff_name(&self, user_id: &UserId) -> VaccinationResult<Option<String>> {
        Ok(self.staff.read()?.get(user_id).cloned())
    }
}
