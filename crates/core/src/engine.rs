//! Dose schedule engine.
//!
//! [`DoseScheduleEngine`] ties the pure computations in [`crate::schedule`] to the stores, the
//! name directory and the clock. It keeps no state of its own between calls; every operation reads
//! the clock once and works against a point-in-time view of the stores.
//!
//! ## Operations
//!
//! - Scheme lifecycle: [`define_scheme`](DoseScheduleEngine::define_scheme),
//!   [`revise_scheme`](DoseScheduleEngine::revise_scheme),
//!   [`list_schemes`](DoseScheduleEngine::list_schemes),
//!   [`get_scheme`](DoseScheduleEngine::get_scheme)
//! - Dose registration with next-dose projection:
//!   [`register_dose`](DoseScheduleEngine::register_dose)
//! - Reads: [`compute_pending_doses`](DoseScheduleEngine::compute_pending_doses),
//!   [`patient_history`](DoseScheduleEngine::patient_history),
//!   [`list_overdue_doses`](DoseScheduleEngine::list_overdue_doses)

use crate::clock::{Clock, SystemClock};
use crate::constants::{UNKNOWN_PATIENT_NAME, UNKNOWN_SCHEME_NAME};
use crate::dose::{DoseRecord, DoseRegistration};
use crate::report::{HistoryEntry, OverdueDose, PendingDose, VaccinationHistory};
use crate::repositories::{DoseRecordStore, NameDirectory, SchemeStore};
use crate::schedule::{self, Projection};
use crate::scheme::{NewScheme, SchemePatch, VaccineScheme};
use crate::{VaccinationError, VaccinationResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use vax_uuid::{ClinicId, PatientId, SchemeId};

#[derive(Clone)]
pub struct DoseScheduleEngine {
    schemes: Arc<dyn SchemeStore>,
    doses: Arc<dyn DoseRecordStore>,
    directory: Arc<dyn NameDirectory>,
    clock: Arc<dyn Clock>,
}

impl DoseScheduleEngine {
    /// Creates an engine on the host's wall clock.
    pub fn new(
        schemes: Arc<dyn SchemeStore>,
        doses: Arc<dyn DoseRecordStore>,
        directory: Arc<dyn NameDirectory>,
    ) -> Self {
        Self::with_clock(schemes, doses, directory, Arc::new(SystemClock))
    }

    pub fn with_clock(
        schemes: Arc<dyn SchemeStore>,
        doses: Arc<dyn DoseRecordStore>,
        directory: Arc<dyn NameDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schemes,
            doses,
            directory,
            clock,
        }
    }

    /// Defines a new vaccine scheme.
    ///
    /// # Errors
    ///
    /// - [`VaccinationError::Validation`] if the interval count differs from `doses_total` or
    ///   `doses_total` is outside 1..=10. Nothing is persisted.
    /// - [`VaccinationError::Conflict`] if the name is already taken.
    pub fn define_scheme(&self, new_scheme: NewScheme) -> VaccinationResult<VaccineScheme> {
        new_scheme.validate()?;

        let scheme = self
            .schemes
            .create(new_scheme.into_scheme(self.clock.now()))?;
        tracing::info!(
            "defined vaccine scheme {} '{}' ({} doses)",
            scheme.id,
            scheme.name,
            scheme.doses_total
        );
        Ok(scheme)
    }

    /// Applies a sparse update to a scheme.
    ///
    /// Per-field limits are checked, but the interval count is not compared with `doses_total`
    /// again. Dose records already stored keep their `next_dose_date`.
    pub fn revise_scheme(
        &self,
        id: &SchemeId,
        patch: &SchemePatch,
    ) -> VaccinationResult<VaccineScheme> {
        patch.validate()?;

        let scheme = self.schemes.update(id, patch)?;
        if scheme.dose_intervals_months.len() != scheme.doses_total as usize {
            tracing::warn!(
                "vaccine scheme {} now has {} doses but {} intervals",
                scheme.id,
                scheme.doses_total,
                scheme.dose_intervals_months.len()
            );
        }
        tracing::info!("revised vaccine scheme {}", scheme.id);
        Ok(scheme)
    }

    pub fn list_schemes(&self, active_only: bool) -> VaccinationResult<Vec<VaccineScheme>> {
        self.schemes.list(active_only)
    }

    pub fn get_scheme(&self, id: &SchemeId) -> VaccinationResult<VaccineScheme> {
        self.schemes
            .get(id)?
            .ok_or_else(|| VaccinationError::NotFound(format!("vaccine scheme {}", id)))
    }

    /// Records an administered dose and projects when the following dose is due.
    ///
    /// The projection counts from today, using the gap between this dose's offset and the next
    /// one. The final dose, and any dose of a scheme whose interval list is too short, are stored
    /// without a `next_dose_date`.
    ///
    /// # Errors
    ///
    /// - [`VaccinationError::NotFound`] if the scheme does not exist.
    /// - [`VaccinationError::Validation`] if `dose_number` is 0 or exceeds the scheme's doses.
    /// - [`VaccinationError::Conflict`] if the dose store enforces uniqueness and the dose is
    ///   already recorded.
    pub fn register_dose(&self, registration: DoseRegistration) -> VaccinationResult<DoseRecord> {
        let today = self.clock.today();
        let now = self.clock.now();

        let scheme = self.get_scheme(&registration.vaccine_scheme_id)?;

        if registration.dose_number == 0 {
            return Err(VaccinationError::Validation(
                "dose_number must be at least 1".into(),
            ));
        }
        if registration.dose_number > scheme.doses_total {
            return Err(VaccinationError::Validation(format!(
                "scheme '{}' only has {} doses",
                scheme.name, scheme.doses_total
            )));
        }

        let projection = schedule::project_next_dose(&scheme, registration.dose_number, today);
        match projection {
            Projection::Scheduled(date) => tracing::debug!(
                "dose {} of {} projects next dose on {}",
                registration.dose_number,
                scheme.id,
                date
            ),
            Projection::FinalDose => {}
            Projection::Desynchronized => tracing::warn!(
                "vaccine scheme {} has {} doses but only {} intervals; no next dose projected",
                scheme.id,
                scheme.doses_total,
                scheme.dose_intervals_months.len()
            ),
            Projection::OutOfCalendar => tracing::warn!(
                "next dose of scheme {} falls outside the supported calendar; not projected",
                scheme.id
            ),
        }

        let record = self
            .doses
            .create(registration.into_record(projection.date(), now))?;
        tracing::info!(
            "registered dose {} of '{}' for patient {} in clinic {}",
            record.dose_number,
            scheme.name,
            record.patient_id,
            record.clinic_id
        );
        Ok(record)
    }

    /// Doses missing from the schemes a patient has started in a clinic.
    ///
    /// Ordered by scheme name, then dose number. Schemes that no longer exist are skipped.
    pub fn compute_pending_doses(
        &self,
        clinic_id: &ClinicId,
        patient_id: &PatientId,
    ) -> VaccinationResult<Vec<PendingDose>> {
        let today = self.clock.today();
        let records = self.doses.list_by_patient(clinic_id, patient_id)?;
        self.pending_as_of(&records, today, &mut HashMap::new())
    }

    /// Every dose recorded for a patient in a clinic, newest first, with pending doses.
    pub fn patient_history(
        &self,
        clinic_id: &ClinicId,
        patient_id: &PatientId,
    ) -> VaccinationResult<VaccinationHistory> {
        let today = self.clock.today();
        let records = self.doses.list_by_patient(clinic_id, patient_id)?;

        let mut schemes = HashMap::new();
        let pending_doses = self.pending_as_of(&records, today, &mut schemes)?;

        let mut vaccinations = Vec::with_capacity(records.len());
        for record in records {
            let scheme_name = schemes
                .get(&record.vaccine_scheme_id)
                .and_then(|s| s.as_ref())
                .map(|s| s.name.clone());
            let administrator_name = self.directory.staff_name(&record.administered_by)?;
            vaccinations.push(HistoryEntry {
                record,
                scheme_name,
                administrator_name,
            });
        }
        vaccinations.sort_by(|a, b| b.record.administered_at.cmp(&a.record.administered_at));

        Ok(VaccinationHistory {
            patient_id: *patient_id,
            vaccinations,
            pending_doses,
        })
    }

    /// Patients of a clinic whose next dose is past due and not yet recorded.
    ///
    /// Only patients with at least one recorded dose can appear. An anchor record is dropped when
    /// the dose after it already exists for the same patient and scheme.
    pub fn list_overdue_doses(&self, clinic_id: &ClinicId) -> VaccinationResult<Vec<OverdueDose>> {
        let today = self.clock.today();
        let candidates = self.doses.list_overdue_candidates(clinic_id, today)?;

        let mut scheme_names: HashMap<SchemeId, String> = HashMap::new();
        let mut patient_names: HashMap<PatientId, String> = HashMap::new();
        let mut overdue = Vec::new();

        for anchor in candidates {
            let Some(expected_date) = anchor.next_dose_date.filter(|d| *d < today) else {
                continue;
            };

            let Some(next_number) = anchor.dose_number.checked_add(1) else {
                tracing::warn!(
                    "dose record {} has out-of-range dose number {}; skipped",
                    anchor.id,
                    anchor.dose_number
                );
                continue;
            };
            if self
                .doses
                .exists_next_dose(&anchor.patient_id, &anchor.vaccine_scheme_id, next_number)?
            {
                continue;
            }

            let scheme_name = match scheme_names.get(&anchor.vaccine_scheme_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .schemes
                        .get(&anchor.vaccine_scheme_id)?
                        .map(|s| s.name.to_string())
                        .unwrap_or_else(|| UNKNOWN_SCHEME_NAME.to_string());
                    scheme_names.insert(anchor.vaccine_scheme_id, name.clone());
                    name
                }
            };

            let patient_name = match patient_names.get(&anchor.patient_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .directory
                        .patient_name(&anchor.patient_id)?
                        .unwrap_or_else(|| UNKNOWN_PATIENT_NAME.to_string());
                    patient_names.insert(anchor.patient_id, name.clone());
                    name
                }
            };

            overdue.push(OverdueDose {
                patient_id: anchor.patient_id,
                patient_name,
                scheme_id: anchor.vaccine_scheme_id,
                scheme_name,
                pending_dose_number: next_number,
                expected_date,
                days_overdue: schedule::days_overdue(expected_date, today),
            });
        }

        schedule::sort_overdue(&mut overdue);
        Ok(overdue)
    }

    fn pending_as_of(
        &self,
        records: &[DoseRecord],
        today: NaiveDate,
        cache: &mut HashMap<SchemeId, Option<VaccineScheme>>,
    ) -> VaccinationResult<Vec<PendingDose>> {
        schedule::pending_doses(records, today, |id| {
            if let Some(cached) = cache.get(id) {
                return Ok(cached.clone());
            }
            let scheme = self.schemes.get(id)?;
            cache.insert(*id, scheme.clone());
            Ok(scheme)
        })
    }
}
