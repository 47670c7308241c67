//! Report rows produced by the engine.

use crate::dose::DoseRecord;
use chrono::NaiveDate;
use serde::Serialize;
use vax_types::SchemeName;
use vax_uuid::{PatientId, SchemeId};

/// A dose of a started scheme that has not been recorded for the patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingDose {
    pub scheme_name: SchemeName,
    pub scheme_id: SchemeId,
    pub dose_number: u32,
    /// Taken from the predecessor dose's `next_dose_date`; unset when there is no predecessor.
    pub expected_date: Option<NaiveDate>,
    pub is_overdue: bool,
}

/// One row of the clinic-wide overdue report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OverdueDose {
    pub patient_id: PatientId,
    pub patient_name: String,
    pub scheme_id: SchemeId,
    pub scheme_name: String,
    pub pending_dose_number: u32,
    pub expected_date: NaiveDate,
    pub days_overdue: i64,
}

/// A dose record enriched with display names for a patient's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: DoseRecord,
    pub scheme_name: Option<SchemeName>,
    pub administrator_name: Option<String>,
}

/// Full vaccination history of a patient in one clinic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VaccinationHistory {
    pub patient_id: PatientId,
    /// Most recent administration first.
    pub vaccinations: Vec<HistoryEntry>,
    pub pending_doses: Vec<PendingDose>,
}
