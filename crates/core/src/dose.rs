//! Administered-dose records.
//!
//! A record is written once per administration event and never changed afterwards. Its
//! `next_dose_date` is a point-in-time projection taken at registration; editing the scheme
//! later does not move it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use vax_types::LotNumber;
use vax_uuid::{ClinicId, DoseRecordId, InventoryItemId, PatientId, SchemeId, UserId};

/// A stored dose record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseRecord {
    pub id: DoseRecordId,
    pub clinic_id: ClinicId,
    pub patient_id: PatientId,
    pub vaccine_scheme_id: SchemeId,
    pub dose_number: u32,
    pub administered_at: DateTime<Utc>,
    pub administered_by: UserId,
    #[serde(default)]
    pub lot_number: Option<LotNumber>,
    #[serde(default)]
    pub next_dose_date: Option<NaiveDate>,
    #[serde(default)]
    pub inventory_item_id: Option<InventoryItemId>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DoseRecord {
    /// True if this record projects a next dose strictly before `as_of`.
    pub fn is_overdue_anchor(&self, as_of: NaiveDate) -> bool {
        self.next_dose_date.is_some_and(|date| date < as_of)
    }
}

/// Input for registering an administered dose.
#[derive(Clone, Debug)]
pub struct DoseRegistration {
    pub clinic_id: ClinicId,
    pub administered_by: UserId,
    pub patient_id: PatientId,
    pub vaccine_scheme_id: SchemeId,
    pub dose_number: u32,
    pub lot_number: Option<LotNumber>,
    pub inventory_item_id: Option<InventoryItemId>,
    pub notes: Option<String>,
}

impl DoseRegistration {
    pub(crate) fn into_record(
        self,
        next_dose_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> DoseRecord {
        DoseRecord {
            id: DoseRecordId::new(),
            clinic_id: self.clinic_id,
            patient_id: self.patient_id,
            vaccine_scheme_id: self.vaccine_scheme_id,
            dose_number: self.dose_number,
            administered_at: now,
            administered_by: self.administered_by,
            lot_number: self.lot_number,
            next_dose_date,
            inventory_item_id: self.inventory_item_id,
            notes: self.notes,
            created_at: now,
        }
    }
}
