//! Vaccine scheme definitions.
//!
//! A scheme is shared reference data: it names a vaccine regimen, says how many doses it has and
//! at which cumulative month offset (counted from dose 1) each dose falls due. Schemes are never
//! hard-deleted; retiring one means setting `is_active` to false.

use crate::constants::{MAX_DOSES_TOTAL, MIN_DOSES_TOTAL};
use crate::{VaccinationError, VaccinationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vax_types::SchemeName;
use vax_uuid::SchemeId;

/// A stored vaccine scheme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineScheme {
    pub id: SchemeId,
    pub name: SchemeName,
    pub doses_total: u32,
    /// Entry `i` is the offset, in months from dose 1, at which dose `i + 1` is due.
    ///
    /// Length equals `doses_total` at creation time. Later partial updates are not re-checked,
    /// so readers must tolerate a desynchronized length.
    pub dose_intervals_months: Vec<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for defining a new scheme.
#[derive(Clone, Debug)]
pub struct NewScheme {
    pub name: SchemeName,
    pub doses_total: u32,
    pub dose_intervals_months: Vec<i32>,
    pub notes: Option<String>,
}

impl NewScheme {
    /// Checks the structural invariants of a new scheme.
    ///
    /// Only the dose count range and the interval length are checked. Interval values are taken
    /// as given: negative or decreasing offsets are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`VaccinationError::Validation`] if `doses_total` is out of range or if the
    /// number of intervals differs from `doses_total`.
    pub fn validate(&self) -> VaccinationResult<()> {
        validate_doses_total(self.doses_total)?;

        if self.dose_intervals_months.len() != self.doses_total as usize {
            return Err(VaccinationError::Validation(format!(
                "dose_intervals_months must have {} elements, got {}",
                self.doses_total,
                self.dose_intervals_months.len()
            )));
        }

        Ok(())
    }

    /// Builds the stored form with a fresh identifier.
    pub(crate) fn into_scheme(self, created_at: DateTime<Utc>) -> VaccineScheme {
        VaccineScheme {
            id: SchemeId::new(),
            name: self.name,
            doses_total: self.doses_total,
            dose_intervals_months: self.dose_intervals_months,
            notes: self.notes,
            is_active: true,
            created_at,
        }
    }
}

/// Sparse update of a scheme. `None` leaves a field untouched.
///
/// `notes` is doubly optional so a caller can clear existing notes with `Some(None)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemePatch {
    pub name: Option<SchemeName>,
    pub doses_total: Option<u32>,
    pub dose_intervals_months: Option<Vec<i32>>,
    pub notes: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl SchemePatch {
    pub fn is_empty(&self) -> bool {
        *self == SchemePatch::default()
    }

    /// Checks the per-field constraints of the fields that are present.
    ///
    /// Deliberately does not compare `doses_total` with the interval length; a patch may leave
    /// the two out of step.
    pub fn validate(&self) -> VaccinationResult<()> {
        if let Some(doses_total) = self.doses_total {
            validate_doses_total(doses_total)?;
        }
        Ok(())
    }

    /// Applies the present fields to `scheme`.
    pub fn apply_to(&self, scheme: &mut VaccineScheme) {
        if let Some(name) = &self.name {
            scheme.name = name.clone();
        }
        if let Some(doses_total) = self.doses_total {
            scheme.doses_total = doses_total;
        }
        if let Some(intervals) = &self.dose_intervals_months {
            scheme.dose_intervals_months = intervals.clone();
        }
        if let Some(notes) = &self.notes {
            scheme.notes = notes.clone();
        }
        if let Some(is_active) = self.is_active {
            scheme.is_active = is_active;
        }
    }
}

fn validate_doses_total(doses_total: u32) -> VaccinationResult<()> {
    if !(MIN_DOSES_TOTAL..=MAX_DOSES_TOTAL).contains(&doses_total) {
        return Err(VaccinationError::Validation(format!(
            "doses_total must be between {} and {}, got {}",
            MIN_DOSES_TOTAL, MAX_DOSES_TOTAL, doses_total
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hpv(doses_total: u32, intervals: Vec<i32>) -> NewScheme {
        NewScheme {
            name: SchemeName::new("HPV").unwrap(),
            doses_total,
            dose_intervals_months: intervals,
            notes: None,
        }
    }

    #[test]
    fn interval_length_must_match_doses_total() {
        let err = hpv(3, vec![0, 2]).validate().unwrap_err();
        match err {
            VaccinationError::Validation(msg) => assert!(msg.contains("must have 3 elements")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn unusual_intervals_are_accepted() {
        assert!(hpv(3, vec![0, 6, 2]).validate().is_ok());
        assert!(hpv(2, vec![0, -1]).validate().is_ok());
    }

    #[test]
    fn doses_total_range_is_enforced() {
        assert!(hpv(0, vec![]).validate().is_err());
        assert!(hpv(11, vec![0; 11]).validate().is_err());
        assert!(hpv(10, vec![0; 10]).validate().is_ok());
    }

    #[test]
    fn patch_touches_only_present_fields() {
        let mut scheme = hpv(3, vec![0, 2, 6]).into_scheme(Utc::now());
        scheme.notes = Some("two doses under 15".into());
        let original = scheme.clone();

        let patch = SchemePatch {
            is_active: Some(false),
            ..SchemePatch::default()
        };
        patch.apply_to(&mut scheme);

        assert!(!scheme.is_active);
        assert_eq!(scheme.name, original.name);
        assert_eq!(scheme.dose_intervals_months, original.dose_intervals_months);
        assert_eq!(scheme.notes, original.notes);
    }

    #[test]
    fn patch_can_clear_notes() {
        let mut scheme = hpv(1, vec![0]).into_scheme(Utc::now());
        scheme.notes = Some("legacy".into());

        SchemePatch {
            notes: Some(None),
            ..SchemePatch::default()
        }
        .apply_to(&mut scheme);

        assert_eq!(scheme.notes, None);
    }

    #[test]
    fn patch_may_desynchronize_intervals() {
        let patch = SchemePatch {
            doses_total: Some(4),
            ..SchemePatch::default()
        };
        assert!(patch.validate().is_ok());

        let mut scheme = hpv(3, vec![0, 2, 6]).into_scheme(Utc::now());
        patch.apply_to(&mut scheme);
        assert_eq!(scheme.doses_total, 4);
        assert_eq!(scheme.dose_intervals_months.len(), 3);
    }

    #[test]
    fn patch_rejects_out_of_range_doses_total() {
        let patch = SchemePatch {
            doses_total: Some(0),
            ..SchemePatch::default()
        };
        assert!(patch.validate().is_err());
    }
}
