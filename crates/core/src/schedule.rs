//! Dose schedule computations.
//!
//! Everything in this module is pure: it works on records and schemes already loaded into memory
//! and takes `today` as an argument. The engine reads the clock and the stores, then delegates
//! here.

use crate::constants::MAX_DOSES_TOTAL;
use crate::dose::DoseRecord;
use crate::report::{OverdueDose, PendingDose};
use crate::scheme::VaccineScheme;
use crate::VaccinationResult;
use chrono::{Months, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use vax_uuid::SchemeId;

/// Outcome of projecting the date of the dose after `dose_number`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    /// The next dose is due on this date.
    Scheduled(NaiveDate),
    /// `dose_number` is the last dose of the scheme (or beyond it).
    FinalDose,
    /// The interval list is shorter than the dose count, so there is no offset to read.
    Desynchronized,
    /// The offset would leave chrono's supported calendar range.
    OutOfCalendar,
}

impl Projection {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Projection::Scheduled(date) => Some(*date),
            _ => None,
        }
    }
}

/// Adds a signed number of calendar months to `date`.
///
/// The day of month is clamped to the last valid day of the target month, so January 31 plus one
/// month is the last day of February. Returns `None` if the result is outside chrono's range.
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let magnitude = Months::new(months.unsigned_abs());
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

/// Projects when the dose following `dose_number` is due, counted from `today`.
///
/// The gap is the difference between the cumulative offsets of the two doses, applied to the
/// registration date rather than to the date of dose 1.
pub fn project_next_dose(scheme: &VaccineScheme, dose_number: u32, today: NaiveDate) -> Projection {
    if dose_number >= scheme.doses_total {
        return Projection::FinalDose;
    }

    let intervals = &scheme.dose_intervals_months;
    let index = dose_number as usize;
    if index == 0 || index >= intervals.len() {
        return Projection::Desynchronized;
    }

    let delta = i64::from(intervals[index]) - i64::from(intervals[index - 1]);
    let Ok(delta) = i32::try_from(delta) else {
        return Projection::OutOfCalendar;
    };

    match add_months(today, delta) {
        Some(date) => Projection::Scheduled(date),
        None => Projection::OutOfCalendar,
    }
}

/// True iff `expected` is set and strictly before `today`.
pub fn is_overdue(expected: Option<NaiveDate>, today: NaiveDate) -> bool {
    expected.is_some_and(|date| date < today)
}

/// Whole days between `expected` and `today`.
pub fn days_overdue(expected: NaiveDate, today: NaiveDate) -> i64 {
    (today - expected).num_days()
}

/// Pending doses of one scheme given that scheme's records for a single patient.
///
/// Every dose number in `1..=doses_total` missing from `doses` is pending, including gaps before
/// the highest recorded dose. The expected date comes from the first record of the preceding
/// dose number, if there is one. Dose numbers past [`MAX_DOSES_TOTAL`] are never reported, even
/// for a scheme file edited to claim more.
pub fn pending_for_scheme(
    scheme: &VaccineScheme,
    doses: &[&DoseRecord],
    today: NaiveDate,
) -> Vec<PendingDose> {
    let applied: BTreeSet<u32> = doses.iter().map(|d| d.dose_number).collect();

    (1..=scheme.doses_total.min(MAX_DOSES_TOTAL))
        .filter(|number| !applied.contains(number))
        .map(|number| {
            let expected_date = doses
                .iter()
                .find(|d| number.checked_sub(1) == Some(d.dose_number))
                .and_then(|d| d.next_dose_date);

            PendingDose {
                scheme_name: scheme.name.clone(),
                scheme_id: scheme.id,
                dose_number: number,
                expected_date,
                is_overdue: is_overdue(expected_date, today),
            }
        })
        .collect()
}

/// Pending doses across every scheme a patient has started.
///
/// `resolve` looks a scheme up by id; groups whose scheme resolves to `None` are skipped.
/// Groups are ordered by scheme name, then id; doses ascend within a group.
pub fn pending_doses<F>(
    records: &[DoseRecord],
    today: NaiveDate,
    mut resolve: F,
) -> VaccinationResult<Vec<PendingDose>>
where
    F: FnMut(&SchemeId) -> VaccinationResult<Option<VaccineScheme>>,
{
    let mut groups: BTreeMap<SchemeId, Vec<&DoseRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.vaccine_scheme_id)
            .or_default()
            .push(record);
    }

    let mut resolved = Vec::with_capacity(groups.len());
    for (scheme_id, doses) in groups {
        match resolve(&scheme_id)? {
            Some(scheme) => resolved.push((scheme, doses)),
            None => tracing::debug!("skipping doses of missing scheme {}", scheme_id),
        }
    }
    resolved.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    Ok(resolved
        .iter()
        .flat_map(|(scheme, doses)| pending_for_scheme(scheme, doses, today))
        .collect())
}

/// Earliest expected date first; ties by patient name, then scheme name.
pub fn sort_overdue(rows: &mut [OverdueDose]) {
    rows.sort_by(|a, b| {
        a.expected_date
            .cmp(&b.expected_date)
            .then_with(|| a.patient_name.cmp(&b.patient_name))
            .then_with(|| a.scheme_name.cmp(&b.scheme_name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dose::DoseRegistration;
    use crate::scheme::NewScheme;
    use chrono::{TimeZone, Utc};
    use vax_types::SchemeName;
    use vax_uuid::{ClinicId, PatientId, UserId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scheme(name: &str, intervals: Vec<i32>) -> VaccineScheme {
        NewScheme {
            name: SchemeName::new(name).unwrap(),
            doses_total: intervals.len() as u32,
            dose_intervals_months: intervals,
            notes: None,
        }
        .into_scheme(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    fn record(
        scheme: &VaccineScheme,
        patient: PatientId,
        dose_number: u32,
        next: Option<NaiveDate>,
    ) -> DoseRecord {
        DoseRegistration {
            clinic_id: ClinicId::new(),
            administered_by: UserId::new(),
            patient_id: patient,
            vaccine_scheme_id: scheme.id,
            dose_number,
            lot_number: None,
            inventory_item_id: None,
            notes: None,
        }
        .into_record(next, Utc::now())
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2025, 1, 31), 1), Some(date(2025, 2, 28)));
        assert_eq!(add_months(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(add_months(date(2025, 8, 31), 6), Some(date(2026, 2, 28)));
    }

    #[test]
    fn add_months_handles_zero_and_negative() {
        assert_eq!(add_months(date(2025, 3, 15), 0), Some(date(2025, 3, 15)));
        assert_eq!(add_months(date(2025, 3, 31), -1), Some(date(2025, 2, 28)));
    }

    #[test]
    fn projection_uses_gap_between_offsets() {
        let hpv = scheme("HPV", vec![0, 2, 6]);
        let today = date(2025, 5, 10);

        assert_eq!(
            project_next_dose(&hpv, 1, today),
            Projection::Scheduled(date(2025, 7, 10))
        );
        assert_eq!(
            project_next_dose(&hpv, 2, today),
            Projection::Scheduled(date(2025, 9, 10))
        );
    }

    #[test]
    fn final_dose_has_no_projection() {
        let hpv = scheme("HPV", vec![0, 2, 6]);
        assert_eq!(
            project_next_dose(&hpv, 3, date(2025, 5, 10)),
            Projection::FinalDose
        );
    }

    #[test]
    fn desynchronized_scheme_has_no_projection() {
        let mut hpv = scheme("HPV", vec![0, 2, 6]);
        hpv.doses_total = 5;
        assert_eq!(
            project_next_dose(&hpv, 3, date(2025, 5, 10)),
            Projection::Desynchronized
        );
        assert_eq!(project_next_dose(&hpv, 3, date(2025, 5, 10)).date(), None);
    }

    #[test]
    fn decreasing_offsets_project_into_the_past() {
        let odd = scheme("Odd", vec![0, 6, 2]);
        assert_eq!(
            project_next_dose(&odd, 2, date(2025, 5, 10)),
            Projection::Scheduled(date(2025, 1, 10))
        );
    }

    #[test]
    fn gaps_are_reported_per_missing_number() {
        let hpv = scheme("HPV", vec![0, 2, 6]);
        let patient = PatientId::new();
        let first = record(&hpv, patient, 1, Some(date(2025, 3, 1)));
        let third = record(&hpv, patient, 3, None);

        let pending = pending_for_scheme(&hpv, &[&first, &third], date(2025, 4, 1));

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].dose_number, 2);
        assert_eq!(pending[0].expected_date, Some(date(2025, 3, 1)));
        assert!(pending[0].is_overdue);
    }

    #[test]
    fn missing_first_dose_has_no_expected_date() {
        let hpv = scheme("HPV", vec![0, 2, 6]);
        let second = record(&hpv, PatientId::new(), 2, Some(date(2025, 3, 1)));

        let pending = pending_for_scheme(&hpv, &[&second], date(2025, 4, 1));
        let numbers: Vec<u32> = pending.iter().map(|p| p.dose_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(pending[0].expected_date, None);
        assert!(!pending[0].is_overdue);
        assert_eq!(pending[1].expected_date, Some(date(2025, 3, 1)));
    }

    #[test]
    fn out_of_range_numbers_from_disk_do_not_overflow() {
        let mut hpv = scheme("HPV", vec![0, 2, 6]);
        let patient = PatientId::new();
        let stray = record(&hpv, patient, u32::MAX, Some(date(2025, 3, 1)));

        let pending = pending_for_scheme(&hpv, &[&stray], date(2025, 4, 1));
        let numbers: Vec<u32> = pending.iter().map(|p| p.dose_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(pending.iter().all(|p| p.expected_date.is_none()));

        hpv.doses_total = u32::MAX;
        let pending = pending_for_scheme(&hpv, &[&stray], date(2025, 4, 1));
        assert_eq!(pending.len(), MAX_DOSES_TOTAL as usize);
    }

    #[test]
    fn overdue_flag_is_strict() {
        let today = date(2025, 6, 1);
        assert!(!is_overdue(Some(today), today));
        assert!(is_overdue(Some(date(2025, 5, 31)), today));
        assert!(!is_overdue(None, today));
    }

    #[test]
    fn pending_groups_sorted_by_scheme_name_and_missing_schemes_skipped() {
        let zoster = scheme("Zoster", vec![0, 2]);
        let hep_b = scheme("Hepatitis B", vec![0, 1, 6]);
        let retired = scheme("Retired", vec![0, 1]);
        let patient = PatientId::new();

        let records = vec![
            record(&zoster, patient, 1, Some(date(2025, 3, 1))),
            record(&retired, patient, 1, Some(date(2025, 3, 1))),
            record(&hep_b, patient, 1, Some(date(2025, 2, 1))),
        ];

        let pending = pending_doses(&records, date(2025, 2, 15), |id| {
            Ok([&zoster, &hep_b]
                .into_iter()
                .find(|s| &s.id == id)
                .cloned())
        })
        .unwrap();

        let names: Vec<(&str, u32)> = pending
            .iter()
            .map(|p| (p.scheme_name.as_str(), p.dose_number))
            .collect();
        assert_eq!(
            names,
            vec![("Hepatitis B", 2), ("Hepatitis B", 3), ("Zoster", 2)]
        );
        assert!(pending[0].is_overdue);
        assert!(!pending[2].is_overdue);
    }

    #[test]
    fn days_overdue_counts_whole_days() {
        assert_eq!(days_overdue(date(2025, 7, 10), date(2025, 7, 11)), 1);
        assert_eq!(days_overdue(date(2024, 12, 31), date(2025, 3, 1)), 60);
    }
}
