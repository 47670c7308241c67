//! YAML file stores.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   schemes/
//!     <s1>/<s2>/<scheme-id>/scheme.yaml
//!   doses/
//!     <clinic-id>/
//!       <s1>/<s2>/<patient-id>/<record-id>.yaml
//!   directory.yaml            # optional patient/staff display names
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the sharded UUID. Dose records are
//! written once with `create_new` and never rewritten. Scheme updates replace `scheme.yaml`
//! through a temporary file and a rename.
//!
//! Writes within one store instance are serialised by a mutex so the uniqueness checks and the
//! write happen together. Separate processes writing the same directory are not coordinated.

use super::{
    duplicate_dose_conflict, duplicate_name_conflict, DoseRecordStore, NameDirectory, SchemeStore,
};
use crate::config::{CoreConfig, DoseUniqueness};
use crate::constants::{DOSE_RECORD_EXTENSION, SCHEME_YAML_FILENAME};
use crate::dose::DoseRecord;
use crate::scheme::{SchemePatch, VaccineScheme};
use crate::{VaccinationError, VaccinationResult};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use vax_uuid::{ClinicId, PatientId, SchemeId, UserId};

fn read_yaml<T: DeserializeOwned>(path: &Path) -> VaccinationResult<T> {
    let contents = fs::read_to_string(path).map_err(VaccinationError::FileRead)?;
    serde_yaml::from_str(&contents).map_err(VaccinationError::YamlDeserialization)
}

fn read_yaml_if_exists<T: DeserializeOwned>(path: &Path) -> VaccinationResult<Option<T>> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str(&contents)
            .map(Some)
            .map_err(VaccinationError::YamlDeserialization),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(VaccinationError::FileRead(e)),
    }
}

fn ensure_parent(path: &Path) -> VaccinationResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(VaccinationError::StorageDirCreation)?;
    }
    Ok(())
}

/// Writes `value` to a file that must not exist yet.
fn write_yaml_new<T: Serialize>(path: &Path, value: &T) -> VaccinationResult<()> {
    let yaml = serde_yaml::to_string(value).map_err(VaccinationError::YamlSerialization)?;
    ensure_parent(path)?;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(VaccinationError::FileWrite)?;
    file.write_all(yaml.as_bytes())
        .map_err(VaccinationError::FileWrite)
}

/// Replaces the contents of `path` via a sibling temporary file.
fn write_yaml_replace<T: Serialize>(path: &Path, value: &T) -> VaccinationResult<()> {
    let yaml = serde_yaml::to_string(value).map_err(VaccinationError::YamlSerialization)?;
    ensure_parent(path)?;

    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, yaml).map_err(VaccinationError::FileWrite)?;
    fs::rename(&tmp, path).map_err(VaccinationError::FileWrite)
}

fn subdirs(dir: &Path) -> VaccinationResult<Vec<PathBuf>> {
    let iter = match fs::read_dir(dir) {
        Ok(it) => it,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(VaccinationError::FileRead(e)),
    };

    let mut dirs = Vec::new();
    for entry in iter {
        let path = entry.map_err(VaccinationError::FileRead)?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

/// Leaf `<s1>/<s2>/<uuid>` directories under a sharded base directory.
fn sharded_leaf_dirs(base: &Path) -> VaccinationResult<Vec<PathBuf>> {
    let mut leaves = Vec::new();
    for s1 in subdirs(base)? {
        for s2 in subdirs(&s1)? {
            leaves.extend(subdirs(&s2)?);
        }
    }
    Ok(leaves)
}

/// Every dose record file directly inside `patient_dir`.
///
/// A file that fails to parse is logged and skipped rather than failing the whole listing.
fn records_in(patient_dir: &Path) -> VaccinationResult<Vec<DoseRecord>> {
    let iter = match fs::read_dir(patient_dir) {
        Ok(it) => it,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(VaccinationError::FileRead(e)),
    };

    let mut records = Vec::new();
    for entry in iter {
        let path = entry.map_err(VaccinationError::FileRead)?.path();
        let is_record = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == DOSE_RECORD_EXTENSION);
        if !is_record {
            continue;
        }

        match read_yaml::<DoseRecord>(&path) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("failed to parse dose record {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

/// Scheme store under `<data_dir>/schemes/`.
#[derive(Debug)]
pub struct YamlSchemeStore {
    cfg: Arc<CoreConfig>,
    write_lock: Mutex<()>,
}

impl YamlSchemeStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            write_lock: Mutex::new(()),
        }
    }

    fn scheme_file(&self, id: &SchemeId) -> PathBuf {
        id.sharded_dir(&self.cfg.schemes_dir())
            .join(SCHEME_YAML_FILENAME)
    }

    fn all(&self) -> VaccinationResult<Vec<VaccineScheme>> {
        let mut schemes = Vec::new();
        for dir in sharded_leaf_dirs(&self.cfg.schemes_dir())? {
            let path = dir.join(SCHEME_YAML_FILENAME);
            if !path.is_file() {
                continue;
            }
            match read_yaml::<VaccineScheme>(&path) {
                Ok(scheme) => schemes.push(scheme),
                Err(e) => tracing::warn!("failed to parse scheme {}: {}", path.display(), e),
            }
        }
        Ok(schemes)
    }
}

impl SchemeStore for YamlSchemeStore {
    fn create(&self, scheme: VaccineScheme) -> VaccinationResult<VaccineScheme> {
        let _guard = self.write_lock.lock()?;

        if self.all()?.iter().any(|s| s.name == scheme.name) {
            return Err(duplicate_name_conflict(&scheme.name));
        }

        let path = self.scheme_file(&scheme.id);
        write_yaml_new(&path, &scheme).map_err(|e| match e {
            VaccinationError::FileWrite(io) if io.kind() == ErrorKind::AlreadyExists => {
                VaccinationError::Conflict(format!("vaccine scheme {} already exists", scheme.id))
            }
            other => other,
        })?;
        Ok(scheme)
    }

    fn get(&self, id: &SchemeId) -> VaccinationResult<Option<VaccineScheme>> {
        read_yaml_if_exists(&self.scheme_file(id))
    }

    fn list(&self, active_only: bool) -> VaccinationResult<Vec<VaccineScheme>> {
        let mut listed: Vec<VaccineScheme> = self
            .all()?
            .into_iter()
            .filter(|s| !active_only || s.is_active)
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    fn update(&self, id: &SchemeId, patch: &SchemePatch) -> VaccinationResult<VaccineScheme> {
        let _guard = self.write_lock.lock()?;

        let mut scheme = self
            .get(id)?
            .ok_or_else(|| VaccinationError::NotFound(format!("vaccine scheme {}", id)))?;

        if let Some(name) = &patch.name {
            if self.all()?.iter().any(|s| &s.name == name && &s.id != id) {
                return Err(duplicate_name_conflict(name));
            }
        }

        patch.apply_to(&mut scheme);
        write_yaml_replace(&self.scheme_file(id), &scheme)?;
        Ok(scheme)
    }
}

/// Dose record store under `<data_dir>/doses/`.
#[derive(Debug)]
pub struct YamlDoseRecordStore {
    cfg: Arc<CoreConfig>,
    write_lock: Mutex<()>,
}

impl YamlDoseRecordStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            write_lock: Mutex::new(()),
        }
    }

    fn clinic_dir(&self, clinic_id: &ClinicId) -> PathBuf {
        self.cfg.doses_dir().join(clinic_id.to_string())
    }

    fn patient_dir(&self, clinic_id: &ClinicId, patient_id: &PatientId) -> PathBuf {
        patient_id.sharded_dir(&self.clinic_dir(clinic_id))
    }
}

impl DoseRecordStore for YamlDoseRecordStore {
    fn create(&self, record: DoseRecord) -> VaccinationResult<DoseRecord> {
        let _guard = self.write_lock.lock()?;

        if self.cfg.dose_uniqueness() == DoseUniqueness::Enforced
            && self.exists_next_dose(
                &record.patient_id,
                &record.vaccine_scheme_id,
                record.dose_number,
            )?
        {
            return Err(duplicate_dose_conflict(&record));
        }

        let path = self
            .patient_dir(&record.clinic_id, &record.patient_id)
            .join(format!("{}.{}", record.id, DOSE_RECORD_EXTENSION));
        write_yaml_new(&path, &record)?;

        Ok(record)
    }

    fn list_by_patient(
        &self,
        clinic_id: &ClinicId,
        patient_id: &PatientId,
    ) -> VaccinationResult<Vec<DoseRecord>> {
        let mut records = records_in(&self.patient_dir(clinic_id, patient_id))?;
        records.sort_by_key(|r| r.administered_at);
        Ok(records)
    }

    fn list_overdue_candidates(
        &self,
        clinic_id: &ClinicId,
        as_of: NaiveDate,
    ) -> VaccinationResult<Vec<DoseRecord>> {
        let mut candidates = Vec::new();
        for patient_dir in sharded_leaf_dirs(&self.clinic_dir(clinic_id))? {
            candidates.extend(
                records_in(&patient_dir)?
                    .into_iter()
                    .filter(|r| r.is_overdue_anchor(as_of)),
            );
        }
        candidates.sort_by_key(|r| r.next_dose_date);
        Ok(candidates)
    }

    fn exists_next_dose(
        &self,
        patient_id: &PatientId,
        scheme_id: &SchemeId,
        dose_number: u32,
    ) -> VaccinationResult<bool> {
        for clinic_dir in subdirs(&self.cfg.doses_dir())? {
            let found = records_in(&patient_id.sharded_dir(&clinic_dir))?
                .iter()
                .any(|r| &r.vaccine_scheme_id == scheme_id && r.dose_number == dose_number);
            if found {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    patients: HashMap<PatientId, String>,
    #[serde(default)]
    staff: HashMap<UserId, String>,
}

/// Name directory loaded once from `<data_dir>/directory.yaml`.
///
/// ```yaml
/// patients:
///   550e8400e29b41d4a716446655440000: Ana Quispe
/// staff:
///   0123456789abcdef0123456789abcdef: Dr. Luis Rojas
/// ```
///
/// A missing file yields an empty directory.
#[derive(Debug, Default)]
pub struct YamlDirectory {
    names: DirectoryFile,
}

impl YamlDirectory {
    pub fn load(cfg: &CoreConfig) -> VaccinationResult<Self> {
        let names = read_yaml_if_exists(&cfg.directory_file())?.unwrap_or_default();
        Ok(Self { names })
    }
}

impl NameDirectory for YamlDirectory {
    fn patient_name(&self, patient_id: &PatientId) -> VaccinationResult<Option<String>> {
        Ok(self.names.patients.get(patient_id).cloned())
    }

    fn staff_name(&self, user_id: &UserId) -> VaccinationResult<Option<String>> {
        Ok(self.names.staff.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dose::DoseRegistration;
    use crate::scheme::NewScheme;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;
    use vax_types::{LotNumber, SchemeName};

    fn test_cfg(data_dir: &Path, uniqueness: DoseUniqueness) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(data_dir.to_path_buf(), uniqueness)
                .expect("CoreConfig::new should succeed"),
        )
    }

    fn scheme(name: &str) -> VaccineScheme {
        NewScheme {
            name: SchemeName::new(name).unwrap(),
            doses_total: 3,
            dose_intervals_months: vec![0, 2, 6],
            notes: Some("adolescents".into()),
        }
        .into_scheme(Utc.with_ymd_and_hms(2025, 1, 2, 9, 30, 0).unwrap())
    }

    fn dose(
        clinic: ClinicId,
        patient: PatientId,
        scheme: SchemeId,
        n: u32,
        next: Option<NaiveDate>,
        offset_minutes: i64,
    ) -> DoseRecord {
        DoseRegistration {
            clinic_id: clinic,
            administered_by: UserId::new(),
            patient_id: patient,
            vaccine_scheme_id: scheme,
            dose_number: n,
            lot_number: Some(LotNumber::new("LOT-42").unwrap()),
            inventory_item_id: None,
            notes: None,
        }
        .into_record(
            next,
            Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap() + Duration::minutes(offset_minutes),
        )
    }

    #[test]
    fn scheme_round_trips_through_sharded_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path(), DoseUniqueness::Permissive);
        let store = YamlSchemeStore::new(cfg.clone());

        let created = store.create(scheme("HPV")).expect("create should succeed");

        let file = created
            .id
            .sharded_dir(&cfg.schemes_dir())
            .join(SCHEME_YAML_FILENAME);
        assert!(file.is_file(), "scheme.yaml should exist");

        let loaded = store.get(&created.id).unwrap().expect("scheme should load");
        assert_eq!(loaded, created);
        assert_eq!(store.get(&SchemeId::new()).unwrap(), None);
    }

    #[test]
    fn scheme_list_and_update() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = YamlSchemeStore::new(test_cfg(temp_dir.path(), DoseUniqueness::Permissive));

        let mmr = store.create(scheme("MMR")).unwrap();
        store.create(scheme("BCG")).unwrap();
        assert!(matches!(
            store.create(scheme("MMR")),
            Err(VaccinationError::Conflict(_))
        ));

        let patch = SchemePatch {
            is_active: Some(false),
            notes: Some(None),
            ..SchemePatch::default()
        };
        let updated = store.update(&mmr.id, &patch).unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.notes, None);

        let active: Vec<String> = store
            .list(true)
            .unwrap()
            .iter()
            .map(|s| s.name.to_string())
            .collect();
        assert_eq!(active, vec!["BCG"]);

        let all: Vec<String> = store
            .list(false)
            .unwrap()
            .iter()
            .map(|s| s.name.to_string())
            .collect();
        assert_eq!(all, vec!["BCG", "MMR"]);
    }

    #[test]
    fn update_missing_scheme_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = YamlSchemeStore::new(test_cfg(temp_dir.path(), DoseUniqueness::Permissive));
        assert!(matches!(
            store.update(&SchemeId::new(), &SchemePatch::default()),
            Err(VaccinationError::NotFound(_))
        ));
    }

    #[test]
    fn dose_records_listed_per_patient_in_administration_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store =
            YamlDoseRecordStore::new(test_cfg(temp_dir.path(), DoseUniqueness::Permissive));
        let (clinic, patient, scheme_id) = (ClinicId::new(), PatientId::new(), SchemeId::new());

        store
            .create(dose(clinic, patient, scheme_id, 2, None, 30))
            .unwrap();
        store
            .create(dose(clinic, patient, scheme_id, 1, None, 0))
            .unwrap();
        store
            .create(dose(clinic, PatientId::new(), scheme_id, 1, None, 0))
            .unwrap();

        let listed = store.list_by_patient(&clinic, &patient).unwrap();
        let numbers: Vec<u32> = listed.iter().map(|r| r.dose_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(listed[0].lot_number.as_ref().unwrap().as_str(), "LOT-42");
    }

    #[test]
    fn overdue_candidates_filter_and_sort() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store =
            YamlDoseRecordStore::new(test_cfg(temp_dir.path(), DoseUniqueness::Permissive));
        let clinic = ClinicId::new();
        let scheme_id = SchemeId::new();
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let recent = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let oldest = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        store
            .create(dose(clinic, PatientId::new(), scheme_id, 1, Some(recent), 0))
            .unwrap();
        store
            .create(dose(clinic, PatientId::new(), scheme_id, 1, Some(oldest), 0))
            .unwrap();
        store
            .create(dose(clinic, PatientId::new(), scheme_id, 1, Some(as_of), 0))
            .unwrap();
        store
            .create(dose(clinic, PatientId::new(), scheme_id, 3, None, 0))
            .unwrap();
        store
            .create(dose(ClinicId::new(), PatientId::new(), scheme_id, 1, Some(oldest), 0))
            .unwrap();

        let candidates = store.list_overdue_candidates(&clinic, as_of).unwrap();
        let dates: Vec<Option<NaiveDate>> = candidates.iter().map(|r| r.next_dose_date).collect();
        assert_eq!(dates, vec![Some(oldest), Some(recent)]);
    }

    #[test]
    fn enforced_uniqueness_spans_clinics() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = YamlDoseRecordStore::new(test_cfg(temp_dir.path(), DoseUniqueness::Enforced));
        let (patient, scheme_id) = (PatientId::new(), SchemeId::new());

        store
            .create(dose(ClinicId::new(), patient, scheme_id, 1, None, 0))
            .unwrap();
        let err = store
            .create(dose(ClinicId::new(), patient, scheme_id, 1, None, 5))
            .unwrap_err();
        assert!(matches!(err, VaccinationError::Conflict(_)));

        assert!(store.exists_next_dose(&patient, &scheme_id, 1).unwrap());
        assert!(!store.exists_next_dose(&patient, &scheme_id, 2).unwrap());
    }

    #[test]
    fn unreadable_record_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store =
            YamlDoseRecordStore::new(test_cfg(temp_dir.path(), DoseUniqueness::Permissive));
        let (clinic, patient, scheme_id) = (ClinicId::new(), PatientId::new(), SchemeId::new());

        let stored = store
            .create(dose(clinic, patient, scheme_id, 1, None, 0))
            .unwrap();
        let dir = store.patient_dir(&clinic, &patient);
        fs::write(dir.join("garbage.yaml"), "dose_number: [").unwrap();

        let listed = store.list_by_patient(&clinic, &patient).unwrap();
        assert_eq!(listed, vec![stored]);
    }

    #[test]
    fn directory_loads_names_or_defaults_to_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path(), DoseUniqueness::Permissive);

        let empty = YamlDirectory::load(&cfg).unwrap();
        assert_eq!(empty.patient_name(&PatientId::new()).unwrap(), None);

        let patient = PatientId::new();
        let nurse = UserId::new();
        fs::write(
            cfg.directory_file(),
            format!("patients:\n  {}: Ana Quispe\nstaff:\n  {}: Rosa Huaman\n", patient, nurse),
        )
        .unwrap();

        let directory = YamlDirectory::load(&cfg).unwrap();
        assert_eq!(
            directory.patient_name(&patient).unwrap().as_deref(),
            Some("Ana Quispe")
        );
        assert_eq!(
            directory.staff_name(&nurse).unwrap().as_deref(),
            Some("Rosa Huaman")
        );
    }
}
