//! File-backed record store.
//!
//! Each collection lives in its own directory under the data dir, one record per sharded
//! directory:
//!
//! ```text
//! <data_dir>/<collection>/<s1>/<s2>/<id>/record.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the record id. Every collection is
//! loaded into memory when the store opens. Mutations are written through to disk before the
//! in-memory table changes, so a failed write leaves both views unchanged.
//!
//! All access goes through a single [`RwLock`]. Services that check an invariant and then
//! write (double booking, uniqueness) hold the write guard across both steps.

use crate::auth::Actor;
use crate::constants::{
    APPOINTMENTS_DIR_NAME, DOCTORS_DIR_NAME, PATIENTS_DIR_NAME, PRESCRIPTIONS_DIR_NAME,
    RECORD_JSON_FILENAME, USERS_DIR_NAME,
};
use crate::models::{
    Appointment, AppointmentView, Doctor, Patient, Prescription, PrescriptionView, Role, User,
};
use crate::{CoreConfig, HmsError, HmsResult};
use hms_types::{EmailAddress, FullName};
use hms_uuid::RecordId;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A record type stored in its own collection directory.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: &'static str;

    fn id(&self) -> RecordId;
}

impl Record for Doctor {
    const COLLECTION: &'static str = DOCTORS_DIR_NAME;

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for Patient {
    const COLLECTION: &'static str = PATIENTS_DIR_NAME;

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for Appointment {
    const COLLECTION: &'static str = APPOINTMENTS_DIR_NAME;

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for Prescription {
    const COLLECTION: &'static str = PRESCRIPTIONS_DIR_NAME;

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for User {
    const COLLECTION: &'static str = USERS_DIR_NAME;

    fn id(&self) -> RecordId {
        self.id
    }
}

/// The in-memory rows of one collection plus the directory they are persisted to.
#[derive(Debug)]
pub struct Collection<T> {
    dir: PathBuf,
    rows: BTreeMap<RecordId, T>,
}

impl<T: Record> Collection<T> {
    /// Loads every readable record under `<data_dir>/<collection>/`.
    ///
    /// Records that cannot be parsed, or whose stored id disagrees with their directory, are
    /// logged as warnings and skipped.
    fn load(data_dir: &Path) -> HmsResult<Self> {
        let dir = data_dir.join(T::COLLECTION);
        fs::create_dir_all(&dir).map_err(HmsError::StorageDirCreation)?;

        let mut rows = BTreeMap::new();
        for record_path in record_files(&dir) {
            let contents = match fs::read_to_string(&record_path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!("failed to read {}: {}", record_path.display(), e);
                    continue;
                }
            };
            let record: T = match serde_json::from_str(&contents) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("failed to parse {}: {}", record_path.display(), e);
                    continue;
                }
            };
            let dir_name = record_path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());
            if dir_name != Some(record.id().to_string().as_str()) {
                tracing::warn!(
                    "skipping {}: record id does not match its directory",
                    record_path.display()
                );
                continue;
            }
            rows.insert(record.id(), record);
        }

        tracing::debug!(collection = T::COLLECTION, count = rows.len(), "collection loaded");
        Ok(Self { dir, rows })
    }

    pub fn get(&self, id: RecordId) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        self.rows.values().find(|r| pred(r))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts or replaces a record, writing it to disk first.
    pub fn put(&mut self, record: T) -> HmsResult<()> {
        let record_dir = record.id().sharded_dir(&self.dir);
        fs::create_dir_all(&record_dir).map_err(HmsError::StorageDirCreation)?;

        let json = serde_json::to_string_pretty(&record).map_err(HmsError::Serialization)?;
        let final_path = record_dir.join(RECORD_JSON_FILENAME);
        let tmp_path = record_dir.join(format!("{RECORD_JSON_FILENAME}.tmp"));
        fs::write(&tmp_path, json).map_err(HmsError::FileWrite)?;
        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(HmsError::FileWrite(e));
        }

        self.rows.insert(record.id(), record);
        Ok(())
    }

    /// Removes a record and its directory. Returns the removed record, if there was one.
    pub fn remove(&mut self, id: RecordId) -> HmsResult<Option<T>> {
        let record_dir = id.sharded_dir(&self.dir);
        match fs::remove_dir_all(&record_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(HmsError::FileRemove(e)),
        }
        Ok(self.rows.remove(&id))
    }

    /// Removes every record in the collection.
    pub fn clear(&mut self) -> HmsResult<()> {
        let ids: Vec<RecordId> = self.rows.keys().copied().collect();
        for id in ids {
            self.remove(id)?;
        }
        Ok(())
    }
}

/// Paths of every `record.json` found three shard levels below `dir`.
fn record_files(dir: &Path) -> Vec<PathBuf> {
    fn subdirs(path: &Path) -> Vec<PathBuf> {
        match fs::read_dir(path) {
            Ok(it) => it
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    let mut files = Vec::new();
    for s1 in subdirs(dir) {
        for s2 in subdirs(&s1) {
            for id_dir in subdirs(&s2) {
                let path = id_dir.join(RECORD_JSON_FILENAME);
                if path.is_file() {
                    files.push(path);
                }
            }
        }
    }
    files
}

/// Every collection, as seen under one lock guard.
#[derive(Debug)]
pub struct Tables {
    pub doctors: Collection<Doctor>,
    pub patients: Collection<Patient>,
    pub appointments: Collection<Appointment>,
    pub prescriptions: Collection<Prescription>,
    pub users: Collection<User>,
}

impl Tables {
    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users
            .find(|u| u.username.as_deref() == Some(username))
    }

    pub fn user_by_email(&self, email: &EmailAddress) -> Option<&User> {
        self.users.find(|u| u.email.as_ref() == Some(email))
    }

    pub fn doctor_by_name(&self, name: &FullName) -> Option<&Doctor> {
        self.doctors.find(|d| d.full_name == *name)
    }

    pub fn patient_by_name(&self, name: &FullName) -> Option<&Patient> {
        self.patients.find(|p| p.full_name == *name)
    }

    /// The doctor record a doctor account acts for: the account's explicit link, else the
    /// doctor whose name slug equals the username.
    pub fn linked_doctor(&self, actor: &Actor) -> Option<&Doctor> {
        let linked = self
            .users
            .get(actor.user_id)
            .and_then(|u| u.doctor_id)
            .and_then(|id| self.doctors.get(id));
        linked.or_else(|| {
            let name = actor.identity()?;
            self.doctors.find(|d| d.full_name.matches_username(name))
        })
    }

    /// The patient record a patient account acts for, resolved like [`Tables::linked_doctor`].
    pub fn linked_patient(&self, actor: &Actor) -> Option<&Patient> {
        let linked = self
            .users
            .get(actor.user_id)
            .and_then(|u| u.patient_id)
            .and_then(|id| self.patients.get(id));
        linked.or_else(|| {
            let name = actor.identity()?;
            self.patients.find(|p| p.full_name.matches_username(name))
        })
    }

    pub fn appointment_view(&self, appt: &Appointment) -> AppointmentView {
        AppointmentView {
            id: appt.id,
            patient_id: appt.patient_id,
            doctor_id: appt.doctor_id,
            patient: self.patients.get(appt.patient_id).map(Patient::summary),
            doctor: self.doctors.get(appt.doctor_id).map(Doctor::summary),
            datetime: appt.datetime,
            status: appt.status,
            created_at: appt.created_at,
        }
    }

    pub fn prescription_view(&self, rx: &Prescription) -> PrescriptionView {
        PrescriptionView {
            id: rx.id,
            patient_id: rx.patient_id,
            doctor_id: rx.doctor_id,
            patient: self.patients.get(rx.patient_id).map(Patient::summary),
            doctor: rx
                .doctor_id
                .and_then(|id| self.doctors.get(id))
                .map(Doctor::summary),
            file_url: rx.file_url.clone(),
            uploaded_by: rx.uploaded_by.clone(),
            date: rx.date,
            notes: rx.notes.clone(),
        }
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.users.iter().filter(|u| u.role == role).count()
    }
}

/// The shared handle to all hospital data.
#[derive(Debug)]
pub struct HospitalStore {
    tables: RwLock<Tables>,
}

impl HospitalStore {
    /// Opens (creating if needed) the store under the configured data directory.
    pub fn open(cfg: &CoreConfig) -> HmsResult<Self> {
        let data_dir = cfg.data_dir();
        fs::create_dir_all(data_dir).map_err(HmsError::StorageDirCreation)?;

        let tables = Tables {
            doctors: Collection::load(data_dir)?,
            patients: Collection::load(data_dir)?,
            appointments: Collection::load(data_dir)?,
            prescriptions: Collection::load(data_dir)?,
            users: Collection::load(data_dir)?,
        };
        tracing::info!(
            data_dir = %data_dir.display(),
            doctors = tables.doctors.len(),
            patients = tables.patients.len(),
            appointments = tables.appointments.len(),
            prescriptions = tables.prescriptions.len(),
            users = tables.users.len(),
            "hospital store opened"
        );

        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    pub fn read(&self) -> HmsResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| HmsError::LockPoisoned)
    }

    pub fn write(&self) -> HmsResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| HmsError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, Slot};
    use chrono::{Duration, Utc};
    use hms_types::NonEmptyText;
    use tempfile::TempDir;

    fn test_cfg(dir: &Path) -> CoreConfig {
        CoreConfig::new(
            dir.to_path_buf(),
            "test-secret".into(),
            Duration::hours(1),
            1_000,
            chrono::FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap()
    }

    fn doctor(name: &str) -> Doctor {
        let now = Utc::now();
        Doctor {
            id: RecordId::new(),
            full_name: FullName::new(name).unwrap(),
            specialization: NonEmptyText::new("Cardiology").unwrap(),
            experience: 10,
            qualification: NonEmptyText::new("MBBS, MD").unwrap(),
            available_slots: vec![Slot {
                start: now,
                end: now + Duration::minutes(30),
            }],
            email: None,
            created_at: now,
        }
    }

    #[test]
    fn records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let cfg = test_cfg(tmp.path());
        let doc = doctor("Dr. Anjali Bhatt");

        {
            let store = HospitalStore::open(&cfg).unwrap();
            store.write().unwrap().doctors.put(doc.clone()).unwrap();
        }

        let expected = doc.id.sharded_dir(&cfg.doctors_dir()).join(RECORD_JSON_FILENAME);
        assert!(expected.is_file());

        let store = HospitalStore::open(&cfg).unwrap();
        let tables = store.read().unwrap();
        assert_eq!(tables.doctors.get(doc.id), Some(&doc));
        assert!(tables.doctor_by_name(&doc.full_name).is_some());
    }

    #[test]
    fn remove_deletes_record_directory() {
        let tmp = TempDir::new().unwrap();
        let cfg = test_cfg(tmp.path());
        let store = HospitalStore::open(&cfg).unwrap();
        let doc = doctor("Dr. Patel");
        let dir = doc.id.sharded_dir(&cfg.doctors_dir());

        let mut tables = store.write().unwrap();
        tables.doctors.put(doc.clone()).unwrap();
        assert!(dir.is_dir());

        let removed = tables.doctors.remove(doc.id).unwrap();
        assert_eq!(removed.map(|d| d.id), Some(doc.id));
        assert!(!dir.exists());
        assert!(tables.doctors.remove(doc.id).unwrap().is_none());
    }

    #[test]
    fn malformed_records_are_skipped_on_load() {
        let tmp = TempDir::new().unwrap();
        let cfg = test_cfg(tmp.path());
        let bad_dir = RecordId::new().sharded_dir(&cfg.patients_dir());
        fs::create_dir_all(&bad_dir).unwrap();
        fs::write(bad_dir.join(RECORD_JSON_FILENAME), "{ not json").unwrap();

        let store = HospitalStore::open(&cfg).unwrap();
        assert!(store.read().unwrap().patients.is_empty());
    }

    #[test]
    fn views_tolerate_dangling_references() {
        let tmp = TempDir::new().unwrap();
        let store = HospitalStore::open(&test_cfg(tmp.path())).unwrap();
        let doc = doctor("Dr. Patel");
        let now = Utc::now();
        let appt = Appointment {
            id: RecordId::new(),
            patient_id: RecordId::new(),
            doctor_id: doc.id,
            datetime: now,
            status: AppointmentStatus::Scheduled,
            created_at: now,
        };

        let mut tables = store.write().unwrap();
        tables.doctors.put(doc).unwrap();
        let view = tables.appointment_view(&appt);
        assert!(view.patient.is_none());
        assert_eq!(view.doctor.unwrap().full_name, "Dr. Patel");
    }
}
