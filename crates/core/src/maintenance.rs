//! Offline maintenance routines behind the `hms` CLI.
//!
//! These operate on the store directly and are not part of request handling. Each returns a
//! report value; printing is left to the caller.

use crate::auth::hash_password;
use crate::models::{
    Appointment, AppointmentStatus, Doctor, Patient, Prescription, Role, Slot, User,
};
use crate::store::Tables;
use crate::{CoreContext, HmsError, HmsResult};
use chrono::{DateTime, Duration, Utc};
use hms_types::{EmailAddress, FullName, NonEmptyText};
use hms_uuid::RecordId;
use std::collections::HashMap;

/// Demo logins created by `create-admin`: (email, password, role).
pub const DEMO_ACCOUNTS: [(&str, &str, Role); 4] = [
    ("patient1@hms.com", "patient123", Role::Patient),
    ("doctor1@hms.com", "doctor123", Role::Doctor),
    ("reception1@hms.com", "reception123", Role::Receptionist),
    ("admin2@hms.com", "admin123", Role::Admin),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountReport {
    pub email: String,
    pub role: Role,
    pub created: bool,
}

/// Creates each demo account that does not exist yet.
pub fn create_demo_accounts(ctx: &CoreContext) -> HmsResult<Vec<AccountReport>> {
    let iterations = ctx.cfg().password_iterations();
    let mut tables = ctx.store().write()?;
    let mut report = Vec::with_capacity(DEMO_ACCOUNTS.len());

    for (email, password, role) in DEMO_ACCOUNTS {
        let address = EmailAddress::parse(email)?;
        let created = if tables.user_by_email(&address).is_some() {
            false
        } else {
            tables
                .users
                .put(email_user(address, hash_password(password, iterations), role, None, None))?;
            tracing::info!(%email, %role, "demo account created");
            true
        };
        report.push(AccountReport {
            email: email.to_string(),
            role,
            created,
        });
    }
    Ok(report)
}

fn email_user(
    email: EmailAddress,
    password_hash: String,
    role: Role,
    doctor_id: Option<RecordId>,
    patient_id: Option<RecordId>,
) -> User {
    User {
        id: RecordId::new(),
        username: None,
        email: Some(email),
        password_hash,
        role,
        doctor_id,
        patient_id,
        created_at: Utc::now(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub doctors: usize,
    pub patients: usize,
    pub appointments: usize,
    pub prescriptions: usize,
    pub users: usize,
}

fn is_empty(tables: &Tables) -> bool {
    tables.doctors.is_empty()
        && tables.patients.is_empty()
        && tables.appointments.is_empty()
        && tables.prescriptions.is_empty()
        && tables.users.is_empty()
}

fn text(value: &str) -> HmsResult<NonEmptyText> {
    Ok(NonEmptyText::new(value)?)
}

/// Replaces all data with a small sample hospital, relative to `now`.
///
/// Refuses to touch a non-empty store unless `force` is set. The sample prescriptions have no
/// doctor, which `backfill-prescriptions` then repairs.
pub fn seed(ctx: &CoreContext, force: bool, now: DateTime<Utc>) -> HmsResult<SeedSummary> {
    let iterations = ctx.cfg().password_iterations();
    let mut tables = ctx.store().write()?;
    if !force && !is_empty(&tables) {
        return Err(HmsError::Conflict(
            "store already contains data; pass --force to replace it".into(),
        ));
    }

    tables.doctors.clear()?;
    tables.patients.clear()?;
    tables.appointments.clear()?;
    tables.prescriptions.clear()?;
    tables.users.clear()?;

    let day = Duration::days(1);
    let slot = |start: DateTime<Utc>| Slot {
        start,
        end: start + Duration::minutes(30),
    };

    let doctors = [
        Doctor {
            id: RecordId::new(),
            full_name: FullName::new("Dr. Anjali Bhatt")?,
            specialization: text("Cardiology")?,
            experience: 10,
            qualification: text("MBBS, MD")?,
            available_slots: vec![
                slot(now + day),
                slot(now + day + Duration::hours(1)),
                slot(now + day * 2),
            ],
            email: Some(EmailAddress::parse("anjali@hospital.com")?),
            created_at: now,
        },
        Doctor {
            id: RecordId::new(),
            full_name: FullName::new("Dr. Patel")?,
            specialization: text("Orthopedics")?,
            experience: 8,
            qualification: text("MBBS, MS")?,
            available_slots: vec![
                slot(now + day + Duration::hours(2)),
                slot(now + day * 2 + Duration::hours(1)),
            ],
            email: Some(EmailAddress::parse("patel@hospital.com")?),
            created_at: now,
        },
    ];

    let patient = |name: &str, email: &str, age: u32, gender: &str, summary: &str| {
        Ok::<_, HmsError>(Patient {
            id: RecordId::new(),
            full_name: FullName::new(name)?,
            age: Some(age),
            gender: Some(gender.to_string()),
            email: Some(EmailAddress::parse(email)?),
            health_summary: summary.to_string(),
            created_at: now,
        })
    };
    let patients = [
        patient(
            "John Doe",
            "john@example.com",
            32,
            "Male",
            "No known allergies. Previous history of mild hypertension.",
        )?,
        patient(
            "Jane Smith",
            "jane@example.com",
            28,
            "Female",
            "Allergic to penicillin. No other known conditions.",
        )?,
        patient(
            "Amith Shah",
            "amith@example.com",
            45,
            "Male",
            "Diabetes type 2. Takes metformin daily.",
        )?,
    ];
    let [anjali, patel] = &doctors;
    let [john, jane, amith] = &patients;

    let appointment = |patient: &Patient, doctor: &Doctor, datetime, status| Appointment {
        id: RecordId::new(),
        patient_id: patient.id,
        doctor_id: doctor.id,
        datetime,
        status,
        created_at: now,
    };
    let appointments = [
        appointment(john, anjali, now + day, AppointmentStatus::Scheduled),
        appointment(jane, patel, now + day * 2, AppointmentStatus::Scheduled),
        appointment(amith, anjali, now - day, AppointmentStatus::Completed),
    ];

    let prescription = |patient: &Patient, notes: &str| Prescription {
        id: RecordId::new(),
        patient_id: patient.id,
        doctor_id: None,
        file_url: None,
        uploaded_by: Some("anjali@hospital.com".into()),
        date: now,
        notes: Some(notes.to_string()),
    };
    let prescriptions = [
        prescription(
            amith,
            "Metformin 500mg twice daily. Monitor blood sugar levels. Follow up in 3 months.",
        ),
        prescription(
            john,
            "Lisinopril 10mg once daily for blood pressure control. Regular monitoring required.",
        ),
    ];

    let users = [
        email_user(
            EmailAddress::parse("admin@hospital.com")?,
            hash_password("admin123", iterations),
            Role::Admin,
            None,
            None,
        ),
        email_user(
            EmailAddress::parse("receptionist@hospital.com")?,
            hash_password("reception123", iterations),
            Role::Receptionist,
            None,
            None,
        ),
        email_user(
            EmailAddress::parse("anjali@hospital.com")?,
            hash_password("doctor123", iterations),
            Role::Doctor,
            Some(anjali.id),
            None,
        ),
        email_user(
            EmailAddress::parse("john@example.com")?,
            hash_password("patient123", iterations),
            Role::Patient,
            None,
            Some(john.id),
        ),
    ];

    let summary = SeedSummary {
        doctors: doctors.len(),
        patients: patients.len(),
        appointments: appointments.len(),
        prescriptions: prescriptions.len(),
        users: users.len(),
    };
    for d in doctors {
        tables.doctors.put(d)?;
    }
    for p in patients {
        tables.patients.put(p)?;
    }
    for a in appointments {
        tables.appointments.put(a)?;
    }
    for p in prescriptions {
        tables.prescriptions.put(p)?;
    }
    for u in users {
        tables.users.put(u)?;
    }
    tracing::info!(?summary, "sample data seeded");
    Ok(summary)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackfillOutcome {
    Linked { doctor: String },
    PatientMissing,
    NoAppointments,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackfillEntry {
    pub prescription_id: RecordId,
    pub patient_id: RecordId,
    pub outcome: BackfillOutcome,
}

/// Links each doctor-less prescription to the doctor of the patient's most recent appointment.
pub fn backfill_prescriptions(ctx: &CoreContext) -> HmsResult<Vec<BackfillEntry>> {
    let mut tables = ctx.store().write()?;
    let orphans: Vec<Prescription> = tables
        .prescriptions
        .iter()
        .filter(|p| p.doctor_id.is_none())
        .cloned()
        .collect();

    let mut report = Vec::with_capacity(orphans.len());
    for mut rx in orphans {
        let outcome = if !tables.patients.contains(rx.patient_id) {
            BackfillOutcome::PatientMissing
        } else {
            let latest = tables
                .appointments
                .iter()
                .filter(|a| a.patient_id == rx.patient_id)
                .max_by_key(|a| a.datetime)
                .map(|a| a.doctor_id);
            match latest {
                None => BackfillOutcome::NoAppointments,
                Some(doctor_id) => {
                    let doctor = tables
                        .doctors
                        .get(doctor_id)
                        .map(|d| d.full_name.to_string())
                        .unwrap_or_else(|| doctor_id.to_string());
                    rx.doctor_id = Some(doctor_id);
                    tables.prescriptions.put(rx.clone())?;
                    tracing::info!(prescription_id = %rx.id, %doctor_id, "prescription backfilled");
                    BackfillOutcome::Linked { doctor }
                }
            }
        };
        report.push(BackfillEntry {
            prescription_id: rx.id,
            patient_id: rx.patient_id,
            outcome,
        });
    }
    Ok(report)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsernameMatch {
    pub username: String,
    pub patient: Option<String>,
    pub doctor: Option<String>,
}

/// Shows which patient and doctor each username slug resolves to.
///
/// With no usernames given, every account username in the store is checked.
pub fn check_usernames(ctx: &CoreContext, usernames: &[String]) -> HmsResult<Vec<UsernameMatch>> {
    let tables = ctx.store().read()?;
    let candidates: Vec<String> = if usernames.is_empty() {
        tables.users.iter().filter_map(|u| u.username.clone()).collect()
    } else {
        usernames.to_vec()
    };

    Ok(candidates
        .into_iter()
        .map(|username| UsernameMatch {
            patient: tables
                .patients
                .find(|p| p.full_name.matches_username(&username))
                .map(|p| p.full_name.to_string()),
            doctor: tables
                .doctors
                .find(|d| d.full_name.matches_username(&username))
                .map(|d| d.full_name.to_string()),
            username,
        })
        .collect())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrescriptionCheck {
    pub prescription_id: RecordId,
    pub patient: Option<String>,
    pub doctor: Option<String>,
    pub uploaded_by: Option<String>,
    pub notes_preview: String,
    pub date: DateTime<Utc>,
    /// No doctor recorded at all.
    pub missing_doctor: bool,
    /// A patient or doctor id that no longer resolves.
    pub dangling: bool,
}

const NOTES_PREVIEW_CHARS: usize = 50;

pub fn check_prescriptions(ctx: &CoreContext) -> HmsResult<Vec<PrescriptionCheck>> {
    let tables = ctx.store().read()?;
    let mut rows: Vec<&Prescription> = tables.prescriptions.iter().collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(rows
        .into_iter()
        .map(|rx| {
            let patient = tables.patients.get(rx.patient_id);
            let doctor = rx.doctor_id.and_then(|id| tables.doctors.get(id));
            PrescriptionCheck {
                prescription_id: rx.id,
                patient: patient.map(|p| p.full_name.to_string()),
                doctor: doctor.map(|d| d.full_name.to_string()),
                uploaded_by: rx.uploaded_by.clone(),
                notes_preview: rx
                    .notes
                    .as_deref()
                    .unwrap_or_default()
                    .chars()
                    .take(NOTES_PREVIEW_CHARS)
                    .collect(),
                date: rx.date,
                missing_doctor: rx.doctor_id.is_none(),
                dangling: patient.is_none() || (rx.doctor_id.is_some() && doctor.is_none()),
            }
        })
        .collect())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Duplicate {
    pub collection: &'static str,
    pub key: String,
    pub ids: Vec<RecordId>,
}

/// Re-checks every uniqueness constraint over the loaded store.
///
/// Data written through the services cannot violate them; this catches files edited or
/// copied in by hand.
pub fn verify_uniqueness(ctx: &CoreContext) -> HmsResult<Vec<Duplicate>> {
    let tables = ctx.store().read()?;
    let mut found = Vec::new();

    found.extend(duplicates(
        "doctors.fullName",
        tables.doctors.iter().map(|d| (d.full_name.to_string(), d.id)),
    ));
    found.extend(duplicates(
        "patients.fullName",
        tables.patients.iter().map(|p| (p.full_name.to_string(), p.id)),
    ));
    found.extend(duplicates(
        "users.username",
        tables
            .users
            .iter()
            .filter_map(|u| u.username.clone().map(|n| (n, u.id))),
    ));
    found.extend(duplicates(
        "users.email",
        tables
            .users
            .iter()
            .filter_map(|u| u.email.as_ref().map(|e| (e.to_string(), u.id))),
    ));

    for dup in &found {
        tracing::warn!(collection = dup.collection, key = %dup.key, count = dup.ids.len(), "duplicate key");
    }
    Ok(found)
}

fn duplicates(
    collection: &'static str,
    keys: impl Iterator<Item = (String, RecordId)>,
) -> Vec<Duplicate> {
    let mut groups: HashMap<String, Vec<RecordId>> = HashMap::new();
    for (key, id) in keys {
        groups.entry(key).or_default().push(id);
    }
    let mut dups: Vec<Duplicate> = groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(key, mut ids)| {
            ids.sort();
            Duplicate {
                collection,
                key,
                ids,
            }
        })
        .collect();
    dups.sort_by(|a, b| a.key.cmp(&b.key));
    dups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use tempfile::TempDir;

    #[test]
    fn demo_accounts_are_created_once() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());

        let first = create_demo_accounts(&ctx).unwrap();
        assert!(first.iter().all(|r| r.created));
        let second = create_demo_accounts(&ctx).unwrap();
        assert!(second.iter().all(|r| !r.created));

        let login = ctx
            .users()
            .login(&api_shared::LoginReq {
                username_or_email: Some("admin2@hms.com".into()),
                password: Some("admin123".into()),
            })
            .unwrap();
        assert_eq!(login.user.role, "admin");
    }

    #[test]
    fn seed_requires_force_on_existing_data() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        let now = Utc::now();

        let summary = seed(&ctx, false, now).unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                doctors: 2,
                patients: 3,
                appointments: 3,
                prescriptions: 2,
                users: 4,
            }
        );
        assert!(matches!(seed(&ctx, false, now), Err(HmsError::Conflict(_))));
        seed(&ctx, true, now).unwrap();
        assert_eq!(ctx.doctors().list().unwrap().len(), 2);
    }

    #[test]
    fn backfill_links_latest_appointment_doctor() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        seed(&ctx, false, Utc::now()).unwrap();

        let report = backfill_prescriptions(&ctx).unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|e| e.outcome
            == BackfillOutcome::Linked {
                doctor: "Dr. Anjali Bhatt".into()
            }));

        let checks = check_prescriptions(&ctx).unwrap();
        assert!(checks.iter().all(|c| !c.missing_doctor && !c.dangling));
        assert!(backfill_prescriptions(&ctx).unwrap().is_empty());
    }

    #[test]
    fn usernames_resolve_to_records() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        seed(&ctx, false, Utc::now()).unwrap();

        let matches =
            check_usernames(&ctx, &["johndoe".into(), "dr.patel".into(), "nobody".into()])
                .unwrap();
        assert_eq!(matches[0].patient.as_deref(), Some("John Doe"));
        assert_eq!(matches[1].doctor.as_deref(), Some("Dr. Patel"));
        assert_eq!(matches[2].patient, None);
        assert_eq!(matches[2].doctor, None);
    }

    #[test]
    fn uniqueness_report_is_empty_for_service_written_data() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        seed(&ctx, false, Utc::now()).unwrap();
        assert!(verify_uniqueness(&ctx).unwrap().is_empty());
    }

    #[test]
    fn uniqueness_report_finds_hand_written_duplicates() {
        let ids = [RecordId::new(), RecordId::new()];
        let dups = duplicates(
            "users.username",
            ids.iter().map(|id| ("johndoe".to_string(), *id)),
        );
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].ids.len(), 2);
    }
}
