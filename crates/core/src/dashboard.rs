//! Role-specific dashboard payloads.

use crate::auth::Actor;
use crate::constants::ADMIN_DASHBOARD_LIMIT;
use crate::models::{
    Appointment, AppointmentStatus, AppointmentView, Doctor, Patient, PrescriptionView, Role,
    User, UserSummary,
};
use crate::repositories::prescriptions::views_for_patient;
use crate::scheduling::{detect_slot_conflicts, is_same_local_day, local_day_bounds, ConflictWarning};
use crate::store::Tables;
use crate::{CoreContext, HmsError, HmsResult};
use chrono::{DateTime, Utc};
use hms_uuid::RecordId;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDashboard {
    pub patient: Patient,
    pub upcoming_appointments: Vec<AppointmentView>,
    pub past_appointments: Vec<AppointmentView>,
    pub prescriptions: Vec<PrescriptionView>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDashboard {
    pub doctor: Doctor,
    /// Today's scheduled appointments.
    pub appointments: Vec<AppointmentView>,
    pub upcoming_appointments: Vec<AppointmentView>,
    pub completed_appointments: Vec<AppointmentView>,
    pub assigned_patients: Vec<Patient>,
    pub prescriptions: Vec<PrescriptionView>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionistDashboard {
    pub appointments: Vec<AppointmentView>,
    pub doctors: Vec<Doctor>,
    pub patients: Vec<Patient>,
    pub conflict_warnings: Vec<ConflictWarning>,
}

#[derive(Clone, Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminMetrics {
    pub total_appointments: usize,
    pub total_patients: usize,
    pub total_doctors: usize,
    pub active_receptionists: usize,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub metrics: AdminMetrics,
    pub users: Vec<UserSummary>,
    /// Always empty; kept for client compatibility.
    #[schema(value_type = Vec<Object>)]
    pub logs: Vec<Value>,
    /// Always empty; kept for client compatibility.
    #[schema(value_type = Object)]
    pub config: Map<String, Value>,
    pub appointments: Vec<AppointmentView>,
    pub patients: Vec<Patient>,
    pub doctors: Vec<Doctor>,
}

#[derive(Clone, Debug)]
pub struct DashboardService {
    ctx: CoreContext,
}

impl DashboardService {
    pub fn new(ctx: CoreContext) -> Self {
        Self { ctx }
    }

    pub fn patient(&self, actor: &Actor, now: DateTime<Utc>) -> HmsResult<PatientDashboard> {
        actor.require_any(&[Role::Patient])?;
        let tables = self.ctx.store().read()?;
        let patient = tables
            .linked_patient(actor)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Patient"))?;

        let appts = ascending(&tables, |a| a.patient_id == patient.id);
        let upcoming_appointments = views(
            &tables,
            appts
                .iter()
                .filter(|a| a.datetime >= now && a.status == AppointmentStatus::Scheduled),
        );
        let past_appointments = views(
            &tables,
            appts
                .iter()
                .filter(|a| a.datetime < now || a.status == AppointmentStatus::Completed),
        );
        let prescriptions = views_for_patient(&tables, patient.id);

        Ok(PatientDashboard {
            patient,
            upcoming_appointments,
            past_appointments,
            prescriptions,
        })
    }

    pub fn doctor(&self, actor: &Actor, now: DateTime<Utc>) -> HmsResult<DoctorDashboard> {
        actor.require_any(&[Role::Doctor])?;
        let offset = self.ctx.cfg().utc_offset();
        let tables = self.ctx.store().read()?;
        let doctor = tables
            .linked_doctor(actor)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Doctor"))?;

        let appts = ascending(&tables, |a| a.doctor_id == doctor.id);
        let scheduled = |a: &&&Appointment| a.status == AppointmentStatus::Scheduled;
        let today = views(
            &tables,
            appts
                .iter()
                .filter(scheduled)
                .filter(|a| is_same_local_day(a.datetime, now, offset)),
        );
        let upcoming_appointments = views(
            &tables,
            appts.iter().filter(scheduled).filter(|a| a.datetime > now),
        );
        let completed_appointments = views(
            &tables,
            appts
                .iter()
                .filter(|a| a.status == AppointmentStatus::Completed),
        );

        let patient_ids: BTreeSet<RecordId> = appts.iter().map(|a| a.patient_id).collect();
        let assigned_patients = patient_ids
            .into_iter()
            .filter_map(|id| tables.patients.get(id).cloned())
            .collect();

        let mut written: Vec<_> = tables
            .prescriptions
            .iter()
            .filter(|p| p.doctor_id == Some(doctor.id))
            .collect();
        written.sort_by(|a, b| b.date.cmp(&a.date));
        let prescriptions = written
            .into_iter()
            .map(|p| tables.prescription_view(p))
            .collect();

        Ok(DoctorDashboard {
            doctor,
            appointments: today,
            upcoming_appointments,
            completed_appointments,
            assigned_patients,
            prescriptions,
        })
    }

    pub fn receptionist(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> HmsResult<ReceptionistDashboard> {
        actor.require_any(&[Role::Receptionist])?;
        let offset = self.ctx.cfg().utc_offset();
        let (start, end) = local_day_bounds(now, offset);
        let tables = self.ctx.store().read()?;

        let today = ascending(&tables, |a| a.datetime >= start && a.datetime < end);
        let conflict_warnings = detect_slot_conflicts(
            &today,
            |id| tables.doctors.get(id).map(|d| d.full_name.to_string()),
            offset,
        );

        Ok(ReceptionistDashboard {
            appointments: views(&tables, today.iter()),
            doctors: tables.doctors.iter().cloned().collect(),
            patients: tables.patients.iter().cloned().collect(),
            conflict_warnings,
        })
    }

    pub fn admin(&self, actor: &Actor) -> HmsResult<AdminDashboard> {
        actor.require_any(&[Role::Admin])?;
        let tables = self.ctx.store().read()?;

        let metrics = AdminMetrics {
            total_appointments: tables.appointments.len(),
            total_patients: tables.patients.len(),
            total_doctors: tables.doctors.len(),
            active_receptionists: tables.count_role(Role::Receptionist),
        };

        let mut appts: Vec<&Appointment> = tables.appointments.iter().collect();
        appts.sort_by(|a, b| b.datetime.cmp(&a.datetime));
        appts.truncate(ADMIN_DASHBOARD_LIMIT);

        Ok(AdminDashboard {
            metrics,
            users: newest(tables.users.iter(), |u: &User| u.created_at)
                .map(User::summary)
                .collect(),
            logs: Vec::new(),
            config: Map::new(),
            appointments: views(&tables, appts.iter()),
            patients: newest(tables.patients.iter(), |p: &Patient| p.created_at)
                .cloned()
                .collect(),
            doctors: newest(tables.doctors.iter(), |d: &Doctor| d.created_at)
                .cloned()
                .collect(),
        })
    }
}

/// Appointments matching `pred`, earliest first.
fn ascending<'a>(tables: &'a Tables, pred: impl Fn(&Appointment) -> bool) -> Vec<&'a Appointment> {
    let mut appts: Vec<&Appointment> = tables.appointments.iter().filter(|a| pred(*a)).collect();
    appts.sort_by_key(|a| a.datetime);
    appts
}

fn views<'a, 'b: 'a>(
    tables: &Tables,
    appts: impl Iterator<Item = &'a &'b Appointment>,
) -> Vec<AppointmentView> {
    appts.map(|a| tables.appointment_view(a)).collect()
}

/// The newest [`ADMIN_DASHBOARD_LIMIT`] rows by creation time.
fn newest<'a, T: 'a>(
    rows: impl Iterator<Item = &'a T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> impl Iterator<Item = &'a T> {
    let mut rows: Vec<&T> = rows.collect();
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows.into_iter().take(ADMIN_DASHBOARD_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, context, doctor_req, patient_req};
    use api_shared::AppointmentReq;
    use chrono::Duration;
    use tempfile::TempDir;

    fn book(ctx: &CoreContext, patient: RecordId, doctor: RecordId, at: DateTime<Utc>) -> RecordId {
        ctx.appointments()
            .book(&AppointmentReq {
                patient: Some(patient.to_string()),
                doctor: Some(doctor.to_string()),
                datetime: Some(at.to_rfc3339()),
                status: None,
            })
            .unwrap()
            .id
    }

    fn set_status(ctx: &CoreContext, id: RecordId, status: &str) {
        ctx.appointments()
            .update(
                id,
                &AppointmentReq {
                    status: Some(status.into()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    fn noon() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn patient_dashboard_splits_upcoming_and_past() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        let doctor = ctx.doctors().create(&doctor_req("Dr. Patel")).unwrap().id;
        let john = ctx.patients().create(&patient_req("John Doe")).unwrap().id;
        let now = noon();

        let future = book(&ctx, john, doctor, now + Duration::days(1));
        let past = book(&ctx, john, doctor, now - Duration::days(1));
        let done_future = book(&ctx, john, doctor, now + Duration::days(2));
        set_status(&ctx, done_future, "Completed");

        let who = actor(&ctx, Role::Patient, Some("johndoe"), None);
        let dash = ctx.dashboard().patient(&who, now).unwrap();
        assert_eq!(dash.patient.id, john);
        assert_eq!(
            dash.upcoming_appointments.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![future]
        );
        assert_eq!(
            dash.past_appointments.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![past, done_future]
        );

        let wrong_role = actor(&ctx, Role::Doctor, Some("johndoe"), None);
        assert!(matches!(
            ctx.dashboard().patient(&wrong_role, now),
            Err(HmsError::Forbidden(_))
        ));
    }

    #[test]
    fn doctor_dashboard_collects_today_upcoming_and_patients() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        let doctor = ctx.doctors().create(&doctor_req("Dr. Patel")).unwrap().id;
        let john = ctx.patients().create(&patient_req("John Doe")).unwrap().id;
        let jane = ctx.patients().create(&patient_req("Jane Smith")).unwrap().id;
        let now = noon();

        let later_today = book(&ctx, john, doctor, now + Duration::hours(2));
        let tomorrow = book(&ctx, jane, doctor, now + Duration::days(1));
        let yesterday = book(&ctx, john, doctor, now - Duration::days(1));
        set_status(&ctx, yesterday, "Completed");

        let who = actor(&ctx, Role::Doctor, Some("dr.patel"), None);
        let dash = ctx.dashboard().doctor(&who, now).unwrap();
        assert_eq!(dash.doctor.id, doctor);
        assert_eq!(
            dash.appointments.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![later_today]
        );
        assert_eq!(
            dash.upcoming_appointments.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![later_today, tomorrow]
        );
        assert_eq!(dash.completed_appointments.len(), 1);
        assert_eq!(dash.assigned_patients.len(), 2);
    }

    #[test]
    fn receptionist_dashboard_flags_same_slot_bookings() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        let doctor = ctx.doctors().create(&doctor_req("Dr. Patel")).unwrap().id;
        let john = ctx.patients().create(&patient_req("John Doe")).unwrap().id;
        let jane = ctx.patients().create(&patient_req("Jane Smith")).unwrap().id;
        let now = noon();

        // Same HH:MM, different seconds: not a double booking, but a slot conflict.
        book(&ctx, john, doctor, now + Duration::hours(1));
        book(&ctx, jane, doctor, now + Duration::hours(1) + Duration::seconds(20));
        book(&ctx, jane, doctor, now + Duration::days(1));

        let who = actor(&ctx, Role::Receptionist, None, Some("reception1@hms.com"));
        let dash = ctx.dashboard().receptionist(&who, now).unwrap();
        assert_eq!(dash.appointments.len(), 2);
        assert_eq!(dash.conflict_warnings.len(), 1);
        assert_eq!(dash.conflict_warnings[0].time, "13:00");
        assert_eq!(dash.conflict_warnings[0].doctor, "Dr. Patel");
    }

    #[test]
    fn admin_dashboard_counts_and_hides_hashes() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path());
        ctx.doctors().create(&doctor_req("Dr. Patel")).unwrap();
        let who = actor(&ctx, Role::Admin, None, Some("admin2@hms.com"));
        actor(&ctx, Role::Receptionist, None, Some("reception1@hms.com"));

        let dash = ctx.dashboard().admin(&who).unwrap();
        assert_eq!(
            dash.metrics,
            AdminMetrics {
                total_appointments: 0,
                total_patients: 0,
                total_doctors: 1,
                active_receptionists: 1,
            }
        );
        let json = serde_json::to_value(&dash).unwrap();
        assert_eq!(json["logs"], serde_json::json!([]));
        assert_eq!(json["config"], serde_json::json!({}));
        assert!(json["users"][0].get("passwordHash").is_none());
        assert_eq!(json["metrics"]["activeReceptionists"], 1);
    }
}
