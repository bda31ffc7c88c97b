use crate::events::{ChangeAction, EntityKind};
use crate::models::{Appointment, AppointmentStatus, AppointmentView};
use crate::scheduling::find_double_booking;
use crate::store::Tables;
use crate::validation::{parse_reference, parse_timestamp, present};
use crate::{CoreContext, HmsError, HmsResult};
use api_shared::AppointmentReq;
use chrono::{DateTime, Utc};
use hms_uuid::RecordId;

const PATIENT_MISSING: &str = "Patient not found in database. Please add patient first.";
const DOCTOR_MISSING: &str = "Doctor not found in database. Please add doctor first.";

#[derive(Clone, Debug)]
pub struct AppointmentService {
    ctx: CoreContext,
}

impl AppointmentService {
    pub fn new(ctx: CoreContext) -> Self {
        Self { ctx }
    }

    /// All appointments, earliest first.
    pub fn list(&self) -> HmsResult<Vec<AppointmentView>> {
        let tables = self.ctx.store().read()?;
        let mut appts: Vec<&Appointment> = tables.appointments.iter().collect();
        appts.sort_by_key(|a| a.datetime);
        Ok(appts.into_iter().map(|a| tables.appointment_view(a)).collect())
    }

    pub fn get(&self, id: RecordId) -> HmsResult<AppointmentView> {
        let tables = self.ctx.store().read()?;
        tables
            .appointments
            .get(id)
            .map(|a| tables.appointment_view(a))
            .ok_or_else(|| HmsError::not_found("Appointment"))
    }

    /// Books a patient with a doctor.
    ///
    /// The doctor must not already hold an occupying appointment at exactly the same instant.
    /// The check and the insert happen under one write guard.
    ///
    /// # Errors
    ///
    /// - [`HmsError::InvalidInput`] for missing fields, unknown patient or doctor, or an
    ///   unparseable datetime or status.
    /// - [`HmsError::AlreadyBooked`] when the slot is taken.
    pub fn book(&self, req: &AppointmentReq) -> HmsResult<AppointmentView> {
        let (Some(patient), Some(doctor), Some(datetime)) = (
            present(&req.patient),
            present(&req.doctor),
            present(&req.datetime),
        ) else {
            return Err(HmsError::InvalidInput(
                "Patient, doctor and datetime are required".into(),
            ));
        };
        let patient_id = parse_reference("patient", patient)?;
        let doctor_id = parse_reference("doctor", doctor)?;
        let datetime = parse_timestamp(datetime, self.ctx.cfg().utc_offset())?;
        let status = present(&req.status)
            .map(str::parse::<AppointmentStatus>)
            .transpose()?
            .unwrap_or_default();

        let mut tables = self.ctx.store().write()?;
        check_references(&tables, patient_id, doctor_id)?;
        if find_double_booking(tables.appointments.iter(), doctor_id, datetime, None).is_some() {
            tracing::warn!(doctor_id = %doctor_id, %datetime, "double booking rejected");
            return Err(HmsError::AlreadyBooked);
        }

        let appt = Appointment {
            id: RecordId::new(),
            patient_id,
            doctor_id,
            datetime,
            status,
            created_at: Utc::now(),
        };
        tables.appointments.put(appt.clone())?;
        let view = tables.appointment_view(&appt);
        drop(tables);

        tracing::info!(appointment_id = %appt.id, doctor_id = %doctor_id, "appointment booked");
        self.ctx
            .events()
            .publish_change(EntityKind::Appointment, ChangeAction::Created, &view);
        Ok(view)
    }

    /// Applies the fields present in `req`.
    ///
    /// When the result occupies a slot and the doctor or time changed, or a cancelled
    /// appointment is reinstated, the double-booking check runs again, ignoring the
    /// appointment itself.
    pub fn update(&self, id: RecordId, req: &AppointmentReq) -> HmsResult<AppointmentView> {
        let patient_id = present(&req.patient)
            .map(|p| parse_reference("patient", p))
            .transpose()?;
        let doctor_id = present(&req.doctor)
            .map(|d| parse_reference("doctor", d))
            .transpose()?;
        let datetime: Option<DateTime<Utc>> = present(&req.datetime)
            .map(|d| parse_timestamp(d, self.ctx.cfg().utc_offset()))
            .transpose()?;
        let status = present(&req.status)
            .map(str::parse::<AppointmentStatus>)
            .transpose()?;

        let mut tables = self.ctx.store().write()?;
        let before = tables
            .appointments
            .get(id)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Appointment"))?;

        let mut after = before.clone();
        after.patient_id = patient_id.unwrap_or(before.patient_id);
        after.doctor_id = doctor_id.unwrap_or(before.doctor_id);
        after.datetime = datetime.unwrap_or(before.datetime);
        after.status = status.unwrap_or(before.status);
        check_references(&tables, after.patient_id, after.doctor_id)?;

        let slot_changed = after.doctor_id != before.doctor_id || after.datetime != before.datetime;
        let reinstated = !before.occupies_slot();
        if after.occupies_slot()
            && (slot_changed || reinstated)
            && find_double_booking(
                tables.appointments.iter(),
                after.doctor_id,
                after.datetime,
                Some(id),
            )
            .is_some()
        {
            tracing::warn!(appointment_id = %id, "double booking rejected on update");
            return Err(HmsError::AlreadyBooked);
        }

        tables.appointments.put(after.clone())?;
        let view = tables.appointment_view(&after);
        drop(tables);

        tracing::info!(appointment_id = %id, status = %after.status, "appointment updated");
        self.ctx
            .events()
            .publish_change(EntityKind::Appointment, ChangeAction::Updated, &view);
        Ok(view)
    }

    pub fn delete(&self, id: RecordId) -> HmsResult<()> {
        let removed = self.ctx.store().write()?.appointments.remove(id)?;
        if removed.is_some() {
            tracing::info!(appointment_id = %id, "appointment deleted");
            self.ctx.events().publish_deleted(EntityKind::Appointment, id);
        }
        Ok(())
    }
}

fn check_references(tables: &Tables, patient_id: RecordId, doctor_id: RecordId) -> HmsResult<()> {
    if !tables.patients.contains(patient_id) {
        return Err(HmsError::InvalidInput(PATIENT_MISSING.into()));
    }
    if !tables.doctors.contains(doctor_id) {
        return Err(HmsError::InvalidInput(DOCTOR_MISSING.into()));
    }
    Ok(())
}
