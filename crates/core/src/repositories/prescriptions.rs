use super::shared::blank_to_none;
use crate::auth::Actor;
use crate::events::{ChangeAction, EntityKind};
use crate::models::{Doctor, Prescription, PrescriptionView, Role};
use crate::store::Tables;
use crate::validation::{parse_reference, parse_timestamp, present};
use crate::{CoreContext, HmsError, HmsResult};
use api_shared::{PrescriptionPatchReq, PrescriptionReq};
use chrono::Utc;
use hms_uuid::RecordId;

#[derive(Clone, Debug)]
pub struct PrescriptionService {
    ctx: CoreContext,
}

impl PrescriptionService {
    pub fn new(ctx: CoreContext) -> Self {
        Self { ctx }
    }

    /// A patient's prescriptions, newest first.
    pub fn list_for_patient(&self, patient_id: RecordId) -> HmsResult<Vec<PrescriptionView>> {
        let tables = self.ctx.store().read()?;
        Ok(views_for_patient(&tables, patient_id))
    }

    /// Records a prescription written by `author` for a patient.
    ///
    /// When the author is a doctor the prescribing doctor record is resolved from the account
    /// (see [`resolve_prescribing_doctor`]). A non-blank `healthSummary` also replaces the
    /// patient's summary.
    pub fn add(
        &self,
        patient_id: RecordId,
        author: &Actor,
        req: &PrescriptionReq,
    ) -> HmsResult<PrescriptionView> {
        let mut tables = self.ctx.store().write()?;
        let mut patient = tables
            .patients
            .get(patient_id)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Patient"))?;

        let doctor_id = if author.role == Role::Doctor {
            resolve_prescribing_doctor(&tables, author).map(|d| d.id)
        } else {
            None
        };
        if author.role == Role::Doctor && doctor_id.is_none() {
            tracing::warn!(user_id = %author.user_id, "no doctor record matches prescribing account");
        }

        let prescription = Prescription {
            id: RecordId::new(),
            patient_id,
            doctor_id,
            file_url: present(&req.file_url).map(String::from),
            uploaded_by: author
                .email
                .clone()
                .or_else(|| author.username.clone()),
            date: Utc::now(),
            notes: present(&req.notes).map(String::from),
        };
        tables.prescriptions.put(prescription.clone())?;

        if let Some(summary) = present(&req.health_summary) {
            patient.health_summary = summary.to_string();
            if let Err(err) = tables.patients.put(patient) {
                if let Err(undo) = tables.prescriptions.remove(prescription.id) {
                    tracing::error!(
                        prescription_id = %prescription.id,
                        error = %undo,
                        "failed to roll back prescription"
                    );
                }
                return Err(err);
            }
        }

        let view = tables.prescription_view(&prescription);
        drop(tables);

        tracing::info!(prescription_id = %view.id, patient_id = %patient_id, "prescription added");
        self.ctx
            .events()
            .publish_change(EntityKind::Prescription, ChangeAction::Created, &view);
        Ok(view)
    }

    pub fn update(&self, id: RecordId, req: &PrescriptionPatchReq) -> HmsResult<PrescriptionView> {
        let date = present(&req.date)
            .map(|d| parse_timestamp(d, self.ctx.cfg().utc_offset()))
            .transpose()?;

        let mut tables = self.ctx.store().write()?;
        let mut prescription = tables
            .prescriptions
            .get(id)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Prescription"))?;

        if let Some(notes) = &req.notes {
            prescription.notes = blank_to_none(notes);
        }
        if let Some(file_url) = &req.file_url {
            prescription.file_url = blank_to_none(file_url);
        }
        if let Some(doctor) = &req.doctor_id {
            prescription.doctor_id = match blank_to_none(doctor) {
                None => None,
                Some(raw) => {
                    let doctor_id = parse_reference("doctor", &raw)?;
                    if !tables.doctors.contains(doctor_id) {
                        return Err(HmsError::InvalidInput("Doctor not found".into()));
                    }
                    Some(doctor_id)
                }
            };
        }
        if let Some(date) = date {
            prescription.date = date;
        }
        tables.prescriptions.put(prescription.clone())?;
        let view = tables.prescription_view(&prescription);
        drop(tables);

        tracing::info!(prescription_id = %id, "prescription updated");
        self.ctx
            .events()
            .publish_change(EntityKind::Prescription, ChangeAction::Updated, &view);
        Ok(view)
    }

    pub fn delete(&self, id: RecordId) -> HmsResult<()> {
        let removed = self.ctx.store().write()?.prescriptions.remove(id)?;
        if removed.is_some() {
            tracing::info!(prescription_id = %id, "prescription deleted");
            self.ctx.events().publish_deleted(EntityKind::Prescription, id);
        }
        Ok(())
    }
}

/// A patient's prescriptions as views, newest first.
pub(crate) fn views_for_patient(tables: &Tables, patient_id: RecordId) -> Vec<PrescriptionView> {
    let mut matching: Vec<&Prescription> = tables
        .prescriptions
        .iter()
        .filter(|p| p.patient_id == patient_id)
        .collect();
    matching.sort_by(|a, b| b.date.cmp(&a.date));
    matching
        .into_iter()
        .map(|p| tables.prescription_view(p))
        .collect()
}

/// Finds the doctor record for a prescribing doctor account.
///
/// Tried in order: the account's doctor link or exact name-slug match, a doctor sharing the
/// account's email, then a doctor whose whitespace-free name contains the username
/// (case-insensitive).
///
/// The last step compares against the slug, not the spaced full name, so a generated username
/// such as `dr.anjalibhatt` can still find `Dr. Anjali Bhatt`. A plain substring match on the
/// full name would never see that username inside it.
pub fn resolve_prescribing_doctor<'a>(tables: &'a Tables, author: &Actor) -> Option<&'a Doctor> {
    if let Some(doctor) = tables.linked_doctor(author) {
        return Some(doctor);
    }
    if let Some(email) = author.email.as_deref() {
        let email = email.to_lowercase();
        if let Some(doctor) = tables
            .doctors
            .find(|d| d.email.as_ref().is_some_and(|e| e.as_str() == email))
        {
            return Some(doctor);
        }
    }
    let username = author.username.as_deref()?.trim().to_lowercase();
    if username.is_empty() {
        return None;
    }
    tables
        .doctors
        .find(|d| d.full_name.username_slug().contains(&username))
}
