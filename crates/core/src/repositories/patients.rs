use super::shared::{blank_to_none, provision_account, GeneratedPassword};
use crate::auth::Actor;
use crate::events::{ChangeAction, EntityKind};
use crate::models::{Patient, Role};
use crate::validation::present;
use crate::{CoreContext, HmsError, HmsResult};
use api_shared::{CredentialsRes, PatientReq};
use chrono::Utc;
use hms_types::{EmailAddress, FullName};
use hms_uuid::RecordId;

#[derive(Clone, Debug)]
pub struct PatientService {
    ctx: CoreContext,
}

impl PatientService {
    pub fn new(ctx: CoreContext) -> Self {
        Self { ctx }
    }

    /// All patients ordered by full name.
    pub fn list(&self) -> HmsResult<Vec<Patient>> {
        let tables = self.ctx.store().read()?;
        let mut patients: Vec<Patient> = tables.patients.iter().cloned().collect();
        patients.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(patients)
    }

    pub fn get(&self, id: RecordId) -> HmsResult<Patient> {
        let tables = self.ctx.store().read()?;
        tables
            .patients
            .get(id)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Patient"))
    }

    pub fn create(&self, req: &PatientReq) -> HmsResult<Patient> {
        let full_name = present(&req.full_name)
            .ok_or_else(|| HmsError::InvalidInput("Full name is required".into()))?;
        let full_name = FullName::new(full_name)?;
        let email = present(&req.email).map(EmailAddress::parse).transpose()?;

        let mut tables = self.ctx.store().write()?;
        if tables.patient_by_name(&full_name).is_some() {
            return Err(duplicate_name(&full_name));
        }
        let patient = Patient {
            id: RecordId::new(),
            full_name,
            age: req.age,
            gender: req.gender.as_deref().and_then(blank_to_none),
            email,
            health_summary: req.health_summary.clone().unwrap_or_default(),
            created_at: Utc::now(),
        };
        tables.patients.put(patient.clone())?;
        drop(tables);

        tracing::info!(patient_id = %patient.id, "patient created");
        self.ctx
            .events()
            .publish_change(EntityKind::Patient, ChangeAction::Created, &patient);
        Ok(patient)
    }

    /// Applies the fields present in `req`, leaving the rest unchanged.
    ///
    /// Blank `gender` or `email` clear the stored value; a blank `fullName` is rejected.
    pub fn update(&self, id: RecordId, req: &PatientReq) -> HmsResult<Patient> {
        let full_name = req
            .full_name
            .as_deref()
            .map(FullName::new)
            .transpose()?;
        let email = req
            .email
            .as_deref()
            .and_then(blank_to_none)
            .map(EmailAddress::parse)
            .transpose()?;

        let mut tables = self.ctx.store().write()?;
        let mut patient = tables
            .patients
            .get(id)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Patient"))?;

        if let Some(name) = full_name {
            if tables
                .patient_by_name(&name)
                .is_some_and(|other| other.id != id)
            {
                return Err(duplicate_name(&name));
            }
            patient.full_name = name;
        }
        if let Some(age) = req.age {
            patient.age = Some(age);
        }
        if let Some(gender) = &req.gender {
            patient.gender = blank_to_none(gender);
        }
        if req.email.is_some() {
            patient.email = email;
        }
        if let Some(summary) = &req.health_summary {
            patient.health_summary = summary.clone();
        }
        tables.patients.put(patient.clone())?;
        drop(tables);

        tracing::info!(patient_id = %id, "patient updated");
        self.ctx
            .events()
            .publish_change(EntityKind::Patient, ChangeAction::Updated, &patient);
        Ok(patient)
    }

    pub fn delete(&self, id: RecordId) -> HmsResult<()> {
        let removed = self.ctx.store().write()?.patients.remove(id)?;
        if removed.is_some() {
            tracing::info!(patient_id = %id, "patient deleted");
            self.ctx.events().publish_deleted(EntityKind::Patient, id);
        }
        Ok(())
    }

    /// The patient record belonging to a patient account.
    pub fn my_record(&self, actor: &Actor) -> HmsResult<Patient> {
        let tables = self.ctx.store().read()?;
        tables
            .linked_patient(actor)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Patient"))
    }

    /// Creates the patient's login account and returns its one-time clear password.
    pub fn generate_credentials(&self, id: RecordId) -> HmsResult<CredentialsRes> {
        let password = GeneratedPassword::new(self.ctx.cfg().password_iterations());

        let mut tables = self.ctx.store().write()?;
        let name = tables
            .patients
            .get(id)
            .map(|p| p.full_name.clone())
            .ok_or_else(|| HmsError::not_found("Patient"))?;
        provision_account(&mut tables, &name, Role::Patient, id, password)
    }
}

fn duplicate_name(name: &FullName) -> HmsError {
    HmsError::Conflict(format!("A patient named {name} already exists"))
}
