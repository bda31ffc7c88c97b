use super::shared::{provision_account, GeneratedPassword};
use crate::models::{Doctor, Role, Slot};
use crate::validation::{present, validate_slots};
use crate::{CoreContext, HmsError, HmsResult};
use api_shared::{CredentialsRes, DoctorReq};
use chrono::{FixedOffset, Utc};
use hms_types::{EmailAddress, FullName, NonEmptyText};
use hms_uuid::RecordId;

/// Validated doctor fields, shared by create and update.
struct DoctorFields {
    full_name: FullName,
    specialization: NonEmptyText,
    experience: u32,
    qualification: NonEmptyText,
    available_slots: Vec<Slot>,
    email: Option<EmailAddress>,
}

impl DoctorFields {
    fn validate(req: &DoctorReq, offset: FixedOffset) -> HmsResult<Self> {
        let all_required = || HmsError::InvalidInput("All fields are required".into());

        let full_name = present(&req.full_name).ok_or_else(all_required)?;
        let specialization = present(&req.specialization).ok_or_else(all_required)?;
        let qualification = present(&req.qualification).ok_or_else(all_required)?;
        let experience = req.experience.filter(|e| *e > 0).ok_or_else(all_required)?;
        let available_slots = validate_slots(req.available_slots.as_deref().unwrap_or(&[]), offset)?;
        let email = present(&req.email).map(EmailAddress::parse).transpose()?;

        Ok(Self {
            full_name: FullName::new(full_name)?,
            specialization: NonEmptyText::new(specialization)?,
            experience,
            qualification: NonEmptyText::new(qualification)?,
            available_slots,
            email,
        })
    }
}

#[derive(Clone, Debug)]
pub struct DoctorService {
    ctx: CoreContext,
}

impl DoctorService {
    pub fn new(ctx: CoreContext) -> Self {
        Self { ctx }
    }

    /// All doctors ordered by full name.
    pub fn list(&self) -> HmsResult<Vec<Doctor>> {
        let tables = self.ctx.store().read()?;
        let mut doctors: Vec<Doctor> = tables.doctors.iter().cloned().collect();
        doctors.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(doctors)
    }

    pub fn get(&self, id: RecordId) -> HmsResult<Doctor> {
        let tables = self.ctx.store().read()?;
        tables
            .doctors
            .get(id)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Doctor"))
    }

    pub fn create(&self, req: &DoctorReq) -> HmsResult<Doctor> {
        let fields = DoctorFields::validate(req, self.ctx.cfg().utc_offset())?;

        let mut tables = self.ctx.store().write()?;
        if tables.doctor_by_name(&fields.full_name).is_some() {
            return Err(duplicate_name(&fields.full_name));
        }
        let doctor = Doctor {
            id: RecordId::new(),
            full_name: fields.full_name,
            specialization: fields.specialization,
            experience: fields.experience,
            qualification: fields.qualification,
            available_slots: fields.available_slots,
            email: fields.email,
            created_at: Utc::now(),
        };
        tables.doctors.put(doctor.clone())?;
        tracing::info!(doctor_id = %doctor.id, "doctor created");
        Ok(doctor)
    }

    /// Replaces every editable field of a doctor. The same validation as
    /// [`DoctorService::create`] applies.
    pub fn update(&self, id: RecordId, req: &DoctorReq) -> HmsResult<Doctor> {
        let fields = DoctorFields::validate(req, self.ctx.cfg().utc_offset())?;

        let mut tables = self.ctx.store().write()?;
        let mut doctor = tables
            .doctors
            .get(id)
            .cloned()
            .ok_or_else(|| HmsError::not_found("Doctor"))?;
        if tables
            .doctor_by_name(&fields.full_name)
            .is_some_and(|other| other.id != id)
        {
            return Err(duplicate_name(&fields.full_name));
        }

        doctor.full_name = fields.full_name;
        doctor.specialization = fields.specialization;
        doctor.experience = fields.experience;
        doctor.qualification = fields.qualification;
        doctor.available_slots = fields.available_slots;
        doctor.email = fields.email;
        tables.doctors.put(doctor.clone())?;
        tracing::info!(doctor_id = %id, "doctor updated");
        Ok(doctor)
    }

    /// Removes a doctor. Removing an unknown id succeeds without effect.
    pub fn delete(&self, id: RecordId) -> HmsResult<()> {
        let mut tables = self.ctx.store().write()?;
        if tables.doctors.remove(id)?.is_some() {
            tracing::info!(doctor_id = %id, "doctor deleted");
        }
        Ok(())
    }

    /// Creates the doctor's login account and returns its one-time clear password.
    pub fn generate_credentials(&self, id: RecordId) -> HmsResult<CredentialsRes> {
        let password = GeneratedPassword::new(self.ctx.cfg().password_iterations());

        let mut tables = self.ctx.store().write()?;
        let name = tables
            .doctors
            .get(id)
            .map(|d| d.full_name.clone())
            .ok_or_else(|| HmsError::not_found("Doctor"))?;
        provision_account(&mut tables, &name, Role::Doctor, id, password)
    }
}

fn duplicate_name(name: &FullName) -> HmsError {
    HmsError::Conflict(format!("A doctor named {name} already exists"))
}
