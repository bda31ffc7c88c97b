//! Stored records and the populated views returned to clients.
//!
//! Records reference each other by [`RecordId`](hms_uuid::RecordId). Views embed short
//! summaries of the referenced records (the "populated" form clients render), with `None` for
//! references that no longer resolve.

mod appointment;
mod doctor;
mod patient;
mod prescription;
mod user;
mod views;

pub use appointment::{Appointment, AppointmentStatus};
pub use doctor::{Doctor, Slot};
pub use patient::Patient;
pub use prescription::Prescription;
pub use user::{Role, User, UserSummary};
pub use views::{AppointmentView, DoctorSummary, PatientSummary, PrescriptionView};
