//! Services for each collection.
//!
//! Each service holds a [`CoreContext`](crate::CoreContext) and performs one operation per
//! method under a single store guard, publishing realtime events for patient, prescription
//! and appointment changes.

pub mod appointments;
pub mod doctors;
pub mod patients;
pub mod prescriptions;
pub mod shared;
pub mod users;

pub use appointments::AppointmentService;
pub use doctors::DoctorService;
pub use patients::PatientService;
pub use prescriptions::PrescriptionService;
pub use users::UserService;
