//! # HMS Core
//!
//! Core business logic for the hospital management service.
//!
//! This crate owns the data and the rules:
//! - Doctor, patient, appointment, prescription and user records in a sharded JSON store
//!   under `HMS_DATA_DIR`
//! - Password hashing and bearer tokens
//! - Double-booking and same-slot conflict rules
//! - Role dashboards and the realtime event hub
//! - Maintenance routines used by the `hms` CLI
//!
//! **No API concerns**: HTTP routing, extractors and status codes belong in `api-rest`.

pub mod auth;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod maintenance;
pub mod models;
pub mod repositories;
pub mod scheduling;
pub mod store;
pub mod validation;

pub use api_shared;
pub use config::CoreConfig;
pub use error::{HmsError, HmsResult};
pub use hms_types::{EmailAddress, FullName, NonEmptyText, TextError};
pub use hms_uuid::RecordId;

use auth::TokenSigner;
use dashboard::DashboardService;
use events::EventHub;
use repositories::{
    AppointmentService, DoctorService, PatientService, PrescriptionService, UserService,
};
use std::sync::Arc;
use store::HospitalStore;

/// Shared handles every service works through. Cheap to clone.
#[derive(Clone, Debug)]
pub struct CoreContext {
    cfg: Arc<CoreConfig>,
    store: Arc<HospitalStore>,
    signer: TokenSigner,
    events: EventHub,
}

impl CoreContext {
    /// Opens the store under the configured data directory and prepares the token signer.
    pub fn open(cfg: Arc<CoreConfig>) -> HmsResult<Self> {
        let store = HospitalStore::open(&cfg)?;
        let signer = TokenSigner::from_config(&cfg);
        Ok(Self {
            cfg,
            store: Arc::new(store),
            signer,
            events: EventHub::new(),
        })
    }

    pub fn cfg(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &HospitalStore {
        &self.store
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.clone())
    }

    pub fn doctors(&self) -> DoctorService {
        DoctorService::new(self.clone())
    }

    pub fn patients(&self) -> PatientService {
        PatientService::new(self.clone())
    }

    pub fn prescriptions(&self) -> PrescriptionService {
        PrescriptionService::new(self.clone())
    }

    pub fn appointments(&self) -> AppointmentService {
        AppointmentService::new(self.clone())
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.clone())
    }
}
