use crate::dto::HealthRes;

/// Simple health service used by the REST API and the CLI.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Reports the service as up, stamped with the current UTC time (RFC 3339).
    pub fn check_health() -> HealthRes {
        HealthRes {
            status: "OK".into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
