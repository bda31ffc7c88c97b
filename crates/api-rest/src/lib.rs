//! # API REST
//!
//! REST API implementation for the hospital management service.
//!
//! Handles:
//! - HTTP endpoints with axum, guarded by bearer tokens and per-route roles
//! - The `/ws` realtime event stream
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON errors, CORS, request tracing)
//!
//! Business rules live in `hms-core`; handlers only authenticate, check roles and translate.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod handlers;
pub mod ws;

use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::Router;
use handlers::{appointments, auth, dashboard, doctors, patients};
use hms_core::{CoreContext, HmsResult};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, ApiResult};

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: CoreContext,
}

impl AppState {
    pub fn new(ctx: CoreContext) -> Self {
        Self { ctx }
    }

    /// Runs a core operation on the blocking pool.
    ///
    /// Used for anything that hashes a password or writes records, so those never hold up a
    /// runtime worker. Reads of the in-memory tables stay on the calling task.
    pub async fn run_blocking<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&CoreContext) -> HmsResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = self.ctx.clone();
        tokio::task::spawn_blocking(move || op(&ctx))
            .await
            .map_err(|err| ApiError::internal(anyhow::anyhow!("task join error: {err}")))?
            .map_err(ApiError::from)
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        auth::login,
        auth::register,
        auth::generated_doctor_usernames,
        auth::generated_patient_usernames,
        doctors::list,
        doctors::create,
        doctors::update,
        doctors::delete,
        doctors::generate_credentials,
        patients::list,
        patients::create,
        patients::my_data,
        patients::get,
        patients::update,
        patients::delete,
        patients::generate_credentials,
        patients::list_prescriptions,
        patients::add_prescription,
        patients::update_prescription,
        patients::delete_prescription,
        appointments::list,
        appointments::book,
        appointments::update,
        appointments::delete,
        dashboard::patient,
        dashboard::doctor,
        dashboard::receptionist,
        dashboard::admin,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::MessageRes,
        api_shared::LoginReq,
        api_shared::LoginRes,
        api_shared::SessionUser,
        api_shared::RegisterReq,
        api_shared::RegisterRes,
        api_shared::RegisteredUser,
        api_shared::CredentialsRes,
        api_shared::SlotReq,
        api_shared::DoctorReq,
        api_shared::PatientReq,
        api_shared::PrescriptionReq,
        api_shared::PrescriptionPatchReq,
        api_shared::AppointmentReq,
        hms_core::models::Slot,
        hms_core::models::Doctor,
        hms_core::models::Patient,
        hms_core::models::Role,
        hms_core::models::AppointmentStatus,
        hms_core::models::UserSummary,
        hms_core::models::PatientSummary,
        hms_core::models::DoctorSummary,
        hms_core::models::AppointmentView,
        hms_core::models::PrescriptionView,
        hms_core::scheduling::ConflictWarning,
        hms_core::events::HospitalEvent,
        hms_core::dashboard::PatientDashboard,
        hms_core::dashboard::DoctorDashboard,
        hms_core::dashboard::ReceptionistDashboard,
        hms_core::dashboard::AdminMetrics,
        hms_core::dashboard::AdminDashboard,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Builds the full application: API routes, `/ws`, Swagger UI, CORS and request tracing.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route(
            "/auth/generated-doctor-usernames",
            get(auth::generated_doctor_usernames),
        )
        .route(
            "/auth/generated-patient-usernames",
            get(auth::generated_patient_usernames),
        )
        .route("/doctors", get(doctors::list).post(doctors::create))
        .route("/doctors/:id", put(doctors::update).delete(doctors::delete))
        .route(
            "/doctors/:id/generate-credentials",
            post(doctors::generate_credentials),
        )
        .route("/patients", get(patients::list).post(patients::create))
        .route("/patients/my-data", get(patients::my_data))
        .route(
            "/patients/prescriptions/:id",
            put(patients::update_prescription).delete(patients::delete_prescription),
        )
        .route(
            "/patients/:id",
            get(patients::get)
                .put(patients::update)
                .delete(patients::delete),
        )
        .route(
            "/patients/:id/prescriptions",
            get(patients::list_prescriptions).post(patients::add_prescription),
        )
        .route(
            "/patients/:id/generate-credentials",
            post(patients::generate_credentials),
        )
        .route(
            "/appointments",
            get(appointments::list).post(appointments::book),
        )
        .route(
            "/appointments/:id",
            put(appointments::update).delete(appointments::delete),
        )
        .route("/dashboard/patient", get(dashboard::patient))
        .route("/dashboard/doctor", get(dashboard::doctor))
        .route("/dashboard/receptionist", get(dashboard::receptionist))
        .route("/dashboard/admin", get(dashboard::admin))
        .route("/ws", get(ws::upgrade))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse `HMS_CORS_ORIGINS`: a comma-separated origin list. `None` or blank gives permissive
/// CORS.
pub fn cors_layer_from_env_value(value: Option<String>) -> anyhow::Result<CorsLayer> {
    let origins: Vec<String> = value
        .unwrap_or_default()
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|_| anyhow::anyhow!("invalid CORS origin: {o}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use hms_core::{CoreConfig, HmsError};
    use std::sync::Arc;

    fn state(dir: &std::path::Path) -> AppState {
        let cfg = CoreConfig::new(
            dir.to_path_buf(),
            "lib-secret".into(),
            chrono::Duration::hours(1),
            1_000,
            chrono::FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap();
        AppState::new(CoreContext::open(Arc::new(cfg)).unwrap())
    }

    #[tokio::test]
    async fn blocking_ops_keep_core_errors_and_map_panics_to_500() {
        let tmp = tempfile::TempDir::new().unwrap();
        let state = state(tmp.path());

        let doctors = state
            .run_blocking(|ctx| ctx.doctors().list())
            .await
            .unwrap();
        assert!(doctors.is_empty());

        let err = state
            .run_blocking(|_| Err::<(), _>(HmsError::not_found("Doctor")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = state
            .run_blocking(|_| -> HmsResult<()> { panic!("worker died") })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn cors_origins_parse_or_fail() {
        assert!(cors_layer_from_env_value(None).is_ok());
        assert!(cors_layer_from_env_value(Some(" , ".into())).is_ok());
        assert!(
            cors_layer_from_env_value(Some("http://localhost:3000, https://hms.example".into()))
                .is_ok()
        );
        assert!(cors_layer_from_env_value(Some("bad\norigin".into())).is_err());
    }

    #[test]
    fn openapi_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/login",
            "/doctors/{id}",
            "/patients/my-data",
            "/patients/prescriptions/{id}",
            "/appointments/{id}",
            "/dashboard/admin",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
