use crate::error::ApiResult;
use crate::extract::{record_id, ApiJson, Auth};
use crate::AppState;
use api_shared::{CredentialsRes, DoctorReq, ErrorRes};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hms_core::models::{Doctor, Role};

const STAFF: &[Role] = &[Role::Admin, Role::Receptionist];

#[utoipa::path(
    get,
    path = "/doctors",
    security(("bearer" = [])),
    responses((status = 200, description = "All doctors by name", body = Vec<Doctor>))
)]
#[axum::debug_handler]
pub async fn list(State(state): State<AppState>, _auth: Auth) -> ApiResult<Json<Vec<Doctor>>> {
    Ok(Json(state.ctx.doctors().list()?))
}

#[utoipa::path(
    post,
    path = "/doctors",
    request_body = DoctorReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Doctor created", body = Doctor),
        (status = 400, description = "Validation failed", body = ErrorRes),
        (status = 409, description = "Name already used", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    auth: Auth,
    ApiJson(req): ApiJson<DoctorReq>,
) -> ApiResult<Json<Doctor>> {
    auth.require_any(STAFF)?;
    let doctor = state
        .run_blocking(move |ctx| ctx.doctors().create(&req))
        .await?;
    Ok(Json(doctor))
}

#[utoipa::path(
    put,
    path = "/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    request_body = DoctorReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Doctor replaced", body = Doctor),
        (status = 400, description = "Validation failed", body = ErrorRes),
        (status = 404, description = "Doctor not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<DoctorReq>,
) -> ApiResult<Json<Doctor>> {
    auth.require_any(STAFF)?;
    let id = record_id(&id)?;
    let doctor = state
        .run_blocking(move |ctx| ctx.doctors().update(id, &req))
        .await?;
    Ok(Json(doctor))
}

#[utoipa::path(
    delete,
    path = "/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    security(("bearer" = [])),
    responses((status = 204, description = "Doctor removed, or was already absent"))
)]
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_any(STAFF)?;
    let id = record_id(&id)?;
    state
        .run_blocking(move |ctx| ctx.doctors().delete(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/doctors/{id}/generate-credentials",
    params(("id" = String, Path, description = "Doctor id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Login created; the password is shown only once", body = CredentialsRes),
        (status = 404, description = "Doctor not found", body = ErrorRes),
        (status = 409, description = "Credentials already generated", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn generate_credentials(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<CredentialsRes>> {
    auth.require_any(&[Role::Admin])?;
    let id = record_id(&id)?;
    let creds = state
        .run_blocking(move |ctx| ctx.doctors().generate_credentials(id))
        .await?;
    Ok(Json(creds))
}
