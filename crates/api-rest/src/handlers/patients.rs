//! Patient records and their prescriptions.

use crate::error::ApiResult;
use crate::extract::{record_id, ApiJson, Auth};
use crate::AppState;
use api_shared::{
    CredentialsRes, ErrorRes, MessageRes, PatientReq, PrescriptionPatchReq, PrescriptionReq,
};
use axum::extract::{Path, State};
use axum::Json;
use hms_core::models::{Patient, PrescriptionView, Role};

const CLINICAL: &[Role] = &[Role::Admin, Role::Receptionist, Role::Doctor];
const FRONT_DESK: &[Role] = &[Role::Admin, Role::Receptionist];

#[utoipa::path(
    get,
    path = "/patients",
    security(("bearer" = [])),
    responses((status = 200, description = "All patients by name", body = Vec<Patient>))
)]
#[axum::debug_handler]
pub async fn list(State(state): State<AppState>, auth: Auth) -> ApiResult<Json<Vec<Patient>>> {
    auth.require_any(CLINICAL)?;
    Ok(Json(state.ctx.patients().list()?))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patient created", body = Patient),
        (status = 400, description = "Full name is required", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    auth: Auth,
    ApiJson(req): ApiJson<PatientReq>,
) -> ApiResult<Json<Patient>> {
    auth.require_any(FRONT_DESK)?;
    let patient = state
        .run_blocking(move |ctx| ctx.patients().create(&req))
        .await?;
    Ok(Json(patient))
}

#[utoipa::path(
    get,
    path = "/patients/my-data",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's own record, as a one-element array", body = Vec<Patient>),
        (status = 404, description = "No record linked to this account", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn my_data(State(state): State<AppState>, auth: Auth) -> ApiResult<Json<Vec<Patient>>> {
    let actor = auth.require_any(&[Role::Patient])?;
    Ok(Json(vec![state.ctx.patients().my_record(actor)?]))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    auth.require_any(CLINICAL)?;
    Ok(Json(state.ctx.patients().get(record_id(&id)?)?))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PatientReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PatientReq>,
) -> ApiResult<Json<Patient>> {
    auth.require_any(CLINICAL)?;
    let id = record_id(&id)?;
    let patient = state
        .run_blocking(move |ctx| ctx.patients().update(id, &req))
        .await?;
    Ok(Json(patient))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Patient deleted", body = MessageRes))
)]
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageRes>> {
    auth.require_any(&[Role::Admin])?;
    let id = record_id(&id)?;
    state
        .run_blocking(move |ctx| ctx.patients().delete(id))
        .await?;
    Ok(Json(MessageRes::new("Patient deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/generate-credentials",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Login created; the password is shown only once", body = CredentialsRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "Credentials already generated", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn generate_credentials(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<CredentialsRes>> {
    auth.require_any(&[Role::Receptionist, Role::Admin])?;
    let id = record_id(&id)?;
    let creds = state
        .run_blocking(move |ctx| ctx.patients().generate_credentials(id))
        .await?;
    Ok(Json(creds))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/prescriptions",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Prescriptions, newest first", body = Vec<PrescriptionView>))
)]
#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<AppState>,
    _auth: Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<PrescriptionView>>> {
    Ok(Json(
        state.ctx.prescriptions().list_for_patient(record_id(&id)?)?,
    ))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/prescriptions",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PrescriptionReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Prescription added", body = PrescriptionView),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn add_prescription(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PrescriptionReq>,
) -> ApiResult<Json<PrescriptionView>> {
    let author = auth.require_any(CLINICAL)?.clone();
    let id = record_id(&id)?;
    let rx = state
        .run_blocking(move |ctx| ctx.prescriptions().add(id, &author, &req))
        .await?;
    Ok(Json(rx))
}

#[utoipa::path(
    put,
    path = "/patients/prescriptions/{id}",
    params(("id" = String, Path, description = "Prescription id")),
    request_body = PrescriptionPatchReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Prescription updated", body = PrescriptionView),
        (status = 404, description = "Prescription not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_prescription(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PrescriptionPatchReq>,
) -> ApiResult<Json<PrescriptionView>> {
    auth.require_any(CLINICAL)?;
    let id = record_id(&id)?;
    let rx = state
        .run_blocking(move |ctx| ctx.prescriptions().update(id, &req))
        .await?;
    Ok(Json(rx))
}

#[utoipa::path(
    delete,
    path = "/patients/prescriptions/{id}",
    params(("id" = String, Path, description = "Prescription id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Prescription deleted", body = MessageRes))
)]
#[axum::debug_handler]
pub async fn delete_prescription(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageRes>> {
    auth.require_any(CLINICAL)?;
    let id = record_id(&id)?;
    state
        .run_blocking(move |ctx| ctx.prescriptions().delete(id))
        .await?;
    Ok(Json(MessageRes::new("Prescription deleted successfully")))
}
