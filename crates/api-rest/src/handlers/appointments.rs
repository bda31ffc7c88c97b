use crate::error::ApiResult;
use crate::extract::{record_id, ApiJson, Auth};
use crate::AppState;
use api_shared::{AppointmentReq, ErrorRes, MessageRes};
use axum::extract::{Path, State};
use axum::Json;
use hms_core::models::{AppointmentView, Role};

#[utoipa::path(
    get,
    path = "/appointments",
    security(("bearer" = [])),
    responses((status = 200, description = "All appointments, earliest first", body = Vec<AppointmentView>))
)]
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    _auth: Auth,
) -> ApiResult<Json<Vec<AppointmentView>>> {
    Ok(Json(state.ctx.appointments().list()?))
}

#[utoipa::path(
    post,
    path = "/appointments",
    request_body = AppointmentReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Appointment booked", body = AppointmentView),
        (status = 400, description = "Invalid booking or doctor already booked", body = ErrorRes)
    )
)]
/// Book an appointment.
///
/// Returns 400 with "Doctor is already booked for this time slot" when the doctor already has
/// a non-cancelled appointment at exactly this instant.
#[axum::debug_handler]
pub async fn book(
    State(state): State<AppState>,
    auth: Auth,
    ApiJson(req): ApiJson<AppointmentReq>,
) -> ApiResult<Json<AppointmentView>> {
    auth.require_any(&[Role::Admin, Role::Receptionist])?;
    let appt = state
        .run_blocking(move |ctx| ctx.appointments().book(&req))
        .await?;
    Ok(Json(appt))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = AppointmentReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentView),
        (status = 400, description = "Invalid change or doctor already booked", body = ErrorRes),
        (status = 404, description = "Appointment not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AppointmentReq>,
) -> ApiResult<Json<AppointmentView>> {
    auth.require_any(&[Role::Admin, Role::Receptionist, Role::Doctor])?;
    let id = record_id(&id)?;
    let appt = state
        .run_blocking(move |ctx| ctx.appointments().update(id, &req))
        .await?;
    Ok(Json(appt))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Appointment deleted", body = MessageRes))
)]
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageRes>> {
    auth.require_any(&[Role::Admin, Role::Receptionist])?;
    let id = record_id(&id)?;
    state
        .run_blocking(move |ctx| ctx.appointments().delete(id))
        .await?;
    Ok(Json(MessageRes::new("Appointment deleted successfully")))
}
