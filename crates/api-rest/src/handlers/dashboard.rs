//! One dashboard per role. Each rejects callers of any other role with 403.

use crate::error::ApiResult;
use crate::extract::Auth;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use hms_core::dashboard::{
    AdminDashboard, DoctorDashboard, PatientDashboard, ReceptionistDashboard,
};

#[utoipa::path(
    get,
    path = "/dashboard/patient",
    security(("bearer" = [])),
    responses((status = 200, description = "Patient dashboard", body = PatientDashboard))
)]
#[axum::debug_handler]
pub async fn patient(
    State(state): State<AppState>,
    Auth(actor): Auth,
) -> ApiResult<Json<PatientDashboard>> {
    Ok(Json(state.ctx.dashboard().patient(&actor, Utc::now())?))
}

#[utoipa::path(
    get,
    path = "/dashboard/doctor",
    security(("bearer" = [])),
    responses((status = 200, description = "Doctor dashboard", body = DoctorDashboard))
)]
#[axum::debug_handler]
pub async fn doctor(
    State(state): State<AppState>,
    Auth(actor): Auth,
) -> ApiResult<Json<DoctorDashboard>> {
    Ok(Json(state.ctx.dashboard().doctor(&actor, Utc::now())?))
}

#[utoipa::path(
    get,
    path = "/dashboard/receptionist",
    security(("bearer" = [])),
    responses((status = 200, description = "Receptionist dashboard with slot conflicts", body = ReceptionistDashboard))
)]
#[axum::debug_handler]
pub async fn receptionist(
    State(state): State<AppState>,
    Auth(actor): Auth,
) -> ApiResult<Json<ReceptionistDashboard>> {
    Ok(Json(
        state.ctx.dashboard().receptionist(&actor, Utc::now())?,
    ))
}

#[utoipa::path(
    get,
    path = "/dashboard/admin",
    security(("bearer" = [])),
    responses((status = 200, description = "Admin dashboard", body = AdminDashboard))
)]
#[axum::debug_handler]
pub async fn admin(
    State(state): State<AppState>,
    Auth(actor): Auth,
) -> ApiResult<Json<AdminDashboard>> {
    Ok(Json(state.ctx.dashboard().admin(&actor)?))
}
