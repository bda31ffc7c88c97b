use crate::error::ApiResult;
use crate::extract::{ApiJson, Auth};
use crate::AppState;
use api_shared::{ErrorRes, LoginReq, LoginRes, RegisterReq, RegisterRes};
use axum::extract::State;
use axum::Json;
use hms_core::models::Role;
use std::collections::BTreeMap;

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Token and session user", body = LoginRes),
        (status = 400, description = "Missing fields", body = ErrorRes),
        (status = 401, description = "Invalid credentials", body = ErrorRes)
    )
)]
/// Exchange a username or email plus password for a bearer token.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginReq>,
) -> ApiResult<Json<LoginRes>> {
    let res = state.run_blocking(move |ctx| ctx.users().login(&req)).await?;
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User registered", body = RegisterRes),
        (status = 400, description = "Missing fields or invalid role", body = ErrorRes),
        (status = 409, description = "User already exists", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    auth: Auth,
    ApiJson(req): ApiJson<RegisterReq>,
) -> ApiResult<Json<RegisterRes>> {
    auth.require_any(&[Role::Admin])?;
    let res = state
        .run_blocking(move |ctx| ctx.users().register(&req))
        .await?;
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/auth/generated-doctor-usernames",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Doctor ids that already have a login", body = BTreeMap<String, bool>)
    )
)]
#[axum::debug_handler]
pub async fn generated_doctor_usernames(
    State(state): State<AppState>,
    auth: Auth,
) -> ApiResult<Json<BTreeMap<String, bool>>> {
    auth.require_any(&[Role::Admin])?;
    Ok(Json(state.ctx.users().generated_doctor_credentials()?))
}

#[utoipa::path(
    get,
    path = "/auth/generated-patient-usernames",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patient ids that already have a login", body = BTreeMap<String, bool>)
    )
)]
#[axum::debug_handler]
pub async fn generated_patient_usernames(
    State(state): State<AppState>,
    auth: Auth,
) -> ApiResult<Json<BTreeMap<String, bool>>> {
    auth.require_any(&[Role::Receptionist, Role::Admin])?;
    Ok(Json(state.ctx.users().generated_patient_credentials()?))
}
