//! Request extractors: bearer-token authentication, JSON bodies and record ids.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::bearer_token;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use hms_core::auth::Actor;
use hms_core::models::Role;
use hms_core::{HmsError, RecordId};

/// The authenticated caller, taken from `Authorization: Bearer <token>`.
pub struct Auth(pub Actor);

impl Auth {
    /// Rejects callers whose role is not listed with 403.
    pub fn require_any(&self, roles: &[Role]) -> Result<&Actor, ApiError> {
        self.0.require_any(roles)?;
        Ok(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| HmsError::Unauthenticated("No token provided".into()))?;
        let actor = state.ctx.users().authenticate(token)?;
        Ok(Auth(actor))
    }
}

/// `axum::Json` whose rejections render as the API's error body.
#[derive(axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

pub fn record_id(raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|e| HmsError::from(e).into())
}
