//! Helpers shared by the collection services.

use crate::auth::{generate_password, hash_password};
use crate::models::{Role, User};
use crate::store::Tables;
use crate::{HmsError, HmsResult};
use api_shared::CredentialsRes;
use chrono::Utc;
use hms_types::FullName;
use hms_uuid::RecordId;

/// A freshly generated password and its hash, prepared before the store lock is taken.
pub(crate) struct GeneratedPassword {
    pub clear: String,
    pub hash: String,
}

impl GeneratedPassword {
    pub fn new(iterations: u32) -> Self {
        let clear = generate_password();
        let hash = hash_password(&clear, iterations);
        Self { clear, hash }
    }
}

/// Creates the login account for a doctor or patient record.
///
/// The username is the record name's slug. Only one account may exist per slug; a second
/// request fails with `Credentials already generated for this <entity>.`
pub(crate) fn provision_account(
    tables: &mut Tables,
    name: &FullName,
    role: Role,
    linked: RecordId,
    password: GeneratedPassword,
) -> HmsResult<CredentialsRes> {
    let username = name.username_slug();
    if tables.user_by_username(&username).is_some() {
        return Err(HmsError::Conflict(format!(
            "Credentials already generated for this {}.",
            role
        )));
    }

    let user = User {
        id: RecordId::new(),
        username: Some(username.clone()),
        email: None,
        password_hash: password.hash,
        role,
        doctor_id: (role == Role::Doctor).then_some(linked),
        patient_id: (role == Role::Patient).then_some(linked),
        created_at: Utc::now(),
    };
    tables.users.put(user.clone())?;
    tracing::info!(user_id = %user.id, %role, %username, "credentials generated");

    Ok(CredentialsRes {
        username,
        password: password.clear,
    })
}

/// `Some(trimmed)` for a non-blank value, `None` for a blank one.
pub(crate) fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
