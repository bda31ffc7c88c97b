use crate::{HmsError, HmsResult};
use chrono::{DateTime, Utc};
use hms_types::EmailAddress;
use hms_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Receptionist,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Patient, Role::Doctor, Role::Receptionist, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = HmsError;

    fn from_str(s: &str) -> HmsResult<Self> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| HmsError::InvalidInput("Invalid role".into()))
    }
}

/// A login account.
///
/// Staff accounts are registered by email. Doctor and patient accounts are provisioned with a
/// username derived from the linked record's name.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<EmailAddress>,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub doctor_id: Option<RecordId>,
    #[serde(default)]
    pub patient_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.as_ref().map(|e| e.to_string()),
            role: self.role,
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            created_at: self.created_at,
        }
    }
}

/// A user account without its password hash.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
    #[schema(value_type = Option<String>)]
    pub patient_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn summary_omits_password_hash() {
        let user = User {
            id: RecordId::new(),
            username: Some("johndoe".into()),
            email: None,
            password_hash: "secret-hash".into(),
            role: Role::Patient,
            doctor_id: None,
            patient_id: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user.summary()).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"patient\""));
    }
}
