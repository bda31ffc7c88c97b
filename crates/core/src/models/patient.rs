use super::PatientSummary;
use chrono::{DateTime, Utc};
use hms_types::{EmailAddress, FullName};
use hms_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[schema(value_type = String)]
    pub id: RecordId,
    /// Unique across patients; the patient's login username is derived from it.
    #[schema(value_type = String)]
    pub full_name: FullName,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub email: Option<EmailAddress>,
    /// Free-text notes maintained by doctors.
    #[serde(default)]
    pub health_summary: String,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            id: self.id,
            full_name: self.full_name.to_string(),
            age: self.age,
            gender: self.gender.clone(),
        }
    }
}
