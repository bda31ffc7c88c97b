use super::DoctorSummary;
use chrono::{DateTime, Utc};
use hms_types::{EmailAddress, FullName, NonEmptyText};
use hms_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A period during which a doctor accepts appointments. `start` is always before `end`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[schema(value_type = String)]
    pub id: RecordId,
    /// Unique across doctors; the doctor's login username is derived from it.
    #[schema(value_type = String)]
    pub full_name: FullName,
    #[schema(value_type = String)]
    pub specialization: NonEmptyText,
    /// Years of practice.
    pub experience: u32,
    #[schema(value_type = String)]
    pub qualification: NonEmptyText,
    pub available_slots: Vec<Slot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub email: Option<EmailAddress>,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    pub fn summary(&self) -> DoctorSummary {
        DoctorSummary {
            id: self.id,
            full_name: self.full_name.to_string(),
            specialization: self.specialization.to_string(),
        }
    }
}
