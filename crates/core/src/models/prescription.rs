use chrono::{DateTime, Utc};
use hms_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: RecordId,
    pub patient_id: RecordId,
    /// `None` when written by a non-doctor, or when the author could not be matched to a
    /// doctor. The backfill maintenance command repairs these.
    #[serde(default)]
    pub doctor_id: Option<RecordId>,
    #[serde(default)]
    pub file_url: Option<String>,
    /// Email or username of the account that wrote the prescription.
    #[serde(default)]
    pub uploaded_by: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}
