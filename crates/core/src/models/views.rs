use super::AppointmentStatus;
use chrono::{DateTime, Utc};
use hms_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub full_name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub full_name: String,
    pub specialization: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = String)]
    pub doctor_id: RecordId,
    pub patient: Option<PatientSummary>,
    pub doctor: Option<DoctorSummary>,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionView {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub patient_id: RecordId,
    #[schema(value_type = Option<String>)]
    pub doctor_id: Option<RecordId>,
    pub patient: Option<PatientSummary>,
    pub doctor: Option<DoctorSummary>,
    pub file_url: Option<String>,
    pub uploaded_by: Option<String>,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}
