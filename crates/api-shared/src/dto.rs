//! Wire types for the hospital REST API.
//!
//! Request bodies keep every field optional so the core can answer missing fields with the
//! same validation messages clients already display, instead of a generic deserialisation
//! failure. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct HealthRes {
    pub status: String,
    pub timestamp: String,
}

/// Body of every error response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

impl MessageRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginReq {
    /// Treated as an email when it contains `@`, otherwise as a username.
    pub username_or_email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SessionUser {
    pub email: Option<String>,
    pub role: String,
    pub username: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisteredUser {
    pub email: String,
    pub role: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRes {
    pub message: String,
    pub user: RegisteredUser,
}

/// Login generated for a doctor or patient. The password is only ever returned here.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CredentialsRes {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SlotReq {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorReq {
    pub full_name: Option<String>,
    pub specialization: Option<String>,
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    pub experience: Option<u32>,
    pub qualification: Option<String>,
    pub available_slots: Option<Vec<SlotReq>>,
    pub email: Option<String>,
}

/// Create body for `POST /patients` and partial update body for `PUT /patients/{id}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientReq {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub health_summary: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionReq {
    pub notes: Option<String>,
    /// When present and non-empty, also replaces the patient's health summary.
    pub health_summary: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionPatchReq {
    pub notes: Option<String>,
    pub file_url: Option<String>,
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

/// Create body for `POST /appointments` and partial update body for `PUT /appointments/{id}`.
///
/// `patient` and `doctor` are record ids. `datetime` is RFC 3339, or a local
/// `YYYY-MM-DDTHH:MM[:SS]` interpreted in hospital time.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AppointmentReq {
    pub patient: Option<String>,
    pub doctor: Option<String>,
    pub datetime: Option<String>,
    pub status: Option<String>,
}

/// Reads a whole number sent either as a JSON number or as the string value of a form input.
///
/// `null` and blank strings read as absent.
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct NumberOrString;

    impl<'de> de::Visitor<'de> for NumberOrString {
        type Value = Option<u32>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a non-negative whole number or a string holding one")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            u32::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u32::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<u32>()
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(NumberOrString)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_req_reads_camel_case() {
        let req: LoginReq =
            serde_json::from_str(r#"{"usernameOrEmail":"johndoe","password":"pw"}"#).unwrap();
        assert_eq!(req.username_or_email.as_deref(), Some("johndoe"));
        assert_eq!(req.password.as_deref(), Some("pw"));
    }

    #[test]
    fn doctor_req_tolerates_missing_fields() {
        let req: DoctorReq = serde_json::from_str(r#"{"fullName":"Dr. Patel"}"#).unwrap();
        assert_eq!(req.full_name.as_deref(), Some("Dr. Patel"));
        assert!(req.available_slots.is_none());
        assert!(req.experience.is_none());
    }

    #[test]
    fn numeric_fields_accept_form_strings() {
        let req: DoctorReq =
            serde_json::from_str(r#"{"fullName":"Dr. Patel","experience":"10"}"#).unwrap();
        assert_eq!(req.experience, Some(10));

        let req: DoctorReq = serde_json::from_str(r#"{"experience":12}"#).unwrap();
        assert_eq!(req.experience, Some(12));

        let req: PatientReq =
            serde_json::from_str(r#"{"fullName":"John Doe","age":" 32 "}"#).unwrap();
        assert_eq!(req.age, Some(32));
    }

    #[test]
    fn blank_or_null_numbers_read_as_absent() {
        let req: DoctorReq = serde_json::from_str(r#"{"experience":""}"#).unwrap();
        assert!(req.experience.is_none());

        let req: PatientReq = serde_json::from_str(r#"{"age":null}"#).unwrap();
        assert!(req.age.is_none());
    }

    #[test]
    fn non_numeric_or_negative_numbers_are_rejected() {
        assert!(serde_json::from_str::<DoctorReq>(r#"{"experience":"ten"}"#).is_err());
        assert!(serde_json::from_str::<PatientReq>(r#"{"age":-3}"#).is_err());
        assert!(serde_json::from_str::<PatientReq>(r#"{"age":"4.5"}"#).is_err());
    }
}
