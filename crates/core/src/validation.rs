//! Input validation shared by the services.
//!
//! Timestamps arrive from clients either as RFC 3339 strings or as naive local times from
//! `datetime-local` form inputs. Naive times are read in the hospital's configured offset.

use crate::models::Slot;
use crate::{HmsError, HmsResult};
use api_shared::SlotReq;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use hms_uuid::RecordId;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a client timestamp into UTC.
///
/// # Errors
///
/// Returns [`HmsError::InvalidInput`] if the input matches none of the accepted formats.
pub fn parse_timestamp(input: &str, offset: FixedOffset) -> HmsResult<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| HmsError::InvalidInput(format!("Invalid date format: {input}")))
}

/// Validates and converts a doctor's availability.
///
/// At least one slot is required, each with both ends present, parseable and ordered.
pub fn validate_slots(slots: &[SlotReq], offset: FixedOffset) -> HmsResult<Vec<Slot>> {
    if slots.is_empty() {
        return Err(HmsError::InvalidInput(
            "At least one available slot is required".into(),
        ));
    }

    slots
        .iter()
        .map(|slot| {
            let (start, end) = match (present(&slot.start), present(&slot.end)) {
                (Some(s), Some(e)) => (s, e),
                _ => {
                    return Err(HmsError::InvalidInput(
                        "Each slot must have start and end times".into(),
                    ))
                }
            };
            let bad_date = |_| HmsError::InvalidInput("Invalid date format for slots".into());
            let start = parse_timestamp(start, offset).map_err(bad_date)?;
            let end = parse_timestamp(end, offset).map_err(bad_date)?;
            if start >= end {
                return Err(HmsError::InvalidInput(
                    "Start time must be before end time".into(),
                ));
            }
            Ok(Slot { start, end })
        })
        .collect()
}

/// Parses a record id supplied in a request body, naming the field in the error.
pub fn parse_reference(field: &str, value: &str) -> HmsResult<RecordId> {
    RecordId::parse(value.trim())
        .map_err(|_| HmsError::InvalidInput(format!("Invalid {field} id: {value}")))
}

/// Returns the trimmed value when it is present and non-blank.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
