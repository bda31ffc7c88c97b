//! Scheduling rules: double booking and same-slot conflicts.

use crate::constants::SLOT_CONFLICT_MESSAGE;
use crate::models::Appointment;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use hms_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Finds an appointment that already holds `doctor_id` at exactly `instant`.
///
/// Only occupying appointments (scheduled or completed) count. `exclude` skips the appointment
/// being edited.
pub fn find_double_booking<'a>(
    appointments: impl IntoIterator<Item = &'a Appointment>,
    doctor_id: RecordId,
    instant: DateTime<Utc>,
    exclude: Option<RecordId>,
) -> Option<&'a Appointment> {
    appointments.into_iter().find(|a| {
        a.doctor_id == doctor_id
            && a.datetime == instant
            && a.occupies_slot()
            && Some(a.id) != exclude
    })
}

/// Start (inclusive) and end (exclusive) of the local day containing `now`, in UTC.
pub fn local_day_bounds(now: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_date = now.with_timezone(&offset).date_naive();
    let midnight = local_date.and_hms_opt(0, 0, 0).unwrap_or_default();
    // Fixed offsets have no gaps, so the local midnight always exists.
    let start = offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);
    (start, start + Duration::days(1))
}

pub fn is_same_local_day(a: DateTime<Utc>, b: DateTime<Utc>, offset: FixedOffset) -> bool {
    a.with_timezone(&offset).date_naive() == b.with_timezone(&offset).date_naive()
}

/// `HH:MM` of `instant` in the hospital's local time.
pub fn slot_label(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant.with_timezone(&offset).format("%H:%M").to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ConflictWarning {
    pub time: String,
    /// Full name of the double-booked doctor, or their id when the record is gone.
    pub doctor: String,
    pub message: String,
}

/// Flags doctors holding more than one appointment in the same local `HH:MM` slot.
///
/// `appointments` should already be limited to the day of interest. Appointments are walked
/// in datetime order; every one after the first in a (time, doctor) group produces a warning.
/// All statuses are considered.
pub fn detect_slot_conflicts(
    appointments: &[&Appointment],
    doctor_name: impl Fn(RecordId) -> Option<String>,
    offset: FixedOffset,
) -> Vec<ConflictWarning> {
    let mut ordered: Vec<&Appointment> = appointments.to_vec();
    ordered.sort_by_key(|a| a.datetime);

    let mut seen: HashMap<(String, RecordId), usize> = HashMap::new();
    let mut warnings = Vec::new();
    for appt in ordered {
        let time = slot_label(appt.datetime, offset);
        let count = seen.entry((time.clone(), appt.doctor_id)).or_insert(0);
        *count += 1;
        if *count > 1 {
            let doctor =
                doctor_name(appt.doctor_id).unwrap_or_else(|| appt.doctor_id.to_string());
            warnings.push(ConflictWarning {
                time,
                doctor,
                message: SLOT_CONFLICT_MESSAGE.to_string(),
            });
        }
    }
    warnings
}
