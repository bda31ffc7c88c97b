//! Constants used throughout the core crate.
//!
//! Storage directory names, defaults and fixed limits live here so the store, config and
//! maintenance code agree on them.

/// Default directory for hospital data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "hospital_data";

/// Collection directory for doctor records.
pub const DOCTORS_DIR_NAME: &str = "doctors";

/// Collection directory for patient records.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Collection directory for appointment records.
pub const APPOINTMENTS_DIR_NAME: &str = "appointments";

/// Collection directory for prescription records.
pub const PRESCRIPTIONS_DIR_NAME: &str = "prescriptions";

/// Collection directory for user accounts.
pub const USERS_DIR_NAME: &str = "users";

/// Filename of the JSON document inside each record directory.
pub const RECORD_JSON_FILENAME: &str = "record.json";

/// Signing secret used when none is configured. Startup logs a warning when it is in effect.
pub const DEFAULT_JWT_SECRET: &str = "supersecretkey";

/// Default bearer-token lifetime.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Default PBKDF2-HMAC-SHA256 rounds for password hashes.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;

/// Number of rows returned in each table of the admin dashboard.
pub const ADMIN_DASHBOARD_LIMIT: usize = 20;

/// Message attached to every same-slot conflict warning.
pub const SLOT_CONFLICT_MESSAGE: &str = "Multiple patients booked for same slot.";

/// Capacity of the realtime event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
