//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into core services. Request
//! handling never reads process-wide environment variables, which keeps behaviour consistent
//! in multi-threaded runtimes and test harnesses.

use crate::constants::{
    APPOINTMENTS_DIR_NAME, DEFAULT_DATA_DIR, DEFAULT_JWT_SECRET, DEFAULT_PASSWORD_ITERATIONS,
    DEFAULT_TOKEN_TTL_HOURS, DOCTORS_DIR_NAME, PATIENTS_DIR_NAME, PRESCRIPTIONS_DIR_NAME,
    USERS_DIR_NAME,
};
use crate::{HmsError, HmsResult};
use chrono::{Duration, FixedOffset};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    jwt_secret: String,
    token_ttl: Duration,
    password_iterations: u32,
    utc_offset: FixedOffset,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`HmsError::InvalidInput`] if the secret is blank, the token lifetime is not
    /// positive, or the iteration count is zero.
    pub fn new(
        data_dir: PathBuf,
        jwt_secret: String,
        token_ttl: Duration,
        password_iterations: u32,
        utc_offset: FixedOffset,
    ) -> HmsResult<Self> {
        if jwt_secret.trim().is_empty() {
            return Err(HmsError::InvalidInput(
                "jwt secret cannot be empty".into(),
            ));
        }
        if token_ttl <= Duration::zero() {
            return Err(HmsError::InvalidInput(
                "token lifetime must be positive".into(),
            ));
        }
        if password_iterations == 0 {
            return Err(HmsError::InvalidInput(
                "password iterations must be at least 1".into(),
            ));
        }

        Ok(Self {
            data_dir,
            jwt_secret,
            token_ttl,
            password_iterations,
            utc_offset,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn doctors_dir(&self) -> PathBuf {
        self.data_dir.join(DOCTORS_DIR_NAME)
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn appointments_dir(&self) -> PathBuf {
        self.data_dir.join(APPOINTMENTS_DIR_NAME)
    }

    pub fn prescriptions_dir(&self) -> PathBuf {
        self.data_dir.join(PRESCRIPTIONS_DIR_NAME)
    }

    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join(USERS_DIR_NAME)
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn password_iterations(&self) -> u32 {
        self.password_iterations
    }

    /// Offset of hospital local time from UTC. Decides what "today" means.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the signing secret from an optional value, falling back to the built-in default.
pub fn jwt_secret_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string())
}

/// Parse the token lifetime in hours. `None` or blank gives the default of 24 hours.
pub fn token_ttl_from_env_value(value: Option<String>) -> HmsResult<Duration> {
    let hours = match non_blank(value) {
        Some(v) => v.parse::<i64>().map_err(|_| {
            HmsError::InvalidInput(format!("token lifetime must be a whole number of hours: {v}"))
        })?,
        None => DEFAULT_TOKEN_TTL_HOURS,
    };
    if !(1..=24 * 365).contains(&hours) {
        return Err(HmsError::InvalidInput(format!(
            "token lifetime out of range: {hours}h"
        )));
    }
    Ok(Duration::hours(hours))
}

/// Parse the PBKDF2 iteration count. `None` or blank gives the default.
pub fn password_iterations_from_env_value(value: Option<String>) -> HmsResult<u32> {
    match non_blank(value) {
        Some(v) => {
            let n = v.parse::<u32>().map_err(|_| {
                HmsError::InvalidInput(format!("password iterations must be a number: {v}"))
            })?;
            if n == 0 {
                return Err(HmsError::InvalidInput(
                    "password iterations must be at least 1".into(),
                ));
            }
            Ok(n)
        }
        None => Ok(DEFAULT_PASSWORD_ITERATIONS),
    }
}

/// Parse the hospital's UTC offset in minutes (for example `330` for UTC+05:30).
pub fn utc_offset_from_env_value(value: Option<String>) -> HmsResult<FixedOffset> {
    let minutes = match non_blank(value) {
        Some(v) => v.parse::<i32>().map_err(|_| {
            HmsError::InvalidInput(format!("utc offset must be a number of minutes: {v}"))
        })?,
        None => 0,
    };
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| HmsError::InvalidInput(format!("utc offset out of range: {minutes}")))
}

/// Parse the data directory. `None` or blank gives [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    PathBuf::from(non_blank(value).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()))
}

/// Resolve the full configuration from `HMS_*` variables via `lookup`.
///
/// Binaries pass `|k| std::env::var(k).ok()`; the data directory may be given explicitly, as
/// the CLI does with `--data-dir`.
pub fn resolve(
    data_dir: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> HmsResult<CoreConfig> {
    CoreConfig::new(
        data_dir.unwrap_or_else(|| data_dir_from_env_value(lookup("HMS_DATA_DIR"))),
        jwt_secret_from_env_value(lookup("HMS_JWT_SECRET")),
        token_ttl_from_env_value(lookup("HMS_TOKEN_TTL_HOURS"))?,
        password_iterations_from_env_value(lookup("HMS_PASSWORD_ITERATIONS"))?,
        utc_offset_from_env_value(lookup("HMS_UTC_OFFSET_MINUTES"))?,
    )
}
