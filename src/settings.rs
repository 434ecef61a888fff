// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session store settings.
//!
//! Three knobs: the cookie name, the inactivity window stamped onto a record
//! on every `start`, and the period of the background sweep. Settings are
//! swapped as a whole value, so concurrent readers see either the old or the
//! new settings and never a mix. A change only affects later operations:
//! existing expirations are not re-stamped, and a new sweep interval is
//! picked up when the sweeper schedules its next pass.
//!
//! ## File format
//!
//! ```json
//! {
//!   "cookie_name": "SessionId",
//!   "expiration_secs": 43200,
//!   "sweep_interval_secs": 3600
//! }
//! ```
//!
//! Every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::SessionError;
use crate::registry::locks::{resilient_read, resilient_write};

/// Default cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "SessionId";

/// Default inactivity window: 12 hours.
pub const DEFAULT_EXPIRATION_SECS: i64 = 43_200;

/// Default sweep period: 1 hour.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Settings for a session registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Name of the cookie carrying the session identifier.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Seconds a session lives after its last `start`.
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: i64,

    /// Period between background sweeps.
    #[serde(
        default = "default_sweep_interval",
        rename = "sweep_interval_secs",
        with = "duration_secs"
    )]
    pub sweep_interval: Duration,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

fn default_expiration_secs() -> i64 {
    DEFAULT_EXPIRATION_SECS
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            expiration_secs: default_expiration_secs(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Expiry timestamp for a session started or refreshed at `now`.
    ///
    /// Saturates instead of overflowing, so a very large expiration window
    /// means "never expires" rather than "already expired".
    pub fn expiry_from(&self, now: i64) -> i64 {
        now.saturating_add(self.expiration_secs)
    }

    /// Check the values are usable.
    ///
    /// The cookie name must be a valid cookie token, the expiration window
    /// positive and the sweep interval non-zero.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.cookie_name.is_empty() {
            return Err(SessionError::Config("cookie name must not be empty".to_string()));
        }
        if let Some(c) = self.cookie_name.chars().find(|c| !is_cookie_token_char(*c)) {
            return Err(SessionError::Config(format!(
                "cookie name {:?} contains invalid character {:?}",
                self.cookie_name, c
            )));
        }
        if self.expiration_secs <= 0 {
            return Err(SessionError::Config(format!(
                "expiration must be positive, got {}s",
                self.expiration_secs
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(SessionError::Config("sweep interval must be non-zero".to_string()));
        }
        Ok(())
    }
}

// RFC 6265 token characters
fn is_cookie_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Atomically replaceable settings shared by a registry and its sweeper.
#[derive(Debug)]
pub(crate) struct SettingsCell {
    current: RwLock<Arc<Settings>>,
}

impl SettingsCell {
    pub(crate) fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Snapshot of the current settings.
    pub(crate) fn get(&self) -> Arc<Settings> {
        Arc::clone(&resilient_read(&self.current))
    }

    pub(crate) fn replace(&self, settings: Settings) {
        *resilient_write(&self.current) = Arc::new(settings);
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
