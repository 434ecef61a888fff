// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session identifiers.
//!
//! Identifiers are 256 bits drawn from the operating system CSPRNG (`OsRng`)
//! and rendered as 64 lowercase hex characters, which makes them safe to carry
//! as a cookie value without further encoding. They are unguessable by
//! entropy alone; nothing is signed or encrypted.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionError;
use crate::utils::{mask_sensitive, LOG_ID_PREFIX};

/// Random bytes per identifier (256 bits).
pub const SESSION_ID_BYTES: usize = 32;

/// Length of the hex rendering.
pub const SESSION_ID_LEN: usize = SESSION_ID_BYTES * 2;

/// Opaque session identifier, used both as registry key and cookie value.
///
/// Cheap to clone; handlers keep one of these rather than any reference into
/// the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier.
    ///
    /// # Panics
    ///
    /// Panics if the operating system random source fails. Continuing with a
    /// predictable identifier would hand out guessable sessions, so this is
    /// treated as unrecoverable. Use [`SessionId::try_generate`] to observe
    /// the failure instead.
    pub fn generate() -> Self {
        match Self::try_generate() {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    target: "quicksession::id",
                    event = "ENTROPY_FAILURE",
                    "CRITICAL: cannot draw session identifier entropy: {}",
                    e
                );
                panic!("session identifier entropy source failed: {e}");
            }
        }
    }

    /// Generate a fresh identifier, reporting entropy-source failure.
    pub fn try_generate() -> Result<Self, SessionError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Self(hex::encode(bytes)))
    }

    /// Wrap a value received from a client cookie.
    ///
    /// Any non-empty value is accepted; an unknown identifier simply has no
    /// record behind it.
    pub fn from_cookie_value(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// The text form carried in the cookie.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe rendering: only a short prefix is shown.
    pub fn masked(&self) -> String {
        mask_sensitive(&self.0, LOG_ID_PREFIX)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const UNIQUENESS_SAMPLE: usize = 10_000;

    #[test]
    fn test_generated_id_format() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), SESSION_ID_LEN);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<SessionId> = (0..UNIQUENESS_SAMPLE)
            .map(|_| SessionId::generate())
            .collect();
        assert_eq!(ids.len(), UNIQUENESS_SAMPLE, "identifier collision detected");
    }

    #[test]
    fn test_try_generate_succeeds() {
        let id = SessionId::try_generate().unwrap();
        assert_eq!(id.as_str().len(), SESSION_ID_LEN);
    }

    #[test]
    fn test_from_cookie_value() {
        assert!(SessionId::from_cookie_value("").is_none());
        let id = SessionId::from_cookie_value("abc123").unwrap();
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(id.to_string(), "abc123");
    }

    #[test]
    fn test_masked_hides_most_of_the_id() {
        let id = SessionId::generate();
        let masked = id.masked();
        assert_eq!(masked.len(), LOG_ID_PREFIX + 3);
        assert!(id.as_str().starts_with(masked.trim_end_matches("...")));

        // Short client-chosen values are not logged at all
        let short = SessionId::from_cookie_value("abc").unwrap();
        assert_eq!(short.masked(), "***");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = SessionId::from_cookie_value("deadbeef").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"deadbeef\"");
    }
}
