// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session store errors.
//!
//! Ordinary misses (unknown identifier, absent field) are never errors in this
//! crate; they surface as `None` or an empty mapping. The variants here cover
//! the stricter accessors, settings validation and the entropy source.

use thiserror::Error;

/// Errors produced by the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A field write was attempted before the session was started.
    #[error("Session not started: {0}")]
    NotStarted(String),

    /// The operating system random source could not produce bytes.
    #[error("Entropy source failure: {0}")]
    Entropy(#[from] rand::Error),

    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings file: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SessionError::NotStarted("0123abcd...".to_string());
        assert_eq!(err.to_string(), "Session not started: 0123abcd...");

        let err = SessionError::Config("cookie name must not be empty".to_string());
        assert!(err.to_string().contains("cookie name"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: SessionError = parse.unwrap_err().into();
        assert!(matches!(err, SessionError::Json(_)));
    }
}
