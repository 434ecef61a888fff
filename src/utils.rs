// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Utility functions for quicksession.

/// Number of identifier characters that may appear in logs.
pub const LOG_ID_PREFIX: usize = 8;

/// Mask a sensitive string (like a session identifier) for logging.
///
/// Shows only the first `visible_prefix` characters and replaces the rest with "...".
/// Inputs no longer than the prefix would be shown whole, so they become a fixed
/// `"***"` placeholder instead.
/// A full session identifier is a bearer credential and must never reach the logs.
///
/// # Examples
///
/// ```
/// use quicksession::utils::mask_sensitive;
///
/// let id = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
/// assert_eq!(mask_sensitive(id, 8), "9f86d081...");
/// ```
pub fn mask_sensitive(input: &str, visible_prefix: usize) -> String {
    if input.chars().count() <= visible_prefix {
        return "***".to_string();
    }

    let prefix: String = input.chars().take(visible_prefix).collect();
    format!("{}...", prefix)
}

/// Current wall-clock time in whole seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
