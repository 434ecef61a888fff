// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! quicksession - In-process sessions for HTTP handlers
//!
//! Remember a browser across requests without a database.
//!
//! Each browser is bound to a record through a cookie carrying a random
//! 256-bit identifier. Records hold arbitrary named values, refresh their
//! lifetime on every visit and are evicted by a periodic sweep once expired.
//!
//! **Cookie** -> **Registry** -> **Record fields**
//!
//! # Core Modules
//!
//! - [`registry`] - Session map, cookie binding, field access and the background sweep
//! - [`id`] - Session identifier generation
//! - [`value`] - Values stored in a session
//! - [`settings`] - Cookie name, expiration and sweep interval
//! - [`http`] - axum `HeaderMap` / `Set-Cookie` adapters
//! - [`server`] - Demo HTTP application
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use quicksession::{SessionCookie, SessionRegistry};
//!
//! let registry = SessionRegistry::new();
//! let mut response: Vec<SessionCookie> = Vec::new();
//! let id = registry.start(&HashMap::<String, String>::new(), &mut response);
//!
//! registry.set_field(&id, "cart", vec![1u8, 2, 3]);
//! assert!(registry.get_field(&id, "cart").is_some());
//! assert_eq!(response[0].value, id.as_str());
//! ```

pub mod error;
pub mod http;
pub mod id;
pub mod registry;
pub mod server;
pub mod settings;
pub mod utils;
pub mod value;

pub use error::SessionError;
pub use id::{SessionId, SESSION_ID_BYTES, SESSION_ID_LEN};
pub use value::{SessionData, SessionValue};
pub use settings::{
    Settings, DEFAULT_COOKIE_NAME, DEFAULT_EXPIRATION_SECS, DEFAULT_SWEEP_INTERVAL,
};

// Re-export registry types
pub use registry::{
    global, RequestCookies, ResponseCookies, Session, SessionCookie, SessionRecord,
    SessionRegistry, SessionStats, Sweeper,
};

pub use http::CookieWriter;
pub use server::Server;
pub use utils::mask_sensitive;

/// Replace the process-wide registry's settings.
///
/// Applies to sessions started or refreshed afterwards, and to the sweeper's
/// next scheduled pass.
pub fn set_settings(settings: Settings) -> Result<(), SessionError> {
    global().set_settings(settings)
}

/// Current settings of the process-wide registry.
pub fn settings() -> std::sync::Arc<Settings> {
    global().settings()
}
