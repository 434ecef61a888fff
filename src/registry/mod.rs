// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session registry.
//!
//! - [`store`] - the concurrent identifier → record map and its field accessors
//! - [`binding`] - issue-or-resume cookie protocol (`start`, `start_secure`, `rotate`)
//! - [`sweeper`] - cancellable background expiry task
//! - [`handle`] - identifier-scoped convenience view
//! - [`locks`] - poison-tolerant lock acquisition
//!
//! ## Usage
//!
//! ```
//! use std::collections::HashMap;
//! use quicksession::{SessionCookie, SessionRegistry};
//!
//! let registry = SessionRegistry::new();
//! let request: HashMap<String, String> = HashMap::new();
//! let mut response: Vec<SessionCookie> = Vec::new();
//!
//! let id = registry.start(&request, &mut response);
//! registry.set_field(&id, "username", "alice");
//! assert_eq!(registry.get_field(&id, "username").unwrap().as_str(), Some("alice"));
//! ```

pub mod binding;
pub mod handle;
pub mod locks;
pub mod store;
pub mod sweeper;

pub use binding::{RequestCookies, ResponseCookies, SessionCookie};
pub use handle::Session;
pub use locks::{resilient_read, resilient_write};
pub use store::{global, SessionRecord, SessionRegistry, SessionStats};
pub use sweeper::Sweeper;
