// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identifier-scoped view of a registry.

use crate::id::SessionId;
use crate::registry::binding::ResponseCookies;
use crate::registry::store::SessionRegistry;
use crate::value::{SessionData, SessionValue};

/// A session identifier paired with the registry that owns its record.
///
/// Holds no record data: every call goes back through the registry lock, so
/// concurrent handlers always see the latest state.
#[derive(Debug, Clone)]
pub struct Session<'a> {
    registry: &'a SessionRegistry,
    id: SessionId,
}

impl SessionRegistry {
    pub fn session(&self, id: &SessionId) -> Session<'_> {
        Session {
            registry: self,
            id: id.clone(),
        }
    }
}

impl<'a> Session<'a> {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn get(&self, name: &str) -> Option<SessionValue> {
        self.registry.get_field(&self.id, name)
    }

    pub fn get_all(&self) -> SessionData {
        self.registry.get_all_fields(&self.id)
    }

    /// No-op if the session has not been started.
    pub fn set(&self, name: impl Into<String>, value: impl Into<SessionValue>) {
        self.registry.set_field(&self.id, name, value);
    }

    pub fn remove(&self, name: &str) -> Option<SessionValue> {
        self.registry.delete_field(&self.id, name)
    }

    /// End the session and expire the client's cookie.
    pub fn destroy<R: ResponseCookies + ?Sized>(self, response: &mut R) {
        self.registry.destroy_session(&self.id, response);
    }
}
