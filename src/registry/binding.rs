// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Binding a request to a session.
//!
//! The transport is reached through two small capabilities: read a named
//! cookie from the request ([`RequestCookies`]) and queue a cookie on the
//! response ([`ResponseCookies`]). Adapters for axum header maps live in
//! [`crate::http`]; `HashMap` and `Vec` implementations make the protocol easy
//! to drive without any HTTP types.
//!
//! Cookies issued here are session cookies (no Max-Age). The record's
//! `expires_at` is what actually ends a session.

use std::collections::HashMap;

use crate::id::SessionId;
use crate::registry::store::SessionRegistry;
use crate::settings::Settings;
use crate::utils::unix_now;

/// Read access to the cookies sent with a request.
///
/// Implementations return `None` for a missing or unparseable cookie; the
/// binding protocol treats both as "no session yet".
pub trait RequestCookies {
    fn cookie(&self, name: &str) -> Option<String>;
}

/// Write access to the cookies of a response.
pub trait ResponseCookies {
    fn set_cookie(&mut self, cookie: SessionCookie);
}

/// A cookie the session layer wants the transport to set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// `None` for a browser-session cookie, negative to delete immediately.
    pub max_age: Option<i64>,
}

impl SessionCookie {
    /// Session-lifetime cookie carrying `id`.
    pub fn issue(name: &str, id: &SessionId) -> Self {
        Self {
            name: name.to_string(),
            value: id.to_string(),
            max_age: None,
        }
    }

    /// Cookie instructing the client to drop `name` right away.
    pub fn expire(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            max_age: Some(-1),
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self.max_age, Some(age) if age < 0)
    }
}

impl RequestCookies for HashMap<String, String> {
    fn cookie(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl ResponseCookies for Vec<SessionCookie> {
    fn set_cookie(&mut self, cookie: SessionCookie) {
        self.push(cookie);
    }
}

impl SessionRegistry {
    /// Start (or resume) the session for a request.
    ///
    /// Uses the identifier from the configured cookie when the request has
    /// one; otherwise mints a new identifier and sets the cookie. The record
    /// is created empty if missing, and its expiry is pushed to now + TTL.
    /// Call this at the top of every handler that uses the session.
    pub fn start<Q, R>(&self, request: &Q, response: &mut R) -> SessionId
    where
        Q: RequestCookies + ?Sized,
        R: ResponseCookies + ?Sized,
    {
        let settings = self.settings();
        let id = match incoming_id(&settings, request) {
            Some(id) => id,
            None => issue(&settings, response),
        };

        let resumed = self.ensure(&id, settings.expiry_from(unix_now()));
        tracing::debug!(session = %id.masked(), resumed, "Session started");
        id
    }

    /// Like [`start`](Self::start), but a resumed session is always rotated.
    ///
    /// When a record already exists for the incoming identifier, that record
    /// is destroyed and a fresh, empty one is created under a newly issued
    /// identifier. A first visit behaves exactly like `start`.
    ///
    /// Rotation happens on every resumed call, not only after a privilege
    /// change, so any data stored in the session lasts a single request.
    /// Use [`rotate`](Self::rotate) to change the identifier once while
    /// keeping the data (e.g. right after login).
    ///
    /// Two calls racing on the same resumed cookie do not share a single
    /// winner: the one that rotates second finds no record under the old
    /// identifier and treats it as a first visit, so the old identifier comes
    /// back as a new empty record. Only [`rotate`](Self::rotate) retires an
    /// identifier for good.
    pub fn start_secure<Q, R>(&self, request: &Q, response: &mut R) -> SessionId
    where
        Q: RequestCookies + ?Sized,
        R: ResponseCookies + ?Sized,
    {
        let settings = self.settings();
        let expires_at = settings.expiry_from(unix_now());

        let Some(incoming) = incoming_id(&settings, request) else {
            let id = issue(&settings, response);
            self.ensure(&id, expires_at);
            tracing::debug!(session = %id.masked(), "Secure session started");
            return id;
        };

        let fresh = SessionId::generate();
        if self.rekey(&incoming, &fresh, expires_at, false) {
            response.set_cookie(SessionCookie::issue(&settings.cookie_name, &fresh));
            tracing::debug!(
                old = %incoming.masked(),
                new = %fresh.masked(),
                "Secure session rotated"
            );
            fresh
        } else {
            self.ensure(&incoming, expires_at);
            tracing::debug!(session = %incoming.masked(), "Secure session started");
            incoming
        }
    }

    /// Move the session's data under a newly issued identifier.
    ///
    /// The old identifier stops resolving immediately. Returns `None` (and
    /// sets no cookie) when `id` has no record.
    pub fn rotate<R>(&self, id: &SessionId, response: &mut R) -> Option<SessionId>
    where
        R: ResponseCookies + ?Sized,
    {
        let settings = self.settings();
        let fresh = SessionId::generate();
        if !self.rekey(id, &fresh, settings.expiry_from(unix_now()), true) {
            return None;
        }

        response.set_cookie(SessionCookie::issue(&settings.cookie_name, &fresh));
        tracing::debug!(old = %id.masked(), new = %fresh.masked(), "Session rotated");
        Some(fresh)
    }

    /// End the session: drop its record and tell the client to delete the
    /// cookie.
    pub fn destroy_session<R>(&self, id: &SessionId, response: &mut R)
    where
        R: ResponseCookies + ?Sized,
    {
        self.destroy(id);
        response.set_cookie(SessionCookie::expire(&self.settings().cookie_name));
    }
}

fn incoming_id<Q: RequestCookies + ?Sized>(settings: &Settings, request: &Q) -> Option<SessionId> {
    request
        .cookie(&settings.cookie_name)
        .and_then(SessionId::from_cookie_value)
}

fn issue<R: ResponseCookies + ?Sized>(settings: &Settings, response: &mut R) -> SessionId {
    let id = SessionId::generate();
    response.set_cookie(SessionCookie::issue(&settings.cookie_name, &id));
    id
}
