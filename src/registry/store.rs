// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The session registry: identifier → record, behind one reader/writer lock.
//!
//! Every operation takes the lock exactly once and does its whole job under
//! it, so a record is observed either fully present or fully absent. That
//! holds even against a concurrent sweep, which evicts under the write lock in
//! a single pass.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::SessionError;
use crate::id::SessionId;
use crate::registry::locks::{resilient_read, resilient_write};
use crate::settings::{Settings, SettingsCell};
use crate::utils::unix_now;
use crate::value::{SessionData, SessionValue};

/// Server-side state for one session: an absolute expiry and a data bag.
///
/// The bag is always present; a record starts with an empty one and entries
/// are only ever added or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    expires_at: i64,
    data: SessionData,
}

impl SessionRecord {
    /// Empty record expiring at `expires_at` (Unix seconds).
    pub fn new(expires_at: i64) -> Self {
        Self {
            expires_at,
            data: SessionData::new(),
        }
    }

    pub fn with_data(expires_at: i64, data: SessionData) -> Self {
        Self { expires_at, data }
    }

    /// Unix timestamp after which the record may be evicted.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn into_data(self) -> SessionData {
        self.data
    }

    /// Expired records are those strictly older than `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }

    pub(crate) fn touch(&mut self, expires_at: i64) {
        self.expires_at = expires_at;
    }
}

/// Point-in-time counts over the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub total: usize,
    /// Records past their expiry that the sweep has not reached yet.
    pub expired: usize,
}

/// Concurrent, TTL-based session store.
///
/// Construct one per application (or use [`global`]) and share it behind an
/// `Arc`. All methods take `&self` and are safe to call from any number of
/// threads or tasks.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
    settings: SettingsCell,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Empty registry with default settings.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            settings: SettingsCell::new(Settings::default()),
        }
    }

    /// Empty registry with validated custom settings.
    pub fn with_settings(settings: Settings) -> Result<Self, SessionError> {
        settings.validate()?;
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            settings: SettingsCell::new(settings),
        })
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.get()
    }

    /// Replace the settings as one value.
    ///
    /// Existing expirations are left alone; the new TTL applies from the next
    /// `start`, the new sweep interval from the next scheduled sweep.
    pub fn set_settings(&self, settings: Settings) -> Result<(), SessionError> {
        settings.validate()?;
        tracing::info!(
            cookie_name = %settings.cookie_name,
            expiration_secs = settings.expiration_secs,
            sweep_interval_secs = settings.sweep_interval.as_secs(),
            "Session settings updated"
        );
        self.settings.replace(settings);
        Ok(())
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Upsert the full record for `id`.
    pub fn write(&self, id: &SessionId, record: SessionRecord) {
        resilient_write(&self.sessions).insert(id.clone(), record);
    }

    /// Snapshot of the record for `id`, if any. Never creates one.
    pub fn read(&self, id: &SessionId) -> Option<SessionRecord> {
        resilient_read(&self.sessions).get(id).cloned()
    }

    /// Remove the record for `id`. Destroying an unknown id is a no-op.
    ///
    /// Returns whether a record was removed.
    pub fn destroy(&self, id: &SessionId) -> bool {
        let removed = resilient_write(&self.sessions).remove(id).is_some();
        if removed {
            tracing::debug!(session = %id.masked(), "Session destroyed");
        }
        removed
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        resilient_read(&self.sessions).contains_key(id)
    }

    pub fn len(&self) -> usize {
        resilient_read(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        resilient_read(&self.sessions).is_empty()
    }

    pub fn stats(&self) -> SessionStats {
        let now = unix_now();
        let sessions = resilient_read(&self.sessions);
        SessionStats {
            total: sessions.len(),
            expired: sessions.values().filter(|r| r.is_expired_at(now)).count(),
        }
    }

    // =========================================================================
    // Field operations
    // =========================================================================

    /// Upsert one field. A no-op when `id` has no record: a session must be
    /// started before it can hold data.
    pub fn set_field(
        &self,
        id: &SessionId,
        name: impl Into<String>,
        value: impl Into<SessionValue>,
    ) {
        if self.try_set_field(id, name, value).is_err() {
            tracing::debug!(session = %id.masked(), "Ignoring field write for unstarted session");
        }
    }

    /// Upsert one field, reporting [`SessionError::NotStarted`] when `id` has
    /// no record instead of silently dropping the write.
    pub fn try_set_field(
        &self,
        id: &SessionId,
        name: impl Into<String>,
        value: impl Into<SessionValue>,
    ) -> Result<(), SessionError> {
        let mut sessions = resilient_write(&self.sessions);
        match sessions.get_mut(id) {
            Some(record) => {
                record.data.insert(name.into(), value.into());
                Ok(())
            }
            None => Err(SessionError::NotStarted(id.masked())),
        }
    }

    /// Clone of one field, if both the record and the field exist.
    pub fn get_field(&self, id: &SessionId, name: &str) -> Option<SessionValue> {
        resilient_read(&self.sessions)
            .get(id)
            .and_then(|record| record.data.get(name).cloned())
    }

    /// Clone of the whole data bag; empty when there is no record.
    pub fn get_all_fields(&self, id: &SessionId) -> SessionData {
        resilient_read(&self.sessions)
            .get(id)
            .map(|record| record.data.clone())
            .unwrap_or_default()
    }

    /// Remove one field. No-op when the record or the field is absent.
    ///
    /// Returns the removed value.
    pub fn delete_field(&self, id: &SessionId, name: &str) -> Option<SessionValue> {
        resilient_write(&self.sessions)
            .get_mut(id)
            .and_then(|record| record.data.remove(name))
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    /// Evict every record that expired before now. Returns the count removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(unix_now())
    }

    /// Evict every record with `expires_at < now`, in one pass under the
    /// write lock.
    pub fn sweep_at(&self, now: i64) -> usize {
        let mut sessions = resilient_write(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired_at(now));
        let removed = before - sessions.len();
        let remaining = sessions.len();
        drop(sessions);

        if removed > 0 {
            tracing::info!(removed, remaining, "Session storage swept");
        } else {
            tracing::debug!(remaining, "Session sweep found nothing to evict");
        }
        removed
    }

    /// Create the record for `id` if needed and push its expiry to
    /// `expires_at`. Returns whether the record already existed.
    pub(crate) fn ensure(&self, id: &SessionId, expires_at: i64) -> bool {
        let mut sessions = resilient_write(&self.sessions);
        match sessions.get_mut(id) {
            Some(record) => {
                record.touch(expires_at);
                true
            }
            None => {
                sessions.insert(id.clone(), SessionRecord::new(expires_at));
                false
            }
        }
    }

    /// Remove the record for `old` and, if it existed, re-insert it under
    /// `new` with a refreshed expiry. Both steps happen under one lock.
    pub(crate) fn rekey(
        &self,
        old: &SessionId,
        new: &SessionId,
        expires_at: i64,
        keep_data: bool,
    ) -> bool {
        let mut sessions = resilient_write(&self.sessions);
        match sessions.remove(old) {
            Some(record) => {
                let data = if keep_data { record.into_data() } else { SessionData::new() };
                sessions.insert(new.clone(), SessionRecord::with_data(expires_at, data));
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// GLOBAL REGISTRY
// ============================================================================

static GLOBAL_REGISTRY: OnceLock<Arc<SessionRegistry>> = OnceLock::new();

/// Process-wide registry with default settings, created on first use.
///
/// Convenient for small applications; anything that needs isolation (tests,
/// several apps in one process) should construct its own [`SessionRegistry`].
pub fn global() -> &'static Arc<SessionRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| Arc::new(SessionRegistry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn started(registry: &SessionRegistry) -> SessionId {
        let id = SessionId::generate();
        registry.write(&id, SessionRecord::new(unix_now() + 3600));
        id
    }

    #[test]
    fn test_write_then_read() {
        let registry = SessionRegistry::new();
        let id = SessionId::generate();
        let mut data = SessionData::new();
        data.insert("k".to_string(), SessionValue::from("v"));

        registry.write(&id, SessionRecord::with_data(100, data.clone()));

        let record = registry.read(&id).unwrap();
        assert_eq!(record.expires_at(), 100);
        assert_eq!(record.data(), &data);
    }

    #[test]
    fn test_read_unknown_is_none_and_does_not_create() {
        let registry = SessionRegistry::new();
        let id = SessionId::generate();
        assert!(registry.read(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let registry = SessionRegistry::new();
        let id = started(&registry);

        assert!(registry.destroy(&id));
        assert!(!registry.destroy(&id));
        assert!(registry.read(&id).is_none());
    }

    #[test]
    fn test_field_lifecycle() {
        let registry = SessionRegistry::new();
        let id = started(&registry);

        registry.set_field(&id, "k", "v");
        assert_eq!(registry.get_field(&id, "k"), Some(SessionValue::from("v")));

        registry.set_field(&id, "k", 2);
        assert_eq!(registry.get_field(&id, "k"), Some(SessionValue::Int(2)));

        assert_eq!(registry.delete_field(&id, "k"), Some(SessionValue::Int(2)));
        assert!(registry.get_field(&id, "k").is_none());

        // Deleting again is harmless
        assert!(registry.delete_field(&id, "k").is_none());
        assert!(registry.contains(&id));
    }

    #[test]
    fn test_set_field_never_creates_a_record() {
        let registry = SessionRegistry::new();
        let existing = started(&registry);
        let unknown = SessionId::generate();

        registry.set_field(&unknown, "k", "v");

        assert_eq!(registry.len(), 1);
        assert!(registry.read(&unknown).is_none());
        assert!(registry.get_field(&unknown, "k").is_none());
        assert!(registry.contains(&existing));
    }

    #[test]
    fn test_try_set_field_reports_unstarted_session() {
        let registry = SessionRegistry::new();
        let unknown = SessionId::generate();

        let result = registry.try_set_field(&unknown, "k", "v");
        assert!(matches!(result, Err(SessionError::NotStarted(_))));
        assert!(registry.is_empty());

        let id = started(&registry);
        assert!(registry.try_set_field(&id, "k", "v").is_ok());
    }

    #[test]
    fn test_get_all_fields() {
        let registry = SessionRegistry::new();
        let id = started(&registry);
        registry.set_field(&id, "username", "alice");
        registry.set_field(&id, "admin", false);

        let all = registry.get_all_fields(&id);
        assert_eq!(all.len(), 2);
        assert_eq!(all["username"], SessionValue::from("alice"));
        assert_eq!(all["admin"], SessionValue::Bool(false));

        assert!(registry.get_all_fields(&SessionId::generate()).is_empty());
    }

    #[test]
    fn test_delete_field_on_unknown_session() {
        let registry = SessionRegistry::new();
        assert!(registry.delete_field(&SessionId::generate(), "k").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sweep_keeps_only_unexpired() {
        let registry = SessionRegistry::new();
        let t = 1_000_000;
        let old_a = SessionId::generate();
        let old_b = SessionId::generate();
        let fresh = SessionId::generate();
        registry.write(&old_a, SessionRecord::new(t - 1));
        registry.write(&old_b, SessionRecord::new(t - 1));
        registry.write(&fresh, SessionRecord::new(t + 100));

        assert_eq!(registry.sweep_at(t), 2);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&fresh));
    }

    #[test]
    fn test_sweep_boundary_is_strict() {
        let registry = SessionRegistry::new();
        let id = SessionId::generate();
        registry.write(&id, SessionRecord::new(500));

        assert_eq!(registry.sweep_at(500), 0);
        assert!(registry.contains(&id));
        assert_eq!(registry.sweep_at(501), 1);
    }

    #[test]
    fn test_sweep_randomized_mixes() {
        let mut rng = rand::thread_rng();
        let registry = SessionRegistry::new();
        let now = unix_now();

        for _ in 0..200 {
            let expired = rng.gen_range(0..75);
            let live = rng.gen_range(0..50);
            for _ in 0..expired {
                registry.write(&SessionId::generate(), SessionRecord::new(0));
            }
            for _ in 0..live {
                registry.write(&SessionId::generate(), SessionRecord::new(now + 3600));
            }

            assert_eq!(registry.sweep_at(now), expired);
            assert_eq!(registry.len(), live);

            // Reset for the next round
            registry.sweep_at(now + 7200);
            assert!(registry.is_empty());
        }
    }

    #[test]
    fn test_stats() {
        let registry = SessionRegistry::new();
        registry.write(&SessionId::generate(), SessionRecord::new(0));
        started(&registry);

        let stats = registry.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn test_settings_swap_does_not_restamp() {
        let registry = SessionRegistry::new();
        let id = SessionId::generate();
        registry.write(&id, SessionRecord::new(1234));

        registry
            .set_settings(Settings {
                expiration_secs: 1,
                ..Settings::default()
            })
            .unwrap();

        assert_eq!(registry.read(&id).unwrap().expires_at(), 1234);
        assert_eq!(registry.settings().expiration_secs, 1);
    }

    #[test]
    fn test_set_settings_rejects_invalid() {
        let registry = SessionRegistry::new();
        let result = registry.set_settings(Settings {
            cookie_name: String::new(),
            ..Settings::default()
        });
        assert!(result.is_err());
        assert_eq!(registry.settings().cookie_name, "SessionId");
    }

    #[test]
    fn test_rekey() {
        let registry = SessionRegistry::new();
        let old = started(&registry);
        registry.set_field(&old, "k", "v");
        let new = SessionId::generate();

        assert!(registry.rekey(&old, &new, 99, true));
        assert!(!registry.contains(&old));
        assert_eq!(registry.get_field(&new, "k"), Some(SessionValue::from("v")));
        assert_eq!(registry.read(&new).unwrap().expires_at(), 99);

        let newer = SessionId::generate();
        assert!(registry.rekey(&new, &newer, 99, false));
        assert!(registry.get_all_fields(&newer).is_empty());

        assert!(!registry.rekey(&old, &SessionId::generate(), 99, true));
    }

    #[test]
    fn test_global_is_shared() {
        let a = global();
        let b = global();
        assert!(Arc::ptr_eq(a, b));
    }
}
