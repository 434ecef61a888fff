// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Poison-tolerant lock acquisition for the session map and settings.
//!
//! A handler that panics while holding the registry lock poisons it. Every
//! registry mutation is a single map operation (insert, remove, or an in-place
//! field change), so the map is never left half-updated and the data behind a
//! poisoned lock is still coherent. We log the event and keep serving rather
//! than failing every later request.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read lock, recovering from poisoning.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "quicksession::locks",
                event = "LOCK_POISONED_READ",
                "Session lock was poisoned by a panicking holder; recovering for read"
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a write lock, recovering from poisoning.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "quicksession::locks",
                event = "LOCK_POISONED_WRITE",
                "Session lock was poisoned by a panicking holder; recovering for write"
            );
            poisoned.into_inner()
        }
    }
}
