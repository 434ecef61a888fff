// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Dynamically typed session values.
//!
//! Handlers store whatever they like under a name; the store keeps it as a
//! tagged union. Comparison is the derived structural equality of the
//! variants, so `Int(1)` and `Float(1.0)` are different values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The per-session data bag.
pub type SessionData = HashMap<String, SessionValue>;

/// A value stored in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Structured data (arrays, objects, null).
    Json(serde_json::Value),
}

impl SessionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SessionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SessionValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SessionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            SessionValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for SessionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionValue::Bool(b) => write!(f, "{}", b),
            SessionValue::Int(n) => write!(f, "{}", n),
            SessionValue::Float(x) => write!(f, "{}", x),
            SessionValue::Str(s) => f.write_str(s),
            SessionValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            SessionValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for SessionValue {
    fn from(value: bool) -> Self {
        SessionValue::Bool(value)
    }
}

impl From<i64> for SessionValue {
    fn from(value: i64) -> Self {
        SessionValue::Int(value)
    }
}

impl From<i32> for SessionValue {
    fn from(value: i32) -> Self {
        SessionValue::Int(i64::from(value))
    }
}

impl From<f64> for SessionValue {
    fn from(value: f64) -> Self {
        SessionValue::Float(value)
    }
}

impl From<String> for SessionValue {
    fn from(value: String) -> Self {
        SessionValue::Str(value)
    }
}

impl From<&str> for SessionValue {
    fn from(value: &str) -> Self {
        SessionValue::Str(value.to_string())
    }
}

impl From<Vec<u8>> for SessionValue {
    fn from(value: Vec<u8>) -> Self {
        SessionValue::Bytes(value)
    }
}

impl From<serde_json::Value> for SessionValue {
    fn from(value: serde_json::Value) -> Self {
        SessionValue::Json(value)
    }
}
