//! Two-scope store with explicit precedence and repair-on-read.
//!
//! Reads prefer the shared scope; a shared-scope miss falls back to the
//! local scope and back-fills the shared scope so a companion process that
//! only sees the shared scope converges on the same values. Writes go to
//! both scopes in one logical operation.

use crate::store::file::{FileScope, Value};
use crate::UnlockgateError;
use std::sync::Mutex;

struct Scopes {
    local: FileScope,
    /// Absent when no shared container is configured; the store then
    /// degrades to local-only without erroring.
    shared: Option<FileScope>,
}

/// Layered key/value store over a local and an optional shared scope.
pub struct LayeredStore {
    // Both scope writes happen under one guard so a get() cannot observe
    // the local write without the shared write.
    scopes: Mutex<Scopes>,
}

impl LayeredStore {
    /// Open a layered store from namespaces under `dirs::data_dir()`.
    pub fn new(
        local_namespace: &str,
        shared_namespace: Option<&str>,
    ) -> Result<Self, UnlockgateError> {
        let local = FileScope::new(local_namespace)?;
        // A shared container that cannot be opened is treated as absent.
        let shared = shared_namespace.and_then(|ns| match FileScope::new(ns) {
            Ok(scope) => Some(scope),
            Err(e) => {
                tracing::warn!("shared store scope unavailable: {}", e);
                None
            }
        });
        Ok(Self::from_scopes(local, shared))
    }

    /// Build from already-opened scopes (explicit container paths).
    pub fn from_scopes(local: FileScope, shared: Option<FileScope>) -> Self {
        Self {
            scopes: Mutex::new(Scopes { local, shared }),
        }
    }

    /// Read a value: shared scope first, then local with shared back-fill.
    pub fn get(&self, key: &str) -> Option<Value> {
        let scopes = self.scopes.lock().expect("store lock poisoned");

        if let Some(shared) = &scopes.shared {
            if let Some(value) = shared.get(key) {
                return Some(value);
            }
        }

        let value = scopes.local.get(key)?;

        // Repair: the companion process only sees the shared scope.
        if let Some(shared) = &scopes.shared {
            if let Err(e) = shared.set(key, value.clone()) {
                tracing::warn!("shared scope back-fill failed for {}: {}", key, e);
            }
        }

        Some(value)
    }

    /// Write a value to both scopes.
    ///
    /// The local write is authoritative for errors; a failing shared write
    /// is logged and ignored, matching the degrade-to-local contract.
    pub fn set(&self, key: &str, value: Value) -> Result<(), UnlockgateError> {
        let scopes = self.scopes.lock().expect("store lock poisoned");

        scopes.local.set(key, value.clone())?;

        if let Some(shared) = &scopes.shared {
            if let Err(e) = shared.set(key, value) {
                tracing::warn!("shared scope write failed for {}: {}", key, e);
            }
        }

        Ok(())
    }

    /// Read a bool; type mismatch reads as `None`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Read an integer; type mismatch reads as `None`.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// Read a float; integers coerce, other mismatches read as `None`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    /// Read a string; type mismatch reads as `None`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(String::from))
    }
}
