//! File-backed store scope with atomic writes.
//!
//! Each scope is one JSON document under `dirs::data_dir()/<namespace>/`.
//! Uses temp file + rename for atomic writes.

use crate::UnlockgateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Loosely-typed store value.
///
/// Callers coerce on read; a type mismatch reads as absent, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Integer counter.
    Int(i64),
    /// Floating-point number (e.g., a price).
    Float(f64),
    /// String value.
    Str(String),
}

impl Value {
    /// Read as bool, or `None` on type mismatch.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as integer, or `None` on type mismatch.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Read as float. Integers coerce; other types read as `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Read as string, or `None` on type mismatch.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// One physical store scope: a JSON key/value document on disk.
pub struct FileScope {
    path: PathBuf,
}

impl FileScope {
    /// Create a scope stored under `dirs::data_dir()/<namespace>/flags.json`.
    pub fn new(namespace: &str) -> Result<Self, UnlockgateError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| UnlockgateError::StoreIo("Could not find data directory".to_string()))?;
        Self::with_path(base_dir.join(namespace))
    }

    /// Create a scope at a specific directory.
    ///
    /// Shared scopes typically live at an explicit container path rather
    /// than under the per-user data directory.
    pub fn with_path(dir: PathBuf) -> Result<Self, UnlockgateError> {
        fs::create_dir_all(&dir)
            .map_err(|e| UnlockgateError::StoreIo(format!("Failed to create store dir: {}", e)))?;
        Ok(Self {
            path: dir.join("flags.json"),
        })
    }

    /// Read a single value, or `None` if absent or unreadable.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_map().remove(key)
    }

    /// Write a single value atomically.
    pub fn set(&self, key: &str, value: Value) -> Result<(), UnlockgateError> {
        let mut map = self.read_map();
        map.insert(key.to_string(), value);
        self.write_map(&map)
    }

    fn read_map(&self) -> BTreeMap<String, Value> {
        // A missing or corrupt document reads as empty; first run has no file.
        let Ok(json) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&json).unwrap_or_default()
    }

    fn write_map(&self, map: &BTreeMap<String, Value>) -> Result<(), UnlockgateError> {
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| UnlockgateError::StoreIo(format!("Failed to serialize store: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");

        // Write to temp file
        fs::write(&temp_path, &json)
            .map_err(|e| UnlockgateError::StoreIo(format!("Failed to write temp file: {}", e)))?;

        // Atomic rename
        fs::rename(&temp_path, &self.path)
            .map_err(|e| UnlockgateError::StoreIo(format!("Failed to rename store file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn roundtrip_all_value_types() {
        let temp_dir = TempDir::new().unwrap();
        let scope = FileScope::with_path(temp_dir.path().to_path_buf()).unwrap();

        scope.set("flag", Value::Bool(true)).unwrap();
        scope.set("count", Value::Int(42)).unwrap();
        scope.set("price", Value::Float(2.99)).unwrap();
        scope.set("name", Value::Str("unlock".to_string())).unwrap();

        assert_eq!(scope.get("flag"), Some(Value::Bool(true)));
        assert_eq!(scope.get("count"), Some(Value::Int(42)));
        assert_eq!(scope.get("price"), Some(Value::Float(2.99)));
        assert_eq!(scope.get("name"), Some(Value::Str("unlock".to_string())));
    }

    #[test]
    fn missing_key_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let scope = FileScope::with_path(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(scope.get("nothing"), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let temp_dir = TempDir::new().unwrap();
        let scope = FileScope::with_path(temp_dir.path().to_path_buf()).unwrap();

        scope.set("flag", Value::Bool(false)).unwrap();
        scope.set("flag", Value::Bool(true)).unwrap();
        assert_eq!(scope.get("flag"), Some(Value::Bool(true)));
    }

    #[test]
    fn type_mismatch_reads_as_none() {
        assert_eq!(Value::Str("true".to_string()).as_bool(), None);
        assert_eq!(Value::Bool(true).as_i64(), None);
        assert_eq!(Value::Str("2.99".to_string()).as_f64(), None);
        assert_eq!(Value::Int(1).as_str(), None);
    }

    #[test]
    fn int_coerces_to_float() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
    }

    #[test]
    fn corrupt_document_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let scope = FileScope::with_path(temp_dir.path().to_path_buf()).unwrap();

        fs::write(temp_dir.path().join("flags.json"), "not json").unwrap();
        assert_eq!(scope.get("flag"), None);

        // Writes still work after corruption
        scope.set("flag", Value::Bool(true)).unwrap();
        assert_eq!(scope.get("flag"), Some(Value::Bool(true)));
    }

    #[test]
    fn values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let scope = FileScope::with_path(temp_dir.path().to_path_buf()).unwrap();
            scope.set("flag", Value::Bool(true)).unwrap();
        }
        let reopened = FileScope::with_path(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.get("flag"), Some(Value::Bool(true)));
    }
}
