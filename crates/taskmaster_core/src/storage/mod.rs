//! Persistence boundary: named keys in a durable key-value store.
//!
//! Loads never fail. A missing key, unreadable backend or malformed value
//! yields the caller's default so that startup always succeeds. Saves
//! overwrite the whole value for a key.

use crate::error::AppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub mod json_store;
pub mod memory;

pub use json_store::FileStore;
pub use memory::MemoryStore;

pub const TASKS_KEY: &str = "tasks";
pub const HISTORY_KEY: &str = "task-history";
pub const DARK_MODE_KEY: &str = "darkMode";

pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>, AppError>;

    fn write(&self, key: &str, value: &str) -> Result<(), AppError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), AppError> {
        (**self).write(key, value)
    }
}

#[derive(Debug, Clone)]
pub struct Persistence<S> {
    backend: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(err) => {
                warn!(key, error = %err, "storage read failed, using default");
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "stored value is malformed, using default");
                default
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let content = serde_json::to_string(value)?;
        self.write(key, &content)
    }

    /// Booleans are stored as bare text; anything but `true` reads as false.
    pub fn load_flag(&self, key: &str) -> bool {
        match self.backend.read(key) {
            Ok(Some(raw)) => raw.trim() == "true",
            Ok(None) => false,
            Err(err) => {
                warn!(key, error = %err, "storage read failed, using default");
                false
            }
        }
    }

    pub fn save_flag(&self, key: &str, value: bool) -> Result<(), AppError> {
        self.write(key, if value { "true" } else { "false" })
    }

    fn write(&self, key: &str, content: &str) -> Result<(), AppError> {
        match self.backend.write(key, content) {
            Ok(()) => {
                debug!(key, bytes = content.len(), "saved");
                Ok(())
            }
            Err(err) => {
                warn!(key, error = %err, "storage write failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, MemoryStore, Persistence};
    use crate::error::AppError;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn read(&self, _key: &str) -> Result<Option<String>, AppError> {
            Err(AppError::io("disk unavailable"))
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), AppError> {
            Err(AppError::io("disk unavailable"))
        }
    }

    #[test]
    fn load_or_returns_default_for_missing_key() {
        let persistence = Persistence::new(MemoryStore::new());
        let value: Vec<u32> = persistence.load_or("numbers", vec![9]);
        assert_eq!(value, vec![9]);
    }

    #[test]
    fn load_or_returns_default_for_malformed_value() {
        let store = MemoryStore::new();
        store.write("numbers", "[1, 2").unwrap();

        let persistence = Persistence::new(store);
        let value: Vec<u32> = persistence.load_or("numbers", Vec::new());
        assert!(value.is_empty());
    }

    #[test]
    fn load_or_returns_default_when_backend_fails() {
        let persistence = Persistence::new(BrokenStore);
        let value: Vec<u32> = persistence.load_or("numbers", Vec::new());
        assert!(value.is_empty());
        assert!(!persistence.load_flag("darkMode"));
    }

    #[test]
    fn save_overwrites_previous_value() {
        let persistence = Persistence::new(MemoryStore::new());
        persistence.save("numbers", &[1, 2, 3]).unwrap();
        persistence.save("numbers", &[4]).unwrap();

        let value: Vec<u32> = persistence.load_or("numbers", Vec::new());
        assert_eq!(value, vec![4]);
    }

    #[test]
    fn save_reports_backend_failure() {
        let persistence = Persistence::new(BrokenStore);
        let err = persistence.save("numbers", &[1]).unwrap_err();
        assert_eq!(err.code(), "io_error");
    }

    #[test]
    fn flags_are_stored_as_text() {
        let persistence = Persistence::new(MemoryStore::new());
        persistence.save_flag("darkMode", true).unwrap();

        assert_eq!(
            persistence.backend().read("darkMode").unwrap().as_deref(),
            Some("true")
        );
        assert!(persistence.load_flag("darkMode"));

        persistence.backend().write("darkMode", "yes").unwrap();
        assert!(!persistence.load_flag("darkMode"));
    }
}
