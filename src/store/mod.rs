pub mod json_store;
pub mod schema;

use std::cell::RefCell;
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::StorageError;

pub use json_store::JsonStore;

/// Key-value persistence for drill state. Values are plain JSON documents.
pub trait KvStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn write(&self, key: &str, value: &Value) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store used when the data directory is unavailable, and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.values.borrow_mut().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

/// Read and decode `key`, falling back to the default on any failure.
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KvStore, key: &str) -> T {
    let decoded = store
        .read(key)
        .and_then(|value| match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        });
    match decoded {
        Ok(Some(data)) => data,
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "stored state unreadable, starting fresh");
            T::default()
        }
    }
}

/// Encode and write `data`. Failures are logged; the caller carries on in memory.
pub fn persist<T: Serialize>(store: &dyn KvStore, key: &str, data: &T) {
    let result = serde_json::to_value(data)
        .map_err(StorageError::from)
        .and_then(|value| store.write(key, &value));
    if let Err(e) = result {
        warn!(key, error = %e, "failed to persist state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
    }

    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn read(&self, _key: &str) -> Result<Option<Value>, StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn write(&self, _key: &str, _value: &Value) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        persist(&store, "counter", &Counter { value: 7 });
        let loaded: Counter = load_or_default(&store, "counter");
        assert_eq!(loaded, Counter { value: 7 });
        store.remove("counter").unwrap();
        assert_eq!(load_or_default::<Counter>(&store, "counter"), Counter::default());
    }

    #[test]
    fn malformed_values_fall_back_to_default() {
        let store = MemoryStore::new();
        store
            .write("counter", &serde_json::json!({"value": "seven"}))
            .unwrap();
        assert_eq!(load_or_default::<Counter>(&store, "counter"), Counter::default());
    }

    #[test]
    fn storage_failures_are_swallowed() {
        persist(&BrokenStore, "counter", &Counter { value: 1 });
        assert_eq!(
            load_or_default::<Counter>(&BrokenStore, "counter"),
            Counter::default()
        );
    }
}
