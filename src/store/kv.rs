use crate::error::{StoreError, StoreResult};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// Durable string key-value storage. Each `set` replaces the whole value.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }
}

/// In-process store for tests and previews. Writes can be switched off to
/// simulate an unavailable backend.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RefCell<HashMap<String, String>>,
    writes_fail: Cell<bool>,
    failing_keys: RefCell<HashSet<String>>,
    write_count: Cell<usize>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.writes_fail.set(fail);
    }

    /// Reject writes to `key` only; other keys keep working.
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.borrow_mut().insert(key.to_string());
    }

    pub fn write_count(&self) -> usize {
        self.write_count.get()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        if self.writes_fail.get() || self.failing_keys.borrow().contains(key) {
            return Err(StoreError::Storage(format!("write to {key} rejected")));
        }
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        self.write_count.set(self.write_count.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_write_leaves_previous_value() {
        let kv = MemoryKv::new().with_entry("k", "v1");
        kv.fail_writes(true);

        assert!(kv.set("k", "v2").is_err());
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v1"));
        assert_eq!(kv.write_count(), 0);
    }

    #[test]
    fn per_key_failure_spares_other_keys() {
        let kv = MemoryKv::new();
        kv.fail_writes_to("alerts");

        assert!(kv.set("alerts", "[]").is_err());
        assert!(kv.set("categories", "[]").is_ok());
        assert_eq!(kv.raw("categories").as_deref(), Some("[]"));
        assert!(kv.raw("alerts").is_none());
    }
}
