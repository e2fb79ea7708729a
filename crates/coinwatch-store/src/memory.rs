use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{LocalStore, StoreError};

/// In-memory [`LocalStore`] used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("memory store mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("memory store mutex poisoned")
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_a_sorted_map() {
        let store = MemoryStore::new();
        store.set("api_b", "2").expect("set");
        store.set("api_a", "1").expect("set");
        store.set("theme", "dark").expect("set");

        assert_eq!(store.len(), 3);
        assert_eq!(
            store.keys_with_prefix("api_").expect("keys"),
            vec!["api_a", "api_b"]
        );

        store.remove("api_a").expect("remove");
        assert_eq!(store.get("api_a").expect("get"), None);
        store.clear().expect("clear");
        assert!(store.is_empty());
    }
}
