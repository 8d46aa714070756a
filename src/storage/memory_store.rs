use crate::storage::ObjectStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-process object store for tests and local dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_prefixes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write under `prefix` fail.
    pub fn fail_writes_under(&self, prefix: &str) -> Result<()> {
        self.failing_prefixes
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?
            .push(prefix.to_string());
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(objects.keys().cloned().collect())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("Failed to get object: {} not found", key))
    }

    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let failing = self
            .failing_prefixes
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()));
        if failing {
            return Err(anyhow!("Failed to store object {}: injected failure", key));
        }

        self.objects
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_and_list() {
        let store = MemoryStore::new();
        store.put_object("a/2.parquet", b"two").await.unwrap();
        store.put_object("a/1.parquet", b"one").await.unwrap();
        store.put_object("b/1.parquet", b"other").await.unwrap();

        assert_eq!(store.get_object("a/1.parquet").await.unwrap(), b"one");
        assert_eq!(
            store.list_keys("a/").await.unwrap(),
            vec!["a/1.parquet".to_string(), "a/2.parquet".to_string()]
        );
        assert!(store.get_object("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_injected_write_failures() {
        let store = MemoryStore::new();
        store.fail_writes_under("gold/").unwrap();

        assert!(store.put_object("gold/x.parquet", b"x").await.is_err());
        assert!(store.put_object("silver/x.parquet", b"x").await.is_ok());
        assert_eq!(store.keys().unwrap(), vec!["silver/x.parquet".to_string()]);
    }
}
