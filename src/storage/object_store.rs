use anyhow::Result;
use async_trait::async_trait;

/// The object-storage operations the jobs rely on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Keys under `prefix`, in lexicographic order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;

    /// Create or fully overwrite the object at `key`.
    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()>;
}
