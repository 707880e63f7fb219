use crate::StorageResult;
use async_trait::async_trait;
use std::time::Duration;

/// Minimal client contract for a flat, key-addressed object store.
///
/// Keys are `/`-separated paths without a leading slash.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or overwrite an object.
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Read an object. Missing keys are [`StorageError::NotFound`](crate::StorageError::NotFound).
    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Every key that starts with `prefix`, in no particular order.
    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Remove an object. Removing a missing key succeeds.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// A read-only URL for `key` that expires after `ttl` and makes the
    /// response carry `content_type`.
    async fn presign_get(&self, key: &str, ttl: Duration, content_type: &str) -> StorageResult<String>;
}
