//! In-memory object store.
//!
//! Deterministic and test-friendly; contents are lost when the process exits.
//! Production deployments should use the S3 backend.

use crate::traits::ObjectStore;
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

/// In-memory [`ObjectStore`].
#[derive(Debug)]
pub struct InMemoryObjectStore {
    base_url: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

impl InMemoryObjectStore {
    /// Store whose presigned URLs start with `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Content type an object was stored with.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .ok()?
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') {
        return Err(StorageError::InvalidInput(format!("invalid object key `{key}`")));
    }
    Ok(())
}

fn poisoned() -> StorageError {
    StorageError::Backend("objects lock poisoned".to_string())
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> StorageResult<()> {
        check_key(key)?;
        let mut guard = self.objects.write().map_err(|_| poisoned())?;
        guard.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        let guard = self.objects.read().map_err(|_| poisoned())?;
        guard
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let guard = self.objects.read().map_err(|_| poisoned())?;
        Ok(guard
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let mut guard = self.objects.write().map_err(|_| poisoned())?;
        guard.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration, content_type: &str) -> StorageResult<String> {
        check_key(key)?;
        let encoded_type = content_type
            .replace('/', "%2F")
            .replace(';', "%3B")
            .replace(' ', "%20");
        Ok(format!(
            "{}/{}?expires-in={}&response-content-type={}",
            self.base_url,
            key,
            ttl.as_secs(),
            encoded_type
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_overwrite() {
        let store = InMemoryObjectStore::default();
        store.put_object("u/p/src/main.go", b"v1".to_vec(), "text/plain").await.unwrap();
        store.put_object("u/p/src/main.go", b"v2".to_vec(), "text/plain").await.unwrap();
        assert_eq!(store.get_object("u/p/src/main.go").await.unwrap(), b"v2");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = InMemoryObjectStore::default();
        let err = store.get_object("nope").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_is_prefix_scoped() {
        let store = InMemoryObjectStore::default();
        for key in ["u/p1/src/a", "u/p1/src/b", "u/p10/src/a", "v/p1/src/a"] {
            store.put_object(key, vec![], "text/plain").await.unwrap();
        }
        let mut keys = store.list_objects("u/p1/").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["u/p1/src/a", "u/p1/src/b"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryObjectStore::default();
        store.put_object("k", vec![1], "application/octet-stream").await.unwrap();
        store.delete_object("k").await.unwrap();
        store.delete_object("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn presigned_url_carries_ttl_and_type() {
        let store = InMemoryObjectStore::new("http://localhost:9000/");
        let url = store
            .presign_get("u/p/build/main.wasm", Duration::from_secs(60), "application/wasm")
            .await
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:9000/u/p/build/main.wasm?expires-in=60&response-content-type=application%2Fwasm"
        );
    }

    #[tokio::test]
    async fn rejects_empty_keys() {
        let store = InMemoryObjectStore::default();
        let err = store.put_object("", vec![], "text/plain").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }
}
