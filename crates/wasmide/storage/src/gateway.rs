use crate::traits::ObjectStore;
use crate::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// File name to UTF-8 content.
pub type FileMap = BTreeMap<String, String>;

/// Concurrent multi-file operations over an [`ObjectStore`].
///
/// Cheap to clone; clones share the underlying client.
#[derive(Clone)]
pub struct ObjectStorageGateway {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ObjectStorageGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorageGateway").finish_non_exhaustive()
    }
}

/// `prefix` and `name` joined by exactly one `/`.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Response content type for a file, inferred from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wasm" => "application/wasm",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "wat" | "go" | "ts" | "txt" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Directory form of `prefix` so `u/p1` never matches `u/p10/...`.
fn dir_prefix(prefix: &str) -> StorageResult<String> {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        return Err(StorageError::InvalidInput("empty prefix".to_string()));
    }
    Ok(format!("{trimmed}/"))
}

fn join_failure(e: tokio::task::JoinError) -> StorageError {
    StorageError::Backend(format!("storage task failed: {e}"))
}

impl ObjectStorageGateway {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Write one object at `{prefix}/{name}`.
    pub async fn upload(&self, prefix: &str, name: &str, body: Vec<u8>) -> StorageResult<()> {
        let key = join_key(prefix, name);
        let bytes = body.len();
        self.store
            .put_object(&key, body, content_type_for(name))
            .await?;
        debug!(key = %key, bytes, "object uploaded");
        Ok(())
    }

    /// Upload every file of `files` under `prefix` concurrently.
    ///
    /// All uploads run to completion. If any failed the batch fails with the
    /// first error and the failure count; successful writes are not rolled
    /// back.
    pub async fn upload_many(&self, prefix: &str, files: &FileMap) -> StorageResult<()> {
        let mut tasks = JoinSet::new();
        for (name, content) in files {
            let gateway = self.clone();
            let prefix = prefix.to_string();
            let name = name.clone();
            let body = content.clone().into_bytes();
            tasks.spawn(async move {
                let result = gateway.upload(&prefix, &name, body).await;
                (name, result)
            });
        }

        let total = files.len();
        let mut failed = 0;
        let mut first = None;
        while let Some(joined) = tasks.join_next().await {
            let (name, result) = match joined {
                Ok(done) => done,
                Err(e) => (String::from("<task>"), Err(join_failure(e))),
            };
            if let Err(e) = result {
                warn!(prefix, file = %name, error = %e, "upload failed");
                failed += 1;
                first.get_or_insert(e);
            }
        }

        match first {
            None => {
                debug!(prefix, files = total, "batch uploaded");
                Ok(())
            }
            Some(first) => Err(StorageError::BatchFailed {
                failed,
                total,
                first: Box::new(first),
            }),
        }
    }

    /// Read every file under `prefix` into a name → content map.
    ///
    /// Names are relative to the prefix. The first failed read aborts the
    /// remaining ones and fails the call.
    pub async fn list_and_fetch(&self, prefix: &str) -> StorageResult<FileMap> {
        let dir = dir_prefix(prefix)?;
        let keys = self.store.list_objects(&dir).await?;
        let files = Arc::new(Mutex::new(FileMap::new()));

        let mut tasks = JoinSet::new();
        for key in keys {
            let name = key[dir.len()..].to_string();
            // folder placeholder
            if name.is_empty() {
                continue;
            }
            let store = Arc::clone(&self.store);
            let files = Arc::clone(&files);
            tasks.spawn(async move {
                let body = store.get_object(&key).await?;
                let content = String::from_utf8(body).map_err(|_| StorageError::Encoding(key))?;
                files.lock().await.insert(name, content);
                Ok::<_, StorageError>(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined.map_err(join_failure).and_then(|r| r) {
                tasks.abort_all();
                warn!(prefix, error = %e, "fetch aborted");
                return Err(e);
            }
        }

        let files = std::mem::take(&mut *files.lock().await);
        debug!(prefix, files = files.len(), "prefix fetched");
        Ok(files)
    }

    /// Delete every object under `prefix`, returning how many were removed.
    /// An empty or unknown prefix is not an error.
    pub async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let dir = dir_prefix(prefix)?;
        let keys = self.store.list_objects(&dir).await?;
        let count = keys.len();

        let mut tasks = JoinSet::new();
        for key in keys {
            let store = Arc::clone(&self.store);
            tasks.spawn(async move { store.delete_object(&key).await });
        }

        let mut first = None;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined.map_err(join_failure).and_then(|r| r) {
                warn!(prefix, error = %e, "delete failed");
                first.get_or_insert(e);
            }
        }
        if let Some(e) = first {
            return Err(e);
        }

        info!(prefix, objects = count, "prefix deleted");
        Ok(count)
    }

    /// A read-only URL for `path`, valid for `ttl`.
    pub async fn presign(&self, path: &str, ttl: Duration) -> StorageResult<String> {
        self.store
            .presign_get(path, ttl, content_type_for(path))
            .await
    }

    /// Raw bytes of one object.
    pub async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.store.get_object(path).await
    }
}
