//! Metadata persistence for projects.

mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryProjectStore;

use crate::error::MetadataResult;
use crate::model::{Project, ProjectId};
use crate::share_code::ShareCode;
use async_trait::async_trait;

/// Storage interface for project metadata rows.
///
/// Ownership is not checked here; callers compare owners themselves.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert a new row. The id must be fresh.
    async fn insert(&self, project: &Project) -> MetadataResult<()>;

    async fn get(&self, id: &ProjectId) -> MetadataResult<Option<Project>>;

    /// Rows owned by `owner_id`, oldest first.
    async fn list_by_owner(&self, owner_id: &str) -> MetadataResult<Vec<Project>>;

    async fn rename(&self, id: &ProjectId, name: &str) -> MetadataResult<Project>;

    /// Mark the project shared under `code` unless it already is, and return
    /// the code that is active afterwards.
    ///
    /// Fails with [`MetadataError::UniquenessConflict`](crate::MetadataError::UniquenessConflict)
    /// when another project already holds `code`.
    async fn enable_sharing(&self, id: &ProjectId, code: &ShareCode) -> MetadataResult<ShareCode>;

    /// Clear the shared flag and the code together.
    async fn disable_sharing(&self, id: &ProjectId) -> MetadataResult<()>;

    /// The shared project holding `code`, if any.
    async fn find_by_share_code(&self, code: &ShareCode) -> MetadataResult<Option<Project>>;

    /// Remove a row. Returns whether it existed.
    async fn delete(&self, id: &ProjectId) -> MetadataResult<bool>;
}
