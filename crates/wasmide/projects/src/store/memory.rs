//! In-memory project metadata store for tests and local development.

use super::ProjectStore;
use crate::error::{MetadataError, MetadataResult};
use crate::model::{Project, ProjectId};
use crate::share_code::ShareCode;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory [`ProjectStore`].
///
/// Share-code uniqueness is enforced under the same write lock as the
/// update, matching a UNIQUE column.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> MetadataError {
    MetadataError::Backend("projects lock poisoned".to_string())
}

fn not_found(id: &ProjectId) -> MetadataError {
    MetadataError::NotFound(format!("project {id}"))
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn insert(&self, project: &Project) -> MetadataResult<()> {
        let mut guard = self.projects.write().map_err(|_| poisoned())?;
        if guard.contains_key(&project.id) {
            return Err(MetadataError::UniquenessConflict(format!(
                "project {} already exists",
                project.id
            )));
        }
        guard.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn get(&self, id: &ProjectId) -> MetadataResult<Option<Project>> {
        let guard = self.projects.read().map_err(|_| poisoned())?;
        Ok(guard.get(id).cloned())
    }

    async fn list_by_owner(&self, owner_id: &str) -> MetadataResult<Vec<Project>> {
        let guard = self.projects.read().map_err(|_| poisoned())?;
        let mut owned: Vec<Project> = guard
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn rename(&self, id: &ProjectId, name: &str) -> MetadataResult<Project> {
        let mut guard = self.projects.write().map_err(|_| poisoned())?;
        let project = guard.get_mut(id).ok_or_else(|| not_found(id))?;
        project.name = name.to_string();
        Ok(project.clone())
    }

    async fn enable_sharing(&self, id: &ProjectId, code: &ShareCode) -> MetadataResult<ShareCode> {
        let mut guard = self.projects.write().map_err(|_| poisoned())?;
        if let Some(existing) = guard.get(id).and_then(|p| p.share_code.clone()) {
            if let Some(project) = guard.get_mut(id) {
                project.is_shared = true;
            }
            return Ok(existing);
        }
        if guard
            .values()
            .any(|p| &p.id != id && p.share_code.as_ref() == Some(code))
        {
            return Err(MetadataError::UniquenessConflict(format!("share code {code}")));
        }
        let project = guard.get_mut(id).ok_or_else(|| not_found(id))?;
        project.is_shared = true;
        project.share_code = Some(code.clone());
        Ok(code.clone())
    }

    async fn disable_sharing(&self, id: &ProjectId) -> MetadataResult<()> {
        let mut guard = self.projects.write().map_err(|_| poisoned())?;
        let project = guard.get_mut(id).ok_or_else(|| not_found(id))?;
        project.is_shared = false;
        project.share_code = None;
        Ok(())
    }

    async fn find_by_share_code(&self, code: &ShareCode) -> MetadataResult<Option<Project>> {
        let guard = self.projects.read().map_err(|_| poisoned())?;
        Ok(guard
            .values()
            .find(|p| p.is_shared && p.share_code.as_ref() == Some(code))
            .cloned())
    }

    async fn delete(&self, id: &ProjectId) -> MetadataResult<bool> {
        let mut guard = self.projects.write().map_err(|_| poisoned())?;
        Ok(guard.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmide_compiler::Language;

    async fn seeded(store: &InMemoryProjectStore, owner: &str) -> Project {
        let project = Project::new(owner, "demo", Language::Go);
        store.insert(&project).await.unwrap();
        project
    }

    #[tokio::test]
    async fn duplicate_share_code_is_a_conflict() {
        let store = InMemoryProjectStore::new();
        let a = seeded(&store, "u1").await;
        let b = seeded(&store, "u2").await;
        let code = ShareCode::parse("abcdefgh").unwrap();

        store.enable_sharing(&a.id, &code).await.unwrap();
        let err = store.enable_sharing(&b.id, &code).await.unwrap_err();
        assert!(matches!(err, MetadataError::UniquenessConflict(_)));
    }

    #[tokio::test]
    async fn enabling_twice_keeps_first_code() {
        let store = InMemoryProjectStore::new();
        let p = seeded(&store, "u1").await;
        let first = ShareCode::parse("aaaaaaaa").unwrap();
        let second = ShareCode::parse("bbbbbbbb").unwrap();

        assert_eq!(store.enable_sharing(&p.id, &first).await.unwrap(), first);
        assert_eq!(store.enable_sharing(&p.id, &second).await.unwrap(), first);
    }

    #[tokio::test]
    async fn disabling_clears_code_and_lookup() {
        let store = InMemoryProjectStore::new();
        let p = seeded(&store, "u1").await;
        let code = ShareCode::parse("abcdefgh").unwrap();
        store.enable_sharing(&p.id, &code).await.unwrap();
        assert!(store.find_by_share_code(&code).await.unwrap().is_some());

        store.disable_sharing(&p.id).await.unwrap();
        let row = store.get(&p.id).await.unwrap().unwrap();
        assert!(!row.is_shared);
        assert!(row.share_code.is_none());
        assert!(store.find_by_share_code(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner() {
        let store = InMemoryProjectStore::new();
        seeded(&store, "u1").await;
        seeded(&store, "u1").await;
        seeded(&store, "u2").await;
        assert_eq!(store.list_by_owner("u1").await.unwrap().len(), 2);
        assert!(store.list_by_owner("u3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_and_delete_missing_rows() {
        let store = InMemoryProjectStore::new();
        let missing = ProjectId::from("nope");
        assert!(matches!(
            store.rename(&missing, "x").await,
            Err(MetadataError::NotFound(_))
        ));
        assert!(!store.delete(&missing).await.unwrap());
    }
}
