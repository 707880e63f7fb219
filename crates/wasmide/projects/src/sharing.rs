use crate::error::{MetadataError, ProjectError, ProjectResult};
use crate::model::{ProjectId, ProjectView};
use crate::repository::ProjectRepository;
use crate::share_code::ShareCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sharing state reported after a toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareState {
    pub shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_code: Option<ShareCode>,
}

type CodeSource = Arc<dyn Fn() -> ShareCode + Send + Sync>;

/// Issues share codes and duplicates shared projects.
#[derive(Clone)]
pub struct SharingController {
    repo: ProjectRepository,
    codes: CodeSource,
    max_attempts: u32,
}

impl std::fmt::Debug for SharingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharingController")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl SharingController {
    pub fn new(repo: ProjectRepository) -> Self {
        let max_attempts = repo.config().share_code_attempts.max(1);
        Self {
            repo,
            codes: Arc::new(ShareCode::generate),
            max_attempts,
        }
    }

    /// Draw codes from `source` instead of the thread RNG.
    pub fn with_code_source(mut self, source: impl Fn() -> ShareCode + Send + Sync + 'static) -> Self {
        self.codes = Arc::new(source);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Turn sharing on or off for a project owned by `caller`.
    ///
    /// Enabling an already shared project keeps its code.
    pub async fn toggle_sharing(&self, caller: &str, id: &ProjectId, enable: bool) -> ProjectResult<ShareState> {
        let project = self.repo.owned(caller, id).await?;
        let store = self.repo.store();

        if !enable {
            store.disable_sharing(id).await?;
            info!(project = %id, "sharing disabled");
            return Ok(ShareState {
                shared: false,
                share_code: None,
            });
        }

        if let (true, Some(code)) = (project.is_shared, project.share_code) {
            return Ok(ShareState {
                shared: true,
                share_code: Some(code),
            });
        }

        for attempt in 1..=self.max_attempts {
            let candidate = (self.codes)();
            match store.enable_sharing(id, &candidate).await {
                Ok(active) => {
                    info!(project = %id, attempt, "sharing enabled");
                    return Ok(ShareState {
                        shared: true,
                        share_code: Some(active),
                    });
                }
                Err(MetadataError::UniquenessConflict(_)) => {
                    debug!(project = %id, attempt, "share code collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(project = %id, attempts = self.max_attempts, "share code space exhausted");
        Err(ProjectError::ShareCodeExhausted {
            attempts: self.max_attempts,
        })
    }

    /// The shared project holding `code`, with its files.
    ///
    /// Malformed, unknown and revoked codes are all [`ProjectError::NotFound`].
    pub async fn get_by_share_code(&self, code: &str) -> ProjectResult<ProjectView> {
        let code = ShareCode::parse(code).ok_or(ProjectError::NotFound)?;
        let project = self
            .repo
            .store()
            .find_by_share_code(&code)
            .await?
            .ok_or(ProjectError::NotFound)?;
        let files = self.repo.objects().list_and_fetch(&project.src_dir()).await?;
        Ok(project.view_with_files(&files))
    }

    /// Copy the shared project behind `code` into a new project owned by
    /// `caller`, named `"<original> (fork)"`.
    pub async fn fork(&self, caller: &str, code: &str) -> ProjectResult<ProjectView> {
        let shared = self.get_by_share_code(code).await?;
        let forked = self
            .repo
            .create_with_files(
                caller,
                &format!("{} (fork)", shared.name),
                shared.language,
                shared.file_map(),
            )
            .await?;
        info!(source = %shared.id, fork = %forked.id, owner = caller, "project forked");
        Ok(forked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ProjectsConfig;
    use crate::store::InMemoryProjectStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wasmide_compiler::{CompilationOrchestrator, Language, Wasm2Wat};
    use wasmide_storage::{InMemoryObjectStore, ObjectStorageGateway};

    fn controller() -> SharingController {
        let repo = ProjectRepository::new(
            Arc::new(InMemoryProjectStore::new()),
            ObjectStorageGateway::new(Arc::new(InMemoryObjectStore::default())),
            CompilationOrchestrator::new(Arc::new(Wasm2Wat::new(
                "wasm2wat",
                std::time::Duration::from_secs(1),
            ))),
            ProjectsConfig::default(),
        );
        SharingController::new(repo)
    }

    /// Yields `codes` in order, then repeats the last one.
    fn scripted(codes: &[&str]) -> impl Fn() -> ShareCode + Send + Sync + 'static {
        let codes: Vec<ShareCode> = codes.iter().map(|c| ShareCode::parse(c).unwrap()).collect();
        let next = AtomicUsize::new(0);
        move || {
            let i = next.fetch_add(1, Ordering::SeqCst).min(codes.len() - 1);
            codes[i].clone()
        }
    }

    #[tokio::test]
    async fn collision_regenerates_code() {
        let sharing = controller().with_code_source(scripted(&["aaaaaaaa", "aaaaaaaa", "bbbbbbbb"]));
        let a = sharing.repo.create("u1", "a", Language::Go).await.unwrap();
        let b = sharing.repo.create("u2", "b", Language::Go).await.unwrap();

        let first = sharing.toggle_sharing("u1", &a.id, true).await.unwrap();
        let second = sharing.toggle_sharing("u2", &b.id, true).await.unwrap();
        assert_eq!(first.share_code.unwrap().as_str(), "aaaaaaaa");
        assert_eq!(second.share_code.unwrap().as_str(), "bbbbbbbb");
    }

    #[tokio::test]
    async fn exhausted_attempts_are_reported() {
        let sharing = controller()
            .with_code_source(scripted(&["aaaaaaaa"]))
            .with_max_attempts(3);
        let a = sharing.repo.create("u1", "a", Language::Go).await.unwrap();
        let b = sharing.repo.create("u2", "b", Language::Go).await.unwrap();
        sharing.toggle_sharing("u1", &a.id, true).await.unwrap();

        let err = sharing.toggle_sharing("u2", &b.id, true).await.unwrap_err();
        assert!(matches!(err, ProjectError::ShareCodeExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn enabling_twice_returns_same_code() {
        let sharing = controller();
        let p = sharing.repo.create("u1", "p", Language::Go).await.unwrap();
        let first = sharing.toggle_sharing("u1", &p.id, true).await.unwrap();
        let again = sharing.toggle_sharing("u1", &p.id, true).await.unwrap();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn disabling_revokes_access() {
        let sharing = controller();
        let p = sharing.repo.create("u1", "p", Language::Go).await.unwrap();
        let state = sharing.toggle_sharing("u1", &p.id, true).await.unwrap();
        let code = state.share_code.unwrap();
        assert_eq!(sharing.get_by_share_code(code.as_str()).await.unwrap().id, p.id);

        let off = sharing.toggle_sharing("u1", &p.id, false).await.unwrap();
        assert_eq!(
            off,
            ShareState {
                shared: false,
                share_code: None
            }
        );
        assert!(matches!(
            sharing.get_by_share_code(code.as_str()).await,
            Err(ProjectError::NotFound)
        ));
    }

    #[tokio::test]
    async fn only_owner_may_toggle() {
        let sharing = controller();
        let p = sharing.repo.create("u1", "p", Language::Go).await.unwrap();
        assert!(matches!(
            sharing.toggle_sharing("u2", &p.id, true).await,
            Err(ProjectError::NotFound)
        ));
    }

    #[tokio::test]
    async fn malformed_codes_are_not_found() {
        let sharing = controller();
        for code in ["", "short", "has-dash", "12345678"] {
            assert!(matches!(
                sharing.get_by_share_code(code).await,
                Err(ProjectError::NotFound)
            ));
        }
    }
}
