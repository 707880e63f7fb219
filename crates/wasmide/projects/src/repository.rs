use crate::error::{ProjectError, ProjectResult};
use crate::model::{default_files, FileView, Project, ProjectId, ProjectView, WASM_FILE, WAT_FILE};
use crate::store::ProjectStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wasmide_compiler::{
    parse_exports, CompilationOrchestrator, CompileOptions, CompilerError, ExportedFunction, Language,
};
use wasmide_storage::{join_key, FileMap, ObjectStorageGateway, StorageError};

/// Tunables for project operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Validity of presigned artifact URLs.
    #[serde(default = "default_presign_ttl_secs")]
    pub presign_ttl_secs: u64,

    /// Share codes tried before giving up on enabling sharing.
    #[serde(default = "default_share_code_attempts")]
    pub share_code_attempts: u32,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            presign_ttl_secs: default_presign_ttl_secs(),
            share_code_attempts: default_share_code_attempts(),
        }
    }
}

impl ProjectsConfig {
    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }
}

fn default_presign_ttl_secs() -> u64 {
    7 * 24 * 3600
}

fn default_share_code_attempts() -> u32 {
    16
}

const MAX_NAME_LEN: usize = 128;

fn validate_name(name: &str) -> ProjectResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProjectError::InvalidInput("project name is empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ProjectError::InvalidInput(format!(
            "project name is longer than {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_file_names(files: &FileMap) -> ProjectResult<()> {
    for name in files.keys() {
        let bad = name.is_empty()
            || name.starts_with('/')
            || name.contains('\\')
            || name.split('/').any(|part| part.is_empty() || part == "..");
        if bad {
            return Err(ProjectError::InvalidInput(format!("invalid file name `{name}`")));
        }
    }
    Ok(())
}

/// Coordinates project metadata, object storage and compilation.
///
/// Every operation taking a caller compares it with the project owner; a
/// mismatch is reported exactly like a missing project.
#[derive(Clone)]
pub struct ProjectRepository {
    store: Arc<dyn ProjectStore>,
    objects: ObjectStorageGateway,
    compiler: CompilationOrchestrator,
    config: ProjectsConfig,
}

impl std::fmt::Debug for ProjectRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectRepository")
            .field("compiler", &self.compiler)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProjectRepository {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        objects: ObjectStorageGateway,
        compiler: CompilationOrchestrator,
        config: ProjectsConfig,
    ) -> Self {
        Self {
            store,
            objects,
            compiler,
            config,
        }
    }

    pub fn config(&self) -> &ProjectsConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &Arc<dyn ProjectStore> {
        &self.store
    }

    pub(crate) fn objects(&self) -> &ObjectStorageGateway {
        &self.objects
    }

    /// The metadata row of `id`, if `caller` owns it.
    pub(crate) async fn owned(&self, caller: &str, id: &ProjectId) -> ProjectResult<Project> {
        match self.store.get(id).await? {
            Some(project) if project.is_owned_by(caller) => Ok(project),
            Some(_) => {
                debug!(project = %id, caller, "ownership mismatch");
                Err(ProjectError::NotFound)
            }
            None => Err(ProjectError::NotFound),
        }
    }

    /// Create a project seeded with the language's starter files.
    pub async fn create(&self, owner: &str, name: &str, language: Language) -> ProjectResult<ProjectView> {
        self.create_with_files(owner, name, language, default_files(language))
            .await
    }

    /// Create a project holding `files`.
    ///
    /// The metadata row is written first; nothing is uploaded if that fails.
    pub async fn create_with_files(
        &self,
        owner: &str,
        name: &str,
        language: Language,
        files: FileMap,
    ) -> ProjectResult<ProjectView> {
        let name = validate_name(name)?;
        validate_file_names(&files)?;

        let project = Project::new(owner, name, language);
        self.store.insert(&project).await?;
        self.objects.upload_many(&project.src_dir(), &files).await?;

        info!(
            project = %project.id,
            owner,
            %language,
            files = files.len(),
            "project created"
        );
        Ok(project.view_with_files(&files))
    }

    /// Projects owned by `owner`, without files.
    pub async fn list(&self, owner: &str) -> ProjectResult<Vec<ProjectView>> {
        let projects = self.store.list_by_owner(owner).await?;
        Ok(projects.iter().map(Project::view).collect())
    }

    /// A project with its files, and optionally a URL to its last build.
    pub async fn get(&self, caller: &str, id: &ProjectId, with_wasm_url: bool) -> ProjectResult<ProjectView> {
        let project = self.owned(caller, id).await?;
        let files = self.objects.list_and_fetch(&project.src_dir()).await?;
        let mut view = project.view_with_files(&files);
        if with_wasm_url {
            view.wasm_url = match self.artifact_url(&project, WASM_FILE).await {
                Ok(url) => Some(url),
                Err(ProjectError::ArtifactMissing(_)) => None,
                Err(e) => return Err(e),
            };
        }
        Ok(view)
    }

    /// Replace the project's files with `files` and echo them back.
    ///
    /// Every given file is rewritten; files absent from the map are kept.
    pub async fn update_files(&self, caller: &str, id: &ProjectId, files: FileMap) -> ProjectResult<Vec<FileView>> {
        validate_file_names(&files)?;
        let project = self.owned(caller, id).await?;
        self.objects.upload_many(&project.src_dir(), &files).await?;
        debug!(project = %id, files = files.len(), "files updated");
        Ok(FileView::from_files(&files))
    }

    /// Delete the metadata row, then everything stored under the project.
    /// Object deletion is best effort.
    pub async fn delete(&self, caller: &str, id: &ProjectId) -> ProjectResult<()> {
        let project = self.owned(caller, id).await?;
        if !self.store.delete(id).await? {
            return Err(ProjectError::NotFound);
        }
        if let Err(e) = self.objects.delete_prefix(&project.dir()).await {
            warn!(project = %id, error = %e, "project files left behind");
        }
        info!(project = %id, "project deleted");
        Ok(())
    }

    pub async fn rename(&self, caller: &str, id: &ProjectId, name: &str) -> ProjectResult<ProjectView> {
        let name = validate_name(name)?;
        self.owned(caller, id).await?;
        let project = self.store.rename(id, &name).await?;
        Ok(project.view())
    }

    async fn seed_source(&self, project: &Project) -> ProjectResult<String> {
        let seed = project.language.seed_file_name();
        let path = join_key(&project.src_dir(), seed);
        let bytes = match self.objects.fetch(&path).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => {
                return Err(ProjectError::MissingSourceFile(seed.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        String::from_utf8(bytes).map_err(|_| StorageError::Encoding(path).into())
    }

    /// Compile the project's seed file, store `main.wasm` (and `main.wat`
    /// when produced) under `build/`, and return a URL to the module.
    pub async fn compile(&self, caller: &str, id: &ProjectId) -> ProjectResult<String> {
        let project = self.owned(caller, id).await?;
        let source = self.seed_source(&project).await?;

        let result = self
            .compiler
            .compile(project.language, &source, CompileOptions { gen_text: true })
            .await?;

        let build = project.build_dir();
        let (wasm, wat) = (result.wasm, result.wat);
        let (wasm_upload, wat_upload) = tokio::join!(
            self.objects.upload(&build, WASM_FILE, wasm),
            async {
                match wat {
                    Some(wat) => self.objects.upload(&build, WAT_FILE, wat.into_bytes()).await,
                    None => {
                        // A text form from an older build no longer matches.
                        let stale = join_key(&build, WAT_FILE);
                        if let Err(e) = self.objects.store().delete_object(&stale).await {
                            warn!(project = %id, error = %e, "stale text artifact kept");
                        }
                        Ok(())
                    }
                }
            }
        );
        wasm_upload?;
        wat_upload?;

        info!(project = %id, language = %project.language, "project compiled");
        self.artifact_url(&project, WASM_FILE).await
    }

    /// URL to the text disassembly of the last build.
    pub async fn wat_url(&self, caller: &str, id: &ProjectId) -> ProjectResult<String> {
        let project = self.owned(caller, id).await?;
        self.artifact_url(&project, WAT_FILE).await
    }

    async fn artifact_url(&self, project: &Project, file: &str) -> ProjectResult<String> {
        let path = join_key(&project.build_dir(), file);
        let present = self.objects.store().list_objects(&path).await?;
        if !present.iter().any(|k| k == &path) {
            return Err(ProjectError::ArtifactMissing(file.to_string()));
        }
        Ok(self.objects.presign(&path, self.config.presign_ttl()).await?)
    }

    /// `//export` functions of a Go project's `main.go`.
    pub async fn exports(&self, caller: &str, id: &ProjectId) -> ProjectResult<Vec<ExportedFunction>> {
        let project = self.owned(caller, id).await?;
        if !project.language.supports_export_markers() {
            return Err(CompilerError::UnsupportedLanguage(format!(
                "export scanning for {}",
                project.language
            ))
            .into());
        }
        let source = self.seed_source(&project).await?;
        let mut exports = parse_exports(&source)?;
        exports.sort_by_key(|e| e.decl.line);
        Ok(exports)
    }
}
