//! Project handlers

use crate::api::identity::CallerIdentity;
use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use wasmide_compiler::{ExportedFunction, Language};
use wasmide_projects::{FileView, ProjectId, ProjectView, ShareState};
use wasmide_storage::FileMap;

/// Create project request
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    /// `Go` or `AssemblyScript` (case-insensitive)
    pub language: String,
}

/// List the caller's projects, oldest first
pub async fn list_projects(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> ApiResult<Json<Vec<ProjectView>>> {
    Ok(Json(state.repo.list(caller.as_str()).await?))
}

/// Create a project seeded with its language's starter files
pub async fn create_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    let language: Language = request.language.parse()?;
    let view = state
        .repo
        .create(caller.as_str(), &request.name, language)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Default, Deserialize)]
pub struct GetProjectQuery {
    /// Also return a URL to the last compiled module, if any
    #[serde(default)]
    pub wasm_url: bool,
}

/// Get a project with its files
pub async fn get_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    Query(query): Query<GetProjectQuery>,
) -> ApiResult<Json<ProjectView>> {
    let id = ProjectId::from(id);
    Ok(Json(state.repo.get(caller.as_str(), &id, query.wasm_url).await?))
}

#[derive(Debug, Deserialize)]
pub struct RenameProjectRequest {
    pub name: String,
}

/// Rename a project
pub async fn rename_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    Json(request): Json<RenameProjectRequest>,
) -> ApiResult<Json<ProjectView>> {
    let id = ProjectId::from(id);
    Ok(Json(state.repo.rename(caller.as_str(), &id, &request.name).await?))
}

/// Delete a project and its stored files
pub async fn delete_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = ProjectId::from(id);
    state.repo.delete(caller.as_str(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// One file in an update request
#[derive(Debug, Deserialize)]
pub struct FileInput {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFilesRequest {
    pub files: Vec<FileInput>,
}

/// Write the given files, keeping any not mentioned
pub async fn update_files(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    Json(request): Json<UpdateFilesRequest>,
) -> ApiResult<Json<Vec<FileView>>> {
    let mut files = FileMap::new();
    for file in request.files {
        if files.insert(file.name.clone(), file.content).is_some() {
            return Err(ApiError::BadRequest(format!("file `{}` listed twice", file.name)));
        }
    }
    let id = ProjectId::from(id);
    Ok(Json(state.repo.update_files(caller.as_str(), &id, files).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompileResponse {
    pub wasm_url: String,
}

/// Compile the project and store its artifacts
pub async fn compile_project(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<CompileResponse>> {
    let id = ProjectId::from(id);
    let wasm_url = state.repo.compile(caller.as_str(), &id).await?;
    Ok(Json(CompileResponse { wasm_url }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WatResponse {
    pub wat_url: String,
}

/// URL to the text form of the last build
pub async fn get_wat(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<WatResponse>> {
    let id = ProjectId::from(id);
    let wat_url = state.repo.wat_url(caller.as_str(), &id).await?;
    Ok(Json(WatResponse { wat_url }))
}

/// `//export` functions of a Go project
pub async fn list_exports(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ExportedFunction>>> {
    let id = ProjectId::from(id);
    Ok(Json(state.repo.exports(caller.as_str(), &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub enable: bool,
}

/// Turn the project's share link on or off
pub async fn toggle_share(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    Json(request): Json<ShareRequest>,
) -> ApiResult<Json<ShareState>> {
    let id = ProjectId::from(id);
    Ok(Json(
        state
            .sharing
            .toggle_sharing(caller.as_str(), &id, request.enable)
            .await?,
    ))
}
