//! Share link handlers

use crate::api::identity::CallerIdentity;
use crate::api::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use wasmide_projects::ProjectView;

/// Read a shared project. The code alone grants access.
pub async fn get_shared(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<ProjectView>> {
    Ok(Json(state.sharing.get_by_share_code(&code).await?))
}

/// Copy a shared project into the caller's account
pub async fn fork_shared(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(code): Path<String>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    let fork = state.sharing.fork(caller.as_str(), &code).await?;
    Ok((StatusCode::CREATED, Json(fork)))
}
