//! Application state for API handlers

use wasmide_projects::{ProjectRepository, SharingController};

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub repo: ProjectRepository,

    pub sharing: SharingController,

    /// Service version
    pub version: String,

    /// Service start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// State serving `repo`, with a sharing controller over the same
    /// repository.
    pub fn new(repo: ProjectRepository) -> Self {
        let sharing = SharingController::new(repo.clone());
        Self::with_sharing(repo, sharing)
    }

    pub fn with_sharing(repo: ProjectRepository, sharing: SharingController) -> Self {
        Self {
            repo,
            sharing,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
