use thiserror::Error;
use wasmide_compiler::CompilerError;
use wasmide_storage::StorageError;

/// Result type for metadata-store operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Result type for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Metadata-store errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// A unique column (the share code) already holds this value.
    #[error("uniqueness conflict: {0}")]
    UniquenessConflict(String),

    #[error("invalid record: {0}")]
    Serialization(String),

    #[error("metadata backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the project repository and sharing controller.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The project does not exist or belongs to someone else.
    #[error("project not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The project's tree lacks the file compilation starts from.
    #[error("project has no {0}")]
    MissingSourceFile(String),

    /// The requested build artifact has not been produced yet.
    #[error("{0} has not been built")]
    ArtifactMissing(String),

    #[error("no unique share code after {attempts} attempts")]
    ShareCodeExhausted { attempts: u32 },

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metadata(MetadataError),
}

impl From<MetadataError> for ProjectError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(_) => ProjectError::NotFound,
            other => ProjectError::Metadata(other),
        }
    }
}

impl ProjectError {
    /// True when the caller can fix the problem (bad input or bad code).
    pub fn is_user_error(&self) -> bool {
        match self {
            ProjectError::InvalidInput(_) | ProjectError::MissingSourceFile(_) => true,
            ProjectError::Compiler(e) => e.is_user_error(),
            _ => false,
        }
    }
}
