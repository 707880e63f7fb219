//! Error types for wasmided

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasmide_compiler::CompilerError;
use wasmide_projects::{MetadataError, ProjectError};
use wasmide_storage::StorageError;

/// Startup and lifecycle errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("server error: {0}")]
    Server(String),

    #[error("object storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("metadata store error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned from request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// No caller identity was supplied by the auth layer
    #[error("missing caller identity")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl From<CompilerError> for ApiError {
    fn from(err: CompilerError) -> Self {
        ApiError::Project(err.into())
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Status, stable code, message and details shown to the caller.
    ///
    /// Faults on our side get a fixed message; tool paths, object keys and
    /// backend errors stay in the logs.
    fn parts(&self) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
        let project = match self {
            ApiError::Unauthorized => {
                return (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string(), None)
            }
            ApiError::BadRequest(msg) => {
                return (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            ApiError::Project(err) => err,
        };

        match project {
            ProjectError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", project.to_string(), None),
            ProjectError::ArtifactMissing(_) => (
                StatusCode::NOT_FOUND,
                "ARTIFACT_MISSING",
                project.to_string(),
                None,
            ),
            ProjectError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone(), None),
            ProjectError::MissingSourceFile(_) => (
                StatusCode::BAD_REQUEST,
                "MISSING_SOURCE_FILE",
                project.to_string(),
                None,
            ),
            ProjectError::ShareCodeExhausted { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SHARE_CODE_EXHAUSTED",
                "could not allocate a share code, try again".to_string(),
                None,
            ),
            ProjectError::Compiler(CompilerError::Diagnostics(text)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "COMPILE_ERROR",
                text.clone(),
                None,
            ),
            ProjectError::Compiler(CompilerError::Parse { line, message }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PARSE_ERROR",
                message.clone(),
                Some(serde_json::json!({ "line": line })),
            ),
            ProjectError::Compiler(CompilerError::UnsupportedLanguage(_)) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_LANGUAGE",
                project.to_string(),
                None,
            ),
            ProjectError::Compiler(CompilerError::Timeout { secs, .. }) => (
                StatusCode::GATEWAY_TIMEOUT,
                "COMPILE_TIMEOUT",
                format!("compilation did not finish within {secs}s"),
                None,
            ),
            ProjectError::Compiler(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMPILER_UNAVAILABLE",
                "compilation failed".to_string(),
                None,
            ),
            ProjectError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "object storage unavailable".to_string(),
                None,
            ),
            ProjectError::Metadata(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "METADATA_ERROR",
                "metadata store unavailable".to_string(),
                None,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error, details) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        } else {
            tracing::debug!(code, error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for service startup
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn api_error_status_codes() {
        assert_eq!(status(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(ProjectError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status(ProjectError::ArtifactMissing("main.wat".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(ProjectError::InvalidInput("name".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CompilerError::Diagnostics("main.go:3:1: x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(CompilerError::UnsupportedLanguage("Rust".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ProjectError::ShareCodeExhausted { attempts: 16 }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(CompilerError::Timeout {
                tool: "tinygo".into(),
                secs: 60
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn faults_do_not_leak_internals() {
        let cases: Vec<ApiError> = vec![
            CompilerError::ToolInvocation {
                tool: "/opt/tinygo/bin/tinygo".into(),
                message: "executable not found".into(),
            }
            .into(),
            CompilerError::Workspace("/tmp/wasmide-abc: permission denied".into()).into(),
            ProjectError::Storage(StorageError::Backend("AccessDenied for AKIA123".into())).into(),
            ProjectError::Metadata(MetadataError::Backend("postgres://user:pw@db".into())).into(),
        ];
        for err in cases {
            let (status, _, message, _) = err.parts();
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!message.contains('/'), "{message}");
            assert!(!message.contains("AKIA"), "{message}");
        }
    }

    #[test]
    fn diagnostics_are_returned_verbatim() {
        let text = "main.go:4:2: undefined: x\nmain.go:5:1: missing return";
        let (_, code, message, _) = ApiError::from(CompilerError::Diagnostics(text.into())).parts();
        assert_eq!(code, "COMPILE_ERROR");
        assert_eq!(message, text);
    }
}
