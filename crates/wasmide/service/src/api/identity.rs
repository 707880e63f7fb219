//! Caller identity, as asserted by the upstream auth layer

use crate::error::ApiError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller. The id becomes the first segment of every object
/// key the caller owns, so it must be a single clean path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(ApiError::Unauthorized)?
            .to_str()
            .map_err(|_| ApiError::BadRequest(format!("{USER_ID_HEADER} is not valid text")))?
            .trim();

        if raw.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        if raw.contains('/') || raw.contains('\\') || raw == "." || raw == ".." {
            return Err(ApiError::BadRequest(format!(
                "{USER_ID_HEADER} must be a single path segment"
            )));
        }
        Ok(Self(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(value: Option<&str>) -> Result<CallerIdentity, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CallerIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn accepts_plain_ids() {
        assert_eq!(extract(Some(" user-1 ")).await.unwrap().as_str(), "user-1");
    }

    #[tokio::test]
    async fn missing_or_blank_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(ApiError::Unauthorized)));
        assert!(matches!(extract(Some("  ")).await, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn path_like_ids_are_rejected() {
        for id in ["a/b", "..", "a\\b"] {
            assert!(matches!(extract(Some(id)).await, Err(ApiError::BadRequest(_))), "{id}");
        }
    }
}
