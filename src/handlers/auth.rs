//! Authentication boundary
//!
//! Credentials are checked upstream; requests reach this service with the
//! validated user id in `X-User-Id`.

use axum::{Json, extract::FromRequestParts, http::StatusCode, http::request::Parts};

use crate::handlers::error::ApiError;
use crate::models::error::ErrorResponse;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller's user id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| AuthenticatedUser(value.to_string()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::new("Missing authenticated user")),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<AuthenticatedUser, ApiError> {
        let (mut parts, _) = request.into_parts();
        AuthenticatedUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_reads_user_header() {
        let request = Request::builder()
            .header("X-User-Id", " user-42 ")
            .body(())
            .unwrap();
        let user = extract(request).await.unwrap();
        assert_eq!(user.id(), "user-42");
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_is_unauthorized() {
        let (status, _) = extract(Request::builder().body(()).unwrap()).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let blank = Request::builder().header(USER_ID_HEADER, "").body(()).unwrap();
        let (status, _) = extract(blank).await.unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
