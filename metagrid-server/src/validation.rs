//! Request validation module
//!
//! Extractors and helpers that turn malformed input into structured
//! [`ApiError`] responses instead of axum's plain-text rejections.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::db::User;
use crate::error::ApiError;

/// JSON body extractor whose rejections are `400 INVALID_INPUT`.
///
/// Unknown enum values (`result_type`, `period`) and wrong JSON shapes
/// (`items` that is not an array) are reported with serde's message.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// Query string extractor whose rejections are `400 INVALID_INPUT`.
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// Parse a UUID path segment
pub fn parse_uuid(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value)
        .map_err(|_| ApiError::bad_request(format!("'{}' is not a valid UUID", value)))
}

/// Reject access to another user's per-user record.
///
/// Foreign records are reported as missing so that user ids cannot be probed.
pub fn ensure_owner(user: &User, user_id: &str, resource: &str) -> Result<Uuid, ApiError> {
    let requested = parse_uuid(user_id)?;
    if requested != user.id {
        tracing::warn!(
            user_id = %user.id,
            requested = %requested,
            resource = resource,
            "Rejected access to another user's record"
        );
        return Err(ApiError::not_found(format!("{} not found", resource)));
    }
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use chrono::Utc;
    use metagrid_core::JsonList;
    use serde::Deserialize;

    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            subject: "sub".to_string(),
            email: "a@example.org".to_string(),
            name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[derive(Deserialize)]
    struct Items {
        #[allow(dead_code)]
        items: JsonList,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("PATCH")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_body_accepts_valid_input() {
        let result = JsonBody::<Items>::from_request(json_request(r#"{"items": []}"#), &()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_json_body_wrong_shape_is_bad_request() {
        let result =
            JsonBody::<Items>::from_request(json_request(r#"{"items": {"id": 1}}"#), &()).await;
        let err = result.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("array"));
    }

    #[tokio::test]
    async fn test_json_body_syntax_error_is_bad_request() {
        let result = JsonBody::<Items>::from_request(json_request("{"), &()).await;
        assert_eq!(result.err().unwrap().status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_params_bad_number_is_bad_request() {
        let request = axum::http::Request::builder()
            .uri("/api/v1/projects?page=abc")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let err = QueryParams::<crate::db::PageQuery>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_ensure_owner() {
        let user = user();
        assert_eq!(
            ensure_owner(&user, &user.id.to_string(), "Cart").unwrap(),
            user.id
        );

        let err = ensure_owner(&user, &Uuid::new_v4().to_string(), "Cart").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ensure_owner(&user, "42", "Cart").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
