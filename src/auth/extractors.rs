use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;

/// Name of the custom header carrying the session token. Not a Bearer
/// scheme; this matches the wire contract the clients already speak.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Extracts and validates the session token, yielding the user id from the
/// signed claim. No database lookup happens here; handlers that need the
/// full record fetch it themselves.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::MissingToken)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys
            .verify_session(token)
            .map_err(|_| ApiError::InvalidSessionToken)?;

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::{Request, StatusCode};

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/user");
        if let Some(v) = value {
            builder = builder.header(AUTH_HEADER, v);
        }
        let (parts, _) = builder.body(()).expect("request").into_parts();
        parts
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let state = AppState::fake("dev-secret");
        let mut parts = parts_with_header(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect_err("should reject");
        assert!(matches!(err, ApiError::MissingToken));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let state = AppState::fake("dev-secret");
        let mut parts = parts_with_header(Some("not-a-token"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect_err("should reject");
        assert!(matches!(err, ApiError::InvalidSessionToken));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_session_token_yields_user_id() {
        let state = AppState::fake("dev-secret");
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_session(user_id).expect("sign");

        let mut parts = parts_with_header(Some(&token));
        let AuthUser(extracted) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("should accept");
        assert_eq!(extracted, user_id);
    }

    #[tokio::test]
    async fn verification_token_is_not_a_session() {
        let state = AppState::fake("dev-secret");
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_verification("a@x.com").expect("sign");

        let mut parts = parts_with_header(Some(&token));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect_err("should reject");
        assert!(matches!(err, ApiError::InvalidSessionToken));
    }
}
