//! Bearer-token extractors.
//!
//! Handlers ask for [`RequireUser`] when a route needs an authenticated
//! caller, or [`OptionalUser`] when authentication merely changes behavior.
//! Both read the `Authorization: Bearer` header and verify against the
//! state's [`TokenService`](crate::services::TokenService).

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::Claims;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(claims): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", claims.sub)
/// }
/// ```
pub struct RequireUser(pub Claims);

/// Rejection for a missing or invalid bearer token.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "authentication required" })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthRejection)?;
        let claims = state.tokens().verify(token).map_err(|_| AuthRejection)?;
        Ok(Self(claims))
    }
}

/// Extractor that reads a bearer token if one is present and valid.
///
/// Unlike [`RequireUser`], this never rejects the request; an absent or
/// invalid token simply yields `None`.
pub struct OptionalUser(pub Option<Claims>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims =
            bearer_token(&parts.headers).and_then(|token| state.tokens().verify(token).ok());
        Ok(Self(claims))
    }
}

/// Pull the token out of an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
