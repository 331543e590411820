//! Authentication route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::user::UserProfile;
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    access_token: String,
    user: UserProfile,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth = AuthService::new(state.store(), state.tokens());
    let (access_token, user) = auth.login(&body.username, &body.password).await?;

    Ok(Json(LoginResponse {
        access_token,
        user: user.profile(),
    }))
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<AppState>,
    RequireUser(claims): RequireUser,
) -> Result<Json<UserProfile>> {
    let auth = AuthService::new(state.store(), state.tokens());
    let user = auth.get_user(&claims.user_id()).await?;
    Ok(Json(user.profile()))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

/// `POST /api/auth/change-password`
pub async fn change_password(
    State(state): State<AppState>,
    RequireUser(claims): RequireUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    let auth = AuthService::new(state.store(), state.tokens());
    auth.change_password(&claims.user_id(), &body.old_password, &body.new_password)
        .await?;
    Ok(Json(json!({ "message": "password updated" })))
}
