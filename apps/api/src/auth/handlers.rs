use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::extractor::AuthUser;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::errors::AppError;
use crate::models::user::Role;
use crate::state::AppState;
use crate::users::store;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub agent_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let user = authenticate(&state, &req.agent_id, &req.password).await?;

    store::touch_last_login(&state.db, user.id).await?;
    let token = state.tokens.issue(&user.id, user.role)?;
    info!("Agent {} logged in", user.agent_id);

    Ok(Json(json!({
        "success": true,
        "data": { "token": token, "user": user.to_view() }
    })))
}

/// POST /api/auth/admin-login
///
/// Same credential check as login, but only admin accounts may pass.
pub async fn handle_admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let user = authenticate(&state, &req.agent_id, &req.password).await?;

    if user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Admin access is restricted to administrator accounts".to_string(),
        ));
    }

    store::touch_last_login(&state.db, user.id).await?;
    let token = state.tokens.issue(&user.id, user.role)?;
    info!("Admin {} logged in", user.agent_id);

    Ok(Json(json!({
        "success": true,
        "data": { "token": token, "user": user.to_view() }
    })))
}

/// POST /api/auth/verify-token
///
/// The extractor does the work: token validation, user re-fetch, inactive
/// rejection. Reaching the handler body means the session is valid.
pub async fn handle_verify_token(AuthUser(user): AuthUser) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "success": true,
        "data": { "user": user.to_view() }
    })))
}

/// POST /api/auth/change-password
pub async fn handle_change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    // Re-authenticate before accepting the new password
    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    validate_password_strength(&req.new_password)?;
    let new_hash = hash_password(&req.new_password)?;
    store::set_password_hash(&state.db, user.id, &new_hash).await?;
    info!("Agent {} changed their password", user.agent_id);

    Ok(Json(json!({
        "success": true,
        "message": "Password updated"
    })))
}

async fn authenticate(
    state: &AppState,
    agent_id: &str,
    password: &str,
) -> Result<crate::models::user::UserRow, AppError> {
    let user = store::find_by_agent_id(&state.db, agent_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid agent ID or password".to_string()))?;

    if !user.is_active {
        return Err(AppError::Unauthorized(
            "Account has been deactivated".to_string(),
        ));
    }

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid agent ID or password".to_string(),
        ));
    }

    Ok(user)
}
