use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password::{hash_password, validate_password_strength};
use crate::errors::AppError;
use crate::models::user::{agent_id_matches_role, Role};
use crate::state::AppState;
use crate::users::store;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub agent_id: String,
    pub name: String,
    pub email: Option<String>,
    pub password: String,
    pub role: Role,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub branch: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// GET /api/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_manage_users)?;

    let users = store::list(&state.db).await?;
    let views: Vec<_> = users.iter().map(|u| u.to_view()).collect();

    Ok(Json(json!({ "success": true, "data": { "users": views } })))
}

/// POST /api/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_manage_users)?;

    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if !agent_id_matches_role(&req.agent_id, req.role) {
        return Err(AppError::Validation(format!(
            "Agent ID must be the role prefix '{}' followed by digits",
            req.role.agent_prefix()
        )));
    }
    let branch = normalize_branch(req.branch.as_deref(), req.role)?;
    validate_password_strength(&req.password)?;

    if store::agent_id_taken(&state.db, &req.agent_id).await? {
        return Err(AppError::Validation(format!(
            "Agent ID {} is already registered",
            req.agent_id
        )));
    }
    if let Some(email) = req.email.as_deref() {
        if store::email_taken(&state.db, email, None).await? {
            return Err(AppError::Validation(format!(
                "Email {email} is already registered"
            )));
        }
    }

    let password_hash = hash_password(&req.password)?;
    let user = store::insert(
        &state.db,
        store::NewUser {
            agent_id: &req.agent_id,
            name: req.name.trim(),
            email: req.email.as_deref(),
            password_hash: &password_hash,
            role: req.role,
            branch,
        },
    )
    .await?;

    info!("Created user {} ({:?})", user.agent_id, user.role);

    Ok(Json(json!({ "success": true, "data": { "user": user.to_view() } })))
}

/// GET /api/users/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_manage_users)?;

    let user = store::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    Ok(Json(json!({ "success": true, "data": { "user": user.to_view() } })))
}

/// PUT /api/users/:id
///
/// A role change implicitly changes the permission set: flags are derived from
/// the role on read and never stored, so there is nothing else to update.
pub async fn handle_update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_manage_users)?;

    let existing = store::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    let role = req.role.unwrap_or(existing.role);
    if !agent_id_matches_role(&existing.agent_id, role) {
        return Err(AppError::Validation(format!(
            "Agent ID {} does not match the '{}' prefix required for the new role",
            existing.agent_id,
            role.agent_prefix()
        )));
    }

    let name = req.name.as_deref().unwrap_or(&existing.name).trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let email = req.email.or(existing.email);
    if let Some(email) = email.as_deref() {
        if store::email_taken(&state.db, email, Some(id)).await? {
            return Err(AppError::Validation(format!(
                "Email {email} is already registered"
            )));
        }
    }

    let requested_branch = req.branch.or(existing.branch);
    let branch = normalize_branch(requested_branch.as_deref(), role)?;

    let password_hash = match req.password.as_deref() {
        Some(password) => {
            validate_password_strength(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let updated = store::update(
        &state.db,
        id,
        store::UserUpdate {
            name,
            email: email.as_deref(),
            role,
            branch,
            is_active: req.is_active.unwrap_or(existing.is_active),
            password_hash: password_hash.as_deref(),
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    info!("Updated user {} ({:?})", updated.agent_id, updated.role);

    Ok(Json(
        json!({ "success": true, "data": { "user": updated.to_view() } }),
    ))
}

/// DELETE /api/users/:id — soft delete.
pub async fn handle_delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    caller.require(|p| p.can_manage_users)?;

    if !store::deactivate(&state.db, id).await? {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }

    info!("Deactivated user {id}");

    Ok(Json(json!({ "success": true, "message": "User deactivated" })))
}

/// Branch is required for every role except admin; admins carry none.
fn normalize_branch(branch: Option<&str>, role: Role) -> Result<Option<&str>, AppError> {
    let branch = branch.map(str::trim).filter(|b| !b.is_empty());
    if role.requires_branch() && branch.is_none() {
        return Err(AppError::Validation(
            "Branch is required for non-admin roles".to_string(),
        ));
    }
    Ok(if role.requires_branch() { branch } else { None })
}
