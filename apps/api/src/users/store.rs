use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::{Role, UserRow};

/// Column list kept in one place so every query returns a full `UserRow`.
const USER_COLUMNS: &str = "id, agent_id, name, email, password_hash, role, branch, \
     is_active, last_login, created_at, updated_at";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_agent_id(
    pool: &PgPool,
    agent_id: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE agent_id = $1"
    ))
    .bind(agent_id)
    .fetch_optional(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<UserRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn agent_id_taken(pool: &PgPool, agent_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE agent_id = $1)")
        .bind(agent_id)
        .fetch_one(pool)
        .await
}

pub async fn email_taken(
    pool: &PgPool,
    email: &str,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(pool)
    .await
}

pub struct NewUser<'a> {
    pub agent_id: &'a str,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: Role,
    pub branch: Option<&'a str>,
}

pub async fn insert(pool: &PgPool, user: NewUser<'_>) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO users (id, agent_id, name, email, password_hash, role, branch, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, true)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user.agent_id)
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role)
    .bind(user.branch)
    .fetch_one(pool)
    .await
}

pub struct UserUpdate<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub role: Role,
    pub branch: Option<&'a str>,
    pub is_active: bool,
    pub password_hash: Option<&'a str>,
}

/// Writes the full updated state of a user. Permission flags are never stored;
/// they are recomputed from the role on read, so a role change here is enough.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    update: UserUpdate<'_>,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE users
        SET name = $2,
            email = $3,
            role = $4,
            branch = $5,
            is_active = $6,
            password_hash = COALESCE($7, password_hash),
            updated_at = now()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(update.name)
    .bind(update.email)
    .bind(update.role)
    .bind(update.branch)
    .bind(update.is_active)
    .bind(update.password_hash)
    .fetch_optional(pool)
    .await
}

/// Soft delete: the account stays for audit history but can no longer log in.
pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET is_active = false, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_password_hash(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}
