pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::state::AppState;
use crate::submissions::handlers as submissions;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Submissions
        .route(
            "/api/submissions",
            post(submissions::handle_create_submission).get(submissions::handle_list_submissions),
        )
        .route(
            "/api/submissions/:id",
            get(submissions::handle_get_submission).delete(submissions::handle_delete_submission),
        )
        .route(
            "/api/submissions/:id/status",
            put(submissions::handle_update_status),
        )
        .route(
            "/api/submissions/:id/image",
            post(submissions::handle_replace_image),
        )
        .route(
            "/api/submissions/:id/generate-profile",
            post(submissions::handle_generate_profile),
        )
        // Auth
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/admin-login", post(auth::handle_admin_login))
        .route("/api/auth/verify-token", post(auth::handle_verify_token))
        .route(
            "/api/auth/change-password",
            post(auth::handle_change_password),
        )
        // Users
        .route(
            "/api/users",
            get(users::handle_list_users).post(users::handle_create_user),
        )
        .route(
            "/api/users/:id",
            get(users::handle_get_user)
                .put(users::handle_update_user)
                .delete(users::handle_delete_user),
        )
        .with_state(state)
}
