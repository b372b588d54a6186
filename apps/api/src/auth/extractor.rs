use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Permissions, UserRow};
use crate::state::AppState;
use crate::users::store;

/// The authenticated caller, extracted from the `Authorization: Bearer` header.
///
/// The user row is re-fetched from the database on every request, so role
/// changes and deactivation take effect immediately rather than at token expiry.
pub struct AuthUser(pub UserRow);

impl AuthUser {
    pub fn permissions(&self) -> Permissions {
        self.0.permissions()
    }

    /// Returns 403 unless the caller's role grants the checked flag.
    pub fn require(&self, check: fn(&Permissions) -> bool) -> Result<(), AppError> {
        if check(&self.permissions()) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Insufficient permissions for this action".to_string(),
            ))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.tokens.validate(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

        let user = store::find_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized(
                "Account has been deactivated".to_string(),
            ));
        }

        Ok(AuthUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/submissions");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extracted() {
        let parts = parts_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header_yields_none() {
        let parts = parts_with_auth(None);
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_non_bearer_scheme_yields_none() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&parts), None);
    }
}
