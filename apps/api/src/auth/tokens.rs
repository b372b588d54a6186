use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (UUID) of the authenticated account.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates the signed, time-limited session tokens.
#[derive(Clone)]
pub struct TokenService {
    jwt_secret: String,
    expiry_hours: i64,
}

impl TokenService {
    pub fn new(jwt_secret: String, expiry_hours: i64) -> Self {
        Self {
            jwt_secret,
            expiry_hours,
        }
    }

    /// Generates a session token for the given user.
    pub fn issue(&self, user_id: &Uuid, role: Role) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + self.expiry_hours * 3600,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))
    }

    /// Validates a token and returns its claims. Expired and tampered tokens
    /// both map to 401.
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Token has expired".to_string())
            }
            _ => AppError::Unauthorized("Invalid token".to_string()),
        })?;
        Ok(data.claims)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("jwt_secret", &"<redacted>")
            .field("expiry_hours", &self.expiry_hours)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-key-minimum-32-characters-long".to_string(), 24)
    }

    #[test]
    fn test_issue_then_validate_roundtrip() {
        let svc = service();
        let user_id = Uuid::new_v4();

        let token = svc.issue(&user_id, Role::LoanOfficer).unwrap();
        let claims = svc.validate(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::LoanOfficer);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_validate_rejects_wrong_secret() {
        let svc = service();
        let other = TokenService::new("a-completely-different-secret-value-here".to_string(), 24);
        let token = svc.issue(&Uuid::new_v4(), Role::Admin).unwrap();

        let result = other.validate(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_validate_rejects_expired_token() {
        let svc = service();
        let now = Utc::now().timestamp();
        let expired = Claims {
            sub: Uuid::new_v4().to_string(),
            role: Role::FieldAgent,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &expired,
            &EncodingKey::from_secret("test-secret-key-minimum-32-characters-long".as_bytes()),
        )
        .unwrap();

        let result = svc.validate(&token);
        match result {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("expired")),
            other => panic!("Expected expired-token rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let svc = service();
        assert!(svc.validate("not.a.token").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let svc = service();
        let debug_output = format!("{svc:?}");
        assert!(!debug_output.contains("test-secret-key"));
        assert!(debug_output.contains("<redacted>"));
    }
}
