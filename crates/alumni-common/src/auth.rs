//! Bearer token validation for identities issued by the external identity provider.
//!
//! Alumni Connect never issues or refreshes tokens itself; it only checks the
//! HS256 signature and expiry and trusts the `{sub, role}` claims it finds.

use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AlumniError;
use crate::models::user::Role;

/// JWT claims carried by every authenticated request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as string)
    pub sub: String,
    /// Role granted by the identity provider
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// The authenticated subject of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Validate and decode a JWT token into the caller's identity.
pub fn validate_token(token: &str, secret: &str) -> Result<Identity, AlumniError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AlumniError::TokenExpired,
        _ => AlumniError::InvalidToken,
    })?;

    let user_id = token_data
        .claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AlumniError::InvalidToken)?;

    Ok(Identity::new(user_id, token_data.claims.role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(sub: &str, role: Role, exp_offset: i64, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            role,
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let id = Uuid::now_v7();
        let t = token(&id.to_string(), Role::Alumni, 600, "secret");
        let identity = validate_token(&t, "secret").unwrap();
        assert_eq!(identity, Identity::new(id, Role::Alumni));
    }

    #[test]
    fn rejects_wrong_secret() {
        let t = token(&Uuid::now_v7().to_string(), Role::Student, 600, "secret");
        assert!(matches!(
            validate_token(&t, "other"),
            Err(AlumniError::InvalidToken)
        ));
    }

    #[test]
    fn reports_expiry_separately() {
        let t = token(&Uuid::now_v7().to_string(), Role::Student, -3600, "secret");
        assert!(matches!(
            validate_token(&t, "secret"),
            Err(AlumniError::TokenExpired)
        ));
    }

    #[test]
    fn rejects_non_uuid_subject() {
        let t = token("not-a-user", Role::Student, 600, "secret");
        assert!(matches!(
            validate_token(&t, "secret"),
            Err(AlumniError::InvalidToken)
        ));
    }
}
