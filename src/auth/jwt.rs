use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::role::Role;

/// Access-token claims as issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

/// Sign an access token with the shared secret.
///
/// The service never logs anyone in; this exists for the identity provider's
/// side of the contract and for tests.
pub fn issue_access_token(
    subject: &str,
    role: Role,
    employee_id: Option<u64>,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    let claims = Claims {
        sub: subject.to_string(),
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        employee_id,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let token = issue_access_token("grace", Role::Admin, Some(7), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "grace");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.employee_id, Some(7));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_access_token("grace", Role::Employee, None, "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
