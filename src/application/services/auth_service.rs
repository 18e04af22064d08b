//! Token Verification Service
//!
//! Verifies the access tokens presented in `auth` frames. Tokens are issued
//! by the REST authentication flow; this side only checks them.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::domain::value_objects::UserId;

/// Token verification trait for dependency injection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token and resolve the user it was issued to
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError>;
}

/// Identity extracted from a valid token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    #[serde(alias = "sub")]
    pub id: String,
    /// Email the token was issued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token carries no user id")]
    MissingSubject,
}

/// HS256 JWT implementation of `TokenVerifier`
pub struct JwtTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    /// Create a verifier for tokens signed with `secret`
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn from_settings(settings: &JwtSettings) -> Self {
        Self::new(&settings.secret)
    }

    /// Decode and validate a token
    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let claims = self.decode_claims(token)?;

        if claims.id.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }

        Ok(VerifiedToken {
            user_id: claims.id,
            email: claims.email,
        })
    }
}
