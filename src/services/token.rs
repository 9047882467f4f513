//! Bearer token issuance and verification.
//!
//! Tokens are stateless HMAC-signed JWTs carrying the username as `sub`.
//! Callers only see [`TokenIssuer`], so a revocable session store can
//! replace [`JwtTokenIssuer`] without touching them.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::config::{MAX_TOKEN_LIFETIME_MINUTES, SecurityConfig};
use crate::services::auth_service::AuthError;

pub const TOKEN_TYPE: &str = "bearer";

/// Claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username.
    pub sub: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenIssuer: Send + Sync {
    fn issue(&self, subject: &str) -> Result<IssuedToken, AuthError>;

    /// Returns the subject of a valid, unexpired token.
    fn verify(&self, token: &str) -> Result<String, AuthError>;
}

pub struct JwtTokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl JwtTokenIssuer {
    #[must_use]
    pub fn new(secret: &[u8], algorithm: Algorithm, lifetime: Duration) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> anyhow::Result<Self> {
        let algorithm = Algorithm::from_str(&config.jwt_algorithm).map_err(|e| {
            anyhow::anyhow!("Invalid token algorithm {}: {e}", config.jwt_algorithm)
        })?;
        let lifetime = Some(config.access_token_expire_minutes)
            .filter(|minutes| *minutes <= MAX_TOKEN_LIFETIME_MINUTES)
            .and_then(|minutes| i64::try_from(minutes).ok())
            .and_then(Duration::try_minutes)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Token lifetime out of range: {} minutes",
                    config.access_token_expire_minutes
                )
            })?;

        Ok(Self::new(config.jwt_secret.as_bytes(), algorithm, lifetime))
    }

    /// Issue a token as if it were created at `issued_at`.
    pub fn issue_at(
        &self,
        subject: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = issued_at
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| AuthError::Internal("Token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let header = Header::new(self.algorithm);
        let access_token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("JWT encode: {e}")))?;

        Ok(IssuedToken {
            access_token,
            expires_at,
        })
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, subject: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(subject, Utc::now())
    }

    fn verify(&self, token: &str) -> Result<String, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::TokenInvalid("missing subject".to_string()));
        }

        Ok(data.claims.sub)
    }
}
