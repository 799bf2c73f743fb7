// Access token signing and refresh token lifecycle

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::models::{NewRefreshToken, Role, TokenPair, User};
use crate::auth::repository::{RefreshTokenRepository, UserRepository};
use crate::config::TokenConfig;
use crate::error::{ErrorKind, ServiceError, ServiceResult};

/// Number of random bytes behind every refresh token
pub const REFRESH_TOKEN_BYTES: usize = 64;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub roles: Vec<Role>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Claims are a pure function of the user identity and the issue window
    pub fn for_user(user: &User, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user.id,
            email: user.email.clone(),
            given_name: user.first_name.clone(),
            family_name: user.last_name.clone(),
            roles: user.roles.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// HS256 signer/verifier for access tokens
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

impl JwtCodec {
    pub fn new(secret: &str, access_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue_access_token(&self, user: &User, now: DateTime<Utc>) -> ServiceResult<String> {
        self.sign(&Claims::for_user(user, now, self.access_ttl))
    }

    pub fn sign(&self, claims: &Claims) -> ServiceResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|e| {
            error!("Failed to sign access token: {}", e);
            ServiceError::unknown("Failed to issue access token")
        })
    }

    /// Verifies signature and expiry
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}

/// SHA-256 hex digest under which refresh tokens are stored
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_refresh_token_value() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Mints, rotates and validates the access/refresh credential pair
pub struct TokenIssuer {
    codec: JwtCodec,
    refresh_ttl: Duration,
    tokens: Arc<dyn RefreshTokenRepository>,
    users: Arc<dyn UserRepository>,
}

impl TokenIssuer {
    pub fn new(
        codec: JwtCodec,
        refresh_ttl: Duration,
        tokens: Arc<dyn RefreshTokenRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            codec,
            refresh_ttl,
            tokens,
            users,
        }
    }

    pub fn from_config(
        config: &TokenConfig,
        tokens: Arc<dyn RefreshTokenRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self::new(
            JwtCodec::new(&config.secret, config.access_token_ttl),
            config.refresh_token_ttl,
            tokens,
            users,
        )
    }

    pub fn codec(&self) -> &JwtCodec {
        &self.codec
    }

    fn prepare_refresh_token(&self, user_id: Uuid, now: DateTime<Utc>) -> (String, NewRefreshToken) {
        let value = generate_refresh_token_value();
        let record = NewRefreshToken {
            token_hash: hash_refresh_token(&value),
            user_id,
            issued_at: now,
            expires_at: now + self.refresh_ttl,
        };
        (value, record)
    }

    /// Issues a new pair for a user whose roles are loaded
    pub async fn generate_tokens(&self, user: &User) -> ServiceResult<TokenPair> {
        let now = Utc::now();
        let access_token = self.codec.issue_access_token(user, now)?;
        let (refresh_token, record) = self.prepare_refresh_token(user.id, now);

        self.tokens.insert(record).await?;
        debug!("Issued token pair for user {}", user.id);

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// One-shot exchange of a refresh token for a new pair
    pub async fn refresh_tokens(&self, old_refresh_token: &str) -> ServiceResult<TokenPair> {
        let stored = self
            .tokens
            .find_by_hash(&hash_refresh_token(old_refresh_token))
            .await?
            .ok_or_else(|| ServiceError::new(ErrorKind::RecordNotFound, "Refresh token not found"))?;

        if stored.revoked {
            warn!("Revoked refresh token presented for user {}", stored.user_id);
            return Err(ServiceError::forbidden("Refresh token has been revoked"));
        }

        let now = Utc::now();
        if stored.is_expired_at(now) {
            // Expired tokens are burned on first use
            self.tokens.revoke(stored.id).await?;
            warn!("Expired refresh token presented for user {}", stored.user_id);
            return Err(ServiceError::forbidden("Refresh token has expired"));
        }

        let user = self
            .users
            .find_by_id(stored.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", stored.user_id))?;

        let access_token = self.codec.issue_access_token(&user, now)?;
        let (refresh_token, record) = self.prepare_refresh_token(user.id, now);

        match self.tokens.rotate(stored.id, record).await? {
            Some(_) => {
                info!("Rotated refresh token for user {}", user.id);
                Ok(TokenPair {
                    access_token,
                    refresh_token,
                })
            }
            None => {
                warn!("Refresh token for user {} was used concurrently", user.id);
                Err(ServiceError::forbidden("Refresh token has been revoked"))
            }
        }
    }
}
