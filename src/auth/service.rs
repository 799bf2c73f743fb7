// Authentication service - business logic layer

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    models::{LoginRequest, NewUser, RegisterRequest, Role, TokenPair, User},
    password::{PasswordService, PasswordVerification},
    repository::{RefreshTokenRepository, UserRepository},
    token::{hash_refresh_token, TokenIssuer},
};
use crate::error::{ServiceError, ServiceResult};
use crate::validation::{ensure_adult, normalize_email};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Authentication service coordinating registration, login and session revocation
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn RefreshTokenRepository>,
    passwords: Arc<dyn PasswordService>,
    issuer: TokenIssuer,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn RefreshTokenRepository>,
        passwords: Arc<dyn PasswordService>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            users,
            tokens,
            passwords,
            issuer,
        }
    }

    /// Creates an account with the default `User` role; does not log the user in
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<User> {
        request.validate()?;
        ensure_adult(request.date_of_birth, Utc::now().date_naive())?;

        let email = normalize_email(&request.email);
        if self.users.email_taken(&email, None).await? {
            warn!("Registration attempted with existing email");
            return Err(ServiceError::already_exists("User with email", &email));
        }

        let password_hash = self.hash(request.password).await?;

        let user = self
            .users
            .create_with_role(
                NewUser {
                    first_name: request.first_name.trim().to_string(),
                    last_name: request.last_name.trim().to_string(),
                    email,
                    password_hash,
                    date_of_birth: request.date_of_birth,
                    registered_at: Utc::now(),
                },
                Role::User,
            )
            .await?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Verifies credentials and issues a token pair.
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<TokenPair> {
        if request.validate().is_err() {
            return Err(ServiceError::invalid_input(INVALID_CREDENTIALS));
        }

        let email = normalize_email(&request.email);
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                debug!("Login failed: no account for email");
                return Err(ServiceError::invalid_input(INVALID_CREDENTIALS));
            }
        };

        let passwords = self.passwords.clone();
        let stored_hash = user.password_hash.clone();
        let candidate = request.password.clone();
        let verification = tokio::task::spawn_blocking(move || {
            passwords.verify_password(&stored_hash, &candidate)
        })
        .await?;

        match verification {
            PasswordVerification::Failed => {
                warn!("Login failed: wrong password for user {}", user.id);
                return Err(ServiceError::invalid_input(INVALID_CREDENTIALS));
            }
            PasswordVerification::SuccessRehashNeeded => {
                self.upgrade_hash(user.id, request.password).await;
            }
            PasswordVerification::Success => {}
        }

        let pair = self.issuer.generate_tokens(&user).await?;
        info!("User {} logged in", user.id);
        Ok(pair)
    }

    /// Exchanges a refresh token for a new pair
    pub async fn refresh_token(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        if refresh_token.trim().is_empty() {
            return Err(ServiceError::invalid_input("Refresh token is required"));
        }
        self.issuer.refresh_tokens(refresh_token).await
    }

    /// Ends one session. Always succeeds unless storage fails.
    pub async fn logout(&self, refresh_token: Option<&str>) -> ServiceResult<()> {
        let refresh_token = match refresh_token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(()),
        };

        match self
            .tokens
            .find_by_hash(&hash_refresh_token(refresh_token))
            .await?
        {
            Some(stored) if !stored.revoked => {
                self.tokens.revoke(stored.id).await?;
                info!("User {} logged out", stored.user_id);
            }
            Some(_) | None => debug!("Logout with inactive or unknown refresh token"),
        }
        Ok(())
    }

    /// Revokes every active session of the user; returns how many were ended
    pub async fn logout_all(&self, user_id: Uuid) -> ServiceResult<u64> {
        let revoked = self.tokens.revoke_all_for_user(user_id).await?;
        info!("Revoked {} refresh tokens for user {}", revoked, user_id);
        Ok(revoked)
    }

    async fn hash(&self, password: String) -> ServiceResult<String> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.hash_password(&password)).await?
    }

    async fn upgrade_hash(&self, user_id: Uuid, password: String) {
        let result = match self.hash(password).await {
            Ok(hash) => self.users.update_password_hash(user_id, &hash).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => debug!("Upgraded password hash for user {}", user_id),
            Err(e) => warn!("Could not upgrade password hash for user {}: {}", user_id, e),
        }
    }
}
