// Password hashing and verification

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version,
};
use tracing::error;

use crate::error::{ServiceError, ServiceResult};

/// Outcome of checking a plaintext password against a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerification {
    Success,
    /// Correct password, but the stored hash uses outdated parameters
    SuccessRehashNeeded,
    Failed,
}

impl PasswordVerification {
    pub fn is_success(self) -> bool {
        !matches!(self, PasswordVerification::Failed)
    }
}

/// Opaque password hashing capability used by the auth service
pub trait PasswordService: Send + Sync {
    fn hash_password(&self, password: &str) -> ServiceResult<String>;

    fn verify_password(&self, hash: &str, password: &str) -> PasswordVerification;
}

/// Argon2id implementation
pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// Custom cost parameters; stored hashes with different costs get flagged for rehash
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    fn is_current(&self, parsed: &PasswordHash<'_>) -> bool {
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return false;
        }
        if parsed.version != Some(Version::V0x13.into()) {
            return false;
        }

        let current = self.argon2.params();
        match Params::try_from(parsed) {
            Ok(stored) => {
                stored.m_cost() == current.m_cost()
                    && stored.t_cost() == current.t_cost()
                    && stored.p_cost() == current.p_cost()
            }
            Err(_) => false,
        }
    }
}

impl Default for Argon2PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash_password(&self, password: &str) -> ServiceResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Password hashing failed: {}", e);
                ServiceError::unknown("Failed to process password")
            })
    }

    fn verify_password(&self, hash: &str, password: &str) -> PasswordVerification {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Stored password hash is malformed: {}", e);
                return PasswordVerification::Failed;
            }
        };

        // Verification honours the parameters embedded in the stored hash
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return PasswordVerification::Failed;
        }

        if self.is_current(&parsed) {
            PasswordVerification::Success
        } else {
            PasswordVerification::SuccessRehashNeeded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low-cost parameters keep the tests fast
    fn fast_service() -> Argon2PasswordService {
        Argon2PasswordService::with_params(Params::new(8, 1, 1, None).unwrap())
    }

    #[test]
    fn test_hash_then_verify() {
        let service = fast_service();
        let hash = service.hash_password("Secret123!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert_eq!(
            service.verify_password(&hash, "Secret123!"),
            PasswordVerification::Success
        );
        assert_eq!(
            service.verify_password(&hash, "wrong"),
            PasswordVerification::Failed
        );
    }

    #[test]
    fn test_same_password_different_salts() {
        let service = fast_service();
        let first = service.hash_password("Secret123!").unwrap();
        let second = service.hash_password("Secret123!").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_outdated_parameters_need_rehash() {
        let old = fast_service();
        let hash = old.hash_password("Secret123!").unwrap();

        let upgraded = Argon2PasswordService::with_params(Params::new(16, 2, 1, None).unwrap());
        assert_eq!(
            upgraded.verify_password(&hash, "Secret123!"),
            PasswordVerification::SuccessRehashNeeded
        );
        assert_eq!(
            upgraded.verify_password(&hash, "wrong"),
            PasswordVerification::Failed
        );
    }

    #[test]
    fn test_malformed_hash_fails() {
        let service = fast_service();
        assert_eq!(
            service.verify_password("not-a-hash", "Secret123!"),
            PasswordVerification::Failed
        );
        assert!(!PasswordVerification::Failed.is_success());
        assert!(PasswordVerification::SuccessRehashNeeded.is_success());
    }
}
