// Authentication module
// JWT access tokens plus rotating opaque refresh tokens, registration and login

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{AdminUser, AuthenticatedUser};
pub use models::{
    LoginRequest, LogoutRequest, MessageResponse, NewRefreshToken, NewUser, RefreshRequest,
    RefreshToken, RegisterRequest, Role, TokenPair, User, UserChanges,
};
pub use password::{Argon2PasswordService, PasswordService, PasswordVerification};
pub use repository::{
    PgRefreshTokenRepository, PgUserRepository, RefreshTokenRepository, UserRepository,
};
pub use service::AuthService;
pub use token::{Claims, JwtCodec, TokenIssuer};
