// Users module
// Profile management and event participation for registered users

pub mod handlers;
pub mod models;
pub mod service;

pub use models::{UpdateUserRequest, UserResponse};
pub use service::UserService;
