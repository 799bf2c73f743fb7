// User profile DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Role, User};

/// Public view of a user; never carries the password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub registered_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            date_of_birth: user.date_of_birth,
            registered_at: user.registered_at,
            roles: user.roles,
        }
    }
}

/// Profile update payload
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100), custom = "crate::validation::validate_not_blank")]
    pub first_name: String,
    #[validate(length(min = 1, max = 100), custom = "crate::validation::validate_not_blank")]
    pub last_name: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    pub date_of_birth: NaiveDate,
}
