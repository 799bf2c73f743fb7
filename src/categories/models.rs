// Category data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Category as stored in the database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Category returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    #[schema(example = "Concerts")]
    pub name: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

/// Create/update payload
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100), custom = "crate::validation::validate_not_blank")]
    #[schema(example = "Concerts")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_length_bounds() {
        let ok = CategoryRequest {
            name: "a".repeat(100),
        };
        assert!(ok.validate().is_ok());

        let long = CategoryRequest {
            name: "a".repeat(101),
        };
        assert!(long.validate().is_err());

        let blank = CategoryRequest {
            name: "   ".to_string(),
        };
        assert!(blank.validate().is_err());
    }
}
