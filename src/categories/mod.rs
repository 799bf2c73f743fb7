// Category module
// Unique, named groupings that every event belongs to

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use models::{Category, CategoryRequest, CategoryResponse};
pub use repository::{CategoryRepository, PgCategoryRepository};
pub use service::CategoryService;
