// Re-export the Database struct and the row types callers work with
mod article;
pub mod core;
pub mod models;
mod schema;
mod summary;
mod trend_report;
mod validation;

pub use self::core::Database;
pub use self::models::*;
