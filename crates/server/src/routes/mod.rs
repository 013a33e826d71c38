pub mod analysis;
pub mod auth;
pub mod board;
pub mod health;

use crate::error::AppError;

/// Fallback for every unmatched path.
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}
