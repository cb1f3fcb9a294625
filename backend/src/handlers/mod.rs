pub mod classrooms;
pub mod health;
pub mod sessions;
pub mod signature;

use std::str::FromStr;

use crate::error::AppError;

/// Parses a path identifier, rejecting malformed values with 400.
pub(crate) fn parse_id<T: FromStr>(raw: &str, label: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {}", label)))
}
