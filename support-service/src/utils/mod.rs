pub mod validation;

pub use validation::{QueryParams, ValidatedJson};

use service_core::error::AppError;
use uuid::Uuid;

/// Parse a path id, rejecting malformed values with 400.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::bad_request(format!("Invalid {} id", what)))
}
