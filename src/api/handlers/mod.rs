use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::MAX_TEXT_LEN,
};

pub mod catalog;
pub mod favorites;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Trims `value` and checks it fits a 1..=255 character text column
fn validate_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be blank", field)));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_trims() {
        assert_eq!(validate_text("title", "  Dune ").unwrap(), "Dune");
    }

    #[test]
    fn test_validate_text_rejects_blank_and_long() {
        assert!(matches!(
            validate_text("title", "   "),
            Err(AppError::InvalidInput(_))
        ));
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(matches!(
            validate_text("name", &long),
            Err(AppError::InvalidInput(_))
        ));
        assert!(validate_text("name", &"é".repeat(MAX_TEXT_LEN)).is_ok());
    }
}
