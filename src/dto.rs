//! # MentalCare: request types
//!
//! Inputs handed to the repositories and the session gate by the UI layer.
//!
//! Conventions:
//! - `*Request` → collected from a form, validated before any state changes
//! - Validation is expressed via `validator` derive macros, with the few
//!   checks it cannot express (blank fields, confirmation fields) done by hand

use chrono::NaiveDate;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(max = 64, message = "Username must be at most 64 characters"))]
    pub username: String,

    #[validate(email(message = "Email address is not valid"))]
    #[validate(length(max = 254, message = "Email too long"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub confirm_password: String,
}

impl RegisterRequest {
    /// Blank fields first, then format rules, then the confirmation match.
    pub fn check(&self) -> AppResult<()> {
        let blank = [&self.username, &self.email, &self.password]
            .iter()
            .any(|field| field.trim().is_empty());
        if blank {
            return Err(AppError::Validation("Please fill in every field".into()));
        }

        self.validate()?;

        if self.password != self.confirm_password {
            return Err(AppError::Validation("Passwords do not match".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPinRequest {
    pub pin: String,
    pub confirm_pin: String,
}

impl SetPinRequest {
    pub fn check(&self) -> AppResult<()> {
        if !is_valid_pin(&self.pin) {
            return Err(AppError::Validation("PIN must be exactly 4 digits".into()));
        }
        if self.pin != self.confirm_pin {
            return Err(AppError::Validation("PINs do not match".into()));
        }
        Ok(())
    }
}

pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Goals
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGoal {
    pub user_id: String,

    #[validate(custom = "validate_not_blank")]
    #[validate(length(max = 200, message = "Goal title too long"))]
    pub title: String,

    pub date: NaiveDate,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Goal title is required".into());
        return Err(err);
    }
    Ok(())
}
