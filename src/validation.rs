//! Validation rules for entities
//!
//! Building blocks for `Entity::validate` implementations. Failures surface
//! as `RepoError::Validation` and abort a save before it touches the store.

use crate::error::{RepoError, Result};

/// Validation rule for a field
pub trait ValidationRule<T: ?Sized> {
    /// Validate the field
    fn validate(&self, value: &T) -> Result<()>;

    /// Get the error message for this rule
    fn error_message(&self) -> String;
}

/// Required field validation rule
pub struct Required;

impl<T> ValidationRule<Option<T>> for Required {
    fn validate(&self, value: &Option<T>) -> Result<()> {
        if value.is_none() {
            return Err(RepoError::validation(
                <Required as ValidationRule<Option<T>>>::error_message(self),
            ));
        }
        Ok(())
    }

    fn error_message(&self) -> String {
        "This field is required".to_string()
    }
}

/// String length validation rule
pub struct StringLength {
    /// Minimum length (inclusive)
    pub min: Option<usize>,
    /// Maximum length (inclusive)
    pub max: Option<usize>,
}

impl ValidationRule<str> for StringLength {
    fn validate(&self, value: &str) -> Result<()> {
        if let Some(min) = self.min {
            if value.len() < min {
                return Err(RepoError::validation(self.error_message()));
            }
        }

        if let Some(max) = self.max {
            if value.len() > max {
                return Err(RepoError::validation(self.error_message()));
            }
        }

        Ok(())
    }

    fn error_message(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                format!("Length must be between {} and {} characters", min, max)
            }
            (Some(min), None) => format!("Length must be at least {} characters", min),
            (None, Some(max)) => format!("Length must be at most {} characters", max),
            (None, None) => "Invalid string length".to_string(),
        }
    }
}

/// Integer range validation rule
pub struct Range {
    /// Minimum value (inclusive)
    pub min: Option<i64>,
    /// Maximum value (inclusive)
    pub max: Option<i64>,
}

impl ValidationRule<i64> for Range {
    fn validate(&self, value: &i64) -> Result<()> {
        if let Some(min) = self.min {
            if *value < min {
                return Err(RepoError::validation(self.error_message()));
            }
        }

        if let Some(max) = self.max {
            if *value > max {
                return Err(RepoError::validation(self.error_message()));
            }
        }

        Ok(())
    }

    fn error_message(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("Value must be between {} and {}", min, max),
            (Some(min), None) => format!("Value must be at least {}", min),
            (None, Some(max)) => format!("Value must be at most {}", max),
            (None, None) => "Invalid value".to_string(),
        }
    }
}
