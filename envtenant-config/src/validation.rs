// Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Validation rules shared by configuration types
pub struct ConfigValidator;

impl ConfigValidator {
    /// Reject empty or whitespace-only values
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    /// Reject an empty list
    pub fn not_empty_list<T>(values: &[T], field: &str) -> Result<()> {
        if values.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} must contain at least one entry",
                field
            )));
        }
        Ok(())
    }

    /// Require `value` to be one of `allowed`
    pub fn one_of<T: PartialEq + std::fmt::Display>(
        value: &T,
        allowed: &[T],
        field: &str,
    ) -> Result<()> {
        if !allowed.contains(value) {
            let names: Vec<String> = allowed.iter().map(|a| a.to_string()).collect();
            return Err(ConfigError::Validation(format!(
                "{} must be one of [{}], got '{}'",
                field,
                names.join(", "),
                value
            )));
        }
        Ok(())
    }

    /// Accept names usable as connection identifiers
    pub fn is_identifier(value: &str, field: &str) -> Result<()> {
        Self::not_empty(value, field)?;
        let valid = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ConfigError::Validation(format!(
                "{} may only contain letters, digits, '_' and '-', got '{}'",
                field, value
            )));
        }
        Ok(())
    }
}
