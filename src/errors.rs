//! Error types for lead capture and export
//!
//! Lookup misses (unknown files, unmatched choices, missing system column
//! sources) and invalid date input never surface here: they degrade to the
//! unchanged value. What remains are storage failures, invalid export
//! configurations and exporter/template failures.
//!
//! # Examples
//!
//! ```rust
//! use leads::errors::LeadsError;
//!
//! let err = LeadsError::InvalidConfiguration("fields is not a list".to_string());
//! assert!(err.is_client_error());
//! assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadsError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored export configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Form {0} not found")]
    FormNotFound(i32),

    #[error("Export configuration {0} not found")]
    ConfigurationNotFound(i32),

    #[error("Lead {0} not found")]
    LeadNotFound(i32),

    /// Token template rendering failed
    #[error("Template rendering failed: {0}")]
    Template(String),

    /// Exporter failed to serialize rows
    #[error("Export failed: {0}")]
    Export(String),

    /// A registered listener aborted the submission
    #[error("Listener failed: {0}")]
    Listener(String),
}

impl LeadsError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LeadsError::InvalidConfiguration(_) | LeadsError::Template(_)
        )
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LeadsError::FormNotFound(_)
                | LeadsError::ConfigurationNotFound(_)
                | LeadsError::LeadNotFound(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LeadsError::Database(_) => "DATABASE_ERROR",
            LeadsError::Serialization(_) => "SERIALIZATION_ERROR",
            LeadsError::Csv(_) => "CSV_ERROR",
            LeadsError::Io(_) => "IO_ERROR",
            LeadsError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            LeadsError::FormNotFound(_) => "FORM_NOT_FOUND",
            LeadsError::ConfigurationNotFound(_) => "CONFIGURATION_NOT_FOUND",
            LeadsError::LeadNotFound(_) => "LEAD_NOT_FOUND",
            LeadsError::Template(_) => "TEMPLATE_ERROR",
            LeadsError::Export(_) => "EXPORT_FAILED",
            LeadsError::Listener(_) => "LISTENER_FAILED",
        }
    }
}

impl From<handlebars::RenderError> for LeadsError {
    fn from(err: handlebars::RenderError) -> Self {
        LeadsError::Template(err.to_string())
    }
}

#[cfg(feature = "xlsx")]
impl From<rust_xlsxwriter::XlsxError> for LeadsError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        LeadsError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LeadsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration() {
        let err = LeadsError::InvalidConfiguration("bad fields".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: bad fields");
        assert!(err.is_client_error());
        assert!(!err.is_not_found());
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_not_found() {
        let err = LeadsError::FormNotFound(7);
        assert_eq!(err.to_string(), "Form 7 not found");
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "FORM_NOT_FOUND");
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = LeadsError::from(json_err);
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
        assert!(!err.is_client_error());
    }
}
