use std::fmt;

use serde::Serialize;
use validator::ValidationErrors;

#[derive(Debug)]
pub enum AppError {
    Http { status: u16, body: String },
    Configuration(String),
    Upload { status: u16, message: String },
    Network(String),
    Decode(String),
    ValidationError(Vec<FieldError>),
    MissingParent,
    SubmitInProgress,
    Io(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Http { status, .. } => write!(f, "HTTP {}", status),
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Upload { status, message } => {
                write!(f, "Upload failed ({}): {}", status, message)
            }
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Decode(msg) => write!(f, "Invalid response: {}", msg),
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::MissingParent => write!(f, "No maquete selected"),
            AppError::SubmitInProgress => write!(f, "A submission is already in progress"),
            AppError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Status code of a rejected backend request, if that is what this is.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AppError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(|e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();

        AppError::ValidationError(field_errors)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Configuration(format!("invalid URL: {}", err))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn http_error_displays_status_only() {
        let err = AppError::Http { status: 503, body: "upstream down".into() };
        assert_eq!(err.to_string(), "HTTP 503");
        assert_eq!(err.http_status(), Some(503));
    }

    #[test]
    fn validation_errors_are_flattened_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("nome", ValidationError::new("length").with_message("Name is required".into()));

        let err = AppError::from(errors);
        assert_eq!(err.to_string(), "validation error: nome:Name is required");
    }
}
