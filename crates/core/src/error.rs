//! Error types for Planview.

use thiserror::Error;

/// Result type alias using Planview's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Bytes per mebibyte, used when reporting sizes to callers.
pub const MIB: u64 = 1024 * 1024;

fn mib(bytes: &u64) -> f64 {
    *bytes as f64 / MIB as f64
}

/// Whole mebibytes print without decimals, anything else with two.
fn mib_limit(bytes: &u64) -> String {
    if bytes % MIB == 0 {
        (bytes / MIB).to_string()
    } else {
        format!("{:.2}", mib(bytes))
    }
}

/// Core error type for Planview.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("No file provided")]
    NoFile,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file type. Allowed types: {allowed}")]
    DisallowedExtension { allowed: String },

    #[error("File size ({:.2}MB) exceeds the {}MB limit", mib(.size), mib_limit(.limit))]
    TooLarge { size: u64, limit: u64 },

    #[error("File size exceeds the {}MB limit", mib_limit(.limit))]
    PayloadTooLarge { limit: u64 },

    #[error("{0}")]
    InvalidRequest(String),

    // =========================================================================
    // Store Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Image file not found: {0}")]
    NotFound(String),

    // =========================================================================
    // Upstream Model Errors
    // =========================================================================
    #[error("Gemini API authentication failed. Please check your API key. Error: {0}")]
    Auth(String),

    #[error("Gemini API quota/rate limit exceeded. Please try again later. Error: {0}")]
    Quota(String),

    #[error("Content was blocked by safety filters. Please try a different image. ({0})")]
    SafetyBlocked(String),

    #[error("Image generation model unavailable. Error: {0}")]
    ModelUnavailable(String),

    #[error("Empty response from Gemini API")]
    EmptyResponse,

    #[error("Gemini API error: {0}")]
    Upstream(String),

    // =========================================================================
    // Rendering Errors
    // =========================================================================
    #[error("Image processing error: {0}")]
    Image(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not-found error for a temp handle or stored name.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create an image processing error.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error was caused by bad caller input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoFile
                | Self::NoFileSelected
                | Self::DisallowedExtension { .. }
                | Self::TooLarge { .. }
                | Self::PayloadTooLarge { .. }
                | Self::InvalidRequest(_)
        )
    }

    /// HTTP status code this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PayloadTooLarge { .. } => 413,
            Self::NotFound(_) => 404,
            e if e.is_validation() => 400,
            _ => 500,
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoFile | Self::NoFileSelected | Self::InvalidRequest(_) => "invalid_request",
            Self::DisallowedExtension { .. } => "disallowed_extension",
            Self::TooLarge { .. } | Self::PayloadTooLarge { .. } => "too_large",
            Self::Storage(_) | Self::Io(_) => "storage",
            Self::NotFound(_) => "not_found",
            Self::Auth(_) => "auth",
            Self::Quota(_) => "quota",
            Self::SafetyBlocked(_) => "safety_blocked",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::EmptyResponse => "empty_response",
            Self::Upstream(_) => "upstream",
            Self::Image(_) => "image",
            Self::Config(_) => "config",
            Self::Serialization(_) | Self::Internal(_) | Self::Other(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_reports_mib_with_two_decimals() {
        let err = Error::TooLarge {
            size: 17 * MIB + MIB / 2,
            limit: 16 * MIB,
        };
        assert_eq!(err.to_string(), "File size (17.50MB) exceeds the 16MB limit");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NoFile.status_code(), 400);
        assert_eq!(Error::PayloadTooLarge { limit: 16 * MIB }.status_code(), 413);
        assert_eq!(Error::not_found("temp_x.png").status_code(), 404);
        assert_eq!(Error::storage("disk full").status_code(), 500);
        assert_eq!(Error::Auth("401".into()).status_code(), 500);
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = Error::PayloadTooLarge { limit: 16 * MIB };
        assert_eq!(err.to_string(), "File size exceeds the 16MB limit");
    }

    #[test]
    fn test_fractional_limits_are_rounded() {
        let err = Error::TooLarge {
            size: 200,
            limit: 100,
        };
        assert_eq!(err.to_string(), "File size (0.00MB) exceeds the 0.00MB limit");

        let err = Error::PayloadTooLarge { limit: MIB + MIB / 2 };
        assert_eq!(err.to_string(), "File size exceeds the 1.50MB limit");
    }
}
