//! Error types for beluga-tracker.
//!
//! This module defines all error types used throughout the beluga-tracker crate.
//! "No tracked aircraft airborne" is not an error; it is reported through
//! [`crate::tracker::Outcome::NotFlying`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for beluga-tracker operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A credential needed by the current stage was not supplied.
    #[error("missing credential: environment variable {name} is not set")]
    MissingCredential {
        /// Name of the environment variable that should hold the credential.
        name: &'static str,
    },

    /// A transponder identifier is not a 24-bit ICAO address.
    #[error("invalid transponder identifier '{value}': expected 6 hex digits")]
    InvalidIdentifier {
        /// The rejected value.
        value: String,
    },

    // === Remote Service Errors ===
    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote service answered with a non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Api {
        /// Which service answered.
        service: &'static str,
        /// The HTTP status code.
        status: u16,
        /// The response body, for diagnostics.
        body: String,
    },

    /// A remote service answered successfully but with an unusable body.
    #[error("unexpected response from {service}: {message}")]
    UnexpectedResponse {
        /// Which service answered.
        service: &'static str,
        /// Description of what was wrong.
        message: String,
    },

    /// Request signing failed.
    #[error("failed to sign request: {0}")]
    Signing(String),

    // === I/O Errors ===
    /// The rendered map could not be written.
    #[error("failed to write map image to {path}: {source}")]
    MapWrite {
        /// Destination path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for beluga-tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an API error for a non-success response.
    #[must_use]
    pub fn api(service: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            service,
            status,
            body: body.into(),
        }
    }

    /// Create an unexpected response error.
    #[must_use]
    pub fn unexpected(service: &'static str, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            service,
            message: message.into(),
        }
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing(message.into())
    }

    /// Check if this error is a missing credential.
    #[must_use]
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }

    /// Check if this error stems from configuration rather than a remote service.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad(_)
                | Self::ConfigValidation { .. }
                | Self::MissingCredential { .. }
                | Self::InvalidIdentifier { .. }
        )
    }
}
