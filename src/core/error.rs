//! Error types for prompt-expander.
//!
//! This module defines all errors that can occur during operation.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in prompt-expander.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path where config was expected.
        path: PathBuf,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    ConfigInvalid {
        /// Field name that is invalid.
        field: String,
        /// Description of why it's invalid.
        message: String,
    },

    // =========================================================================
    // Mapping errors
    // =========================================================================
    /// A marker that can never be matched.
    #[error("Invalid marker '{marker}': {reason}")]
    InvalidMarker {
        /// The offending marker.
        marker: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Mapping not present in the table.
    #[error("Mapping for marker '{marker}' not found")]
    MappingNotFound {
        /// Marker that was looked up.
        marker: String,
    },

    /// Mapping already present and overwrite was not requested.
    #[error("Marker '{marker}' already maps to '{existing}'. Use --force to overwrite.")]
    MappingExists {
        /// Marker being added.
        marker: String,
        /// Replacement currently configured.
        existing: String,
    },

    // =========================================================================
    // Hook errors
    // =========================================================================
    /// Hook event on stdin could not be decoded.
    #[error("Invalid hook input: {message}")]
    HookInput {
        /// Decoder message.
        message: String,
    },

    /// Claude settings file could not be parsed or has an unexpected shape.
    #[error("Failed to parse settings file {path}: {message}")]
    SettingsParse {
        /// Settings file path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    // =========================================================================
    // I/O errors
    // =========================================================================
    /// File I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of what failed.
        message: String,
        /// Source error.
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error (should never happen).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration parse error with source.
    pub fn config_parse_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid marker error.
    pub fn invalid_marker(marker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMarker {
            marker: marker.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Returns true if this is a user-correctable error.
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigInvalid { .. }
                | Self::InvalidMarker { .. }
                | Self::MappingNotFound { .. }
                | Self::MappingExists { .. }
        )
    }

    /// Returns an exit code appropriate for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigNotFound { .. } | Self::ConfigParse { .. } | Self::ConfigInvalid { .. } => {
                78
            }, // EX_CONFIG
            Self::InvalidMarker { .. } | Self::HookInput { .. } | Self::SettingsParse { .. } => 65, // EX_DATAERR
            _ => 1,
        }
    }
}
