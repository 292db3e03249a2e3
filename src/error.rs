//! Custom error types for the emulator.
//!
//! This module defines the primary error type, `EmulatorError`, using the
//! `thiserror` crate. It covers the faults the process itself can hit:
//! configuration loading and validation, malformed command-table patterns
//! detected at instrument construction, and socket I/O.
//!
//! Protocol-level outcomes (bad command, unsupported attribute, unknown
//! device) are *not* errors in this sense. They are ordinary responses of
//! the emulated dialects and are modeled by [`crate::dispatch::Refusal`].
//!
//! By using `#[from]`, `EmulatorError` can be seamlessly created from
//! underlying error types, simplifying error handling with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the emulator error type.
pub type AppResult<T> = std::result::Result<T, EmulatorError>;

#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid command pattern '{0}': {1}")]
    Pattern(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EmulatorError::Configuration("port must be non-zero".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration validation error: port must be non-zero"
        );

        let err = EmulatorError::Pattern("LD {".to_string(), "unterminated placeholder".to_string());
        assert!(err.to_string().contains("LD {"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer gone");
        let err: EmulatorError = io_err.into();
        assert!(matches!(err, EmulatorError::Io(_)));
    }
}
