//! Error types for conduit-verify
//!
//! Two families of errors live here:
//! - [`VerifyError`] - usage errors reported to the caller (unknown connector
//!   type, duplicate registration, unreadable config files). These are never
//!   verification outcomes.
//! - [`ProbeFault`] - faults raised while a probe talks to an external system.
//!   They never cross the public API; the verifier boundary classifies them
//!   into [`VerificationError`](crate::traits::result::VerificationError)s.

use thiserror::Error;

/// Result type alias for registry and configuration operations
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Result type alias for probe operations
pub type ProbeResult<T> = std::result::Result<T, ProbeFault>;

/// Usage errors surfaced to callers of the verification API
#[derive(Error, Debug)]
pub enum VerifyError {
    /// No verifier is registered for the requested connector type
    #[error("unknown connector type: '{0}'")]
    UnknownConnector(String),

    /// A verifier for this connector type was already registered
    #[error("connector type '{0}' is already registered")]
    DuplicateConnector(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl VerifyError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error means the connector type does not exist
    pub fn is_unknown_connector(&self) -> bool {
        matches!(self, Self::UnknownConnector(_))
    }
}

/// Faults raised by a probe while exercising an external system
#[derive(Debug, Error)]
pub enum ProbeFault {
    /// The external system rejected the supplied credentials
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A parameter value is well-formed but semantically invalid
    /// (e.g. it names a database that does not exist)
    #[error("{message}")]
    IllegalParameter { parameter: String, message: String },

    /// Transport-level failure (unreachable host, refused connection, TLS)
    #[error("connection error: {0}")]
    Connection(String),

    /// The operation did not complete in time
    #[error("timeout: {0}")]
    Timeout(String),

    /// The external system returned an error that has no dedicated variant
    #[error("{category}: {message}")]
    Service { category: String, message: String },

    /// The probe panicked
    #[error("probe panicked: {0}")]
    Panic(String),
}

impl ProbeFault {
    /// Create an authentication fault
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an illegal-parameter fault
    pub fn illegal_parameter(parameter: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::IllegalParameter {
            parameter: parameter.into(),
            message: msg.into(),
        }
    }

    /// Create a connection fault
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a service fault
    pub fn service(category: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Service {
            category: category.into(),
            message: msg.into(),
        }
    }

    /// Category name reported in error details.
    ///
    /// Service faults report the category assigned by the client library
    /// (e.g. the AWS error code or the SQLSTATE).
    pub fn category(&self) -> &str {
        match self {
            Self::Authentication(_) => "Authentication",
            Self::IllegalParameter { .. } => "IllegalParameter",
            Self::Connection(_) => "Connection",
            Self::Timeout(_) => "Timeout",
            Self::Service { category, .. } => category,
            Self::Panic(_) => "Panic",
        }
    }

    /// Message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Authentication(msg)
            | Self::Connection(msg)
            | Self::Timeout(msg)
            | Self::Panic(msg) => msg,
            Self::IllegalParameter { message, .. } | Self::Service { message, .. } => message,
        }
    }

    /// Check if this fault is an authentication failure
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VerifyError::UnknownConnector("ftp".to_string());
        assert_eq!(err.to_string(), "unknown connector type: 'ftp'");
        assert!(err.is_unknown_connector());
        assert!(!VerifyError::config("bad").is_unknown_connector());
    }

    #[test]
    fn test_fault_category() {
        assert_eq!(
            ProbeFault::authentication("denied").category(),
            "Authentication"
        );
        assert_eq!(
            ProbeFault::service("LimitExceededException", "slow down").category(),
            "LimitExceededException"
        );
        assert_eq!(ProbeFault::Panic("boom".into()).category(), "Panic");
    }

    #[test]
    fn test_fault_message_strips_category() {
        let fault = ProbeFault::service("3D000", "database \"nope\" does not exist");
        assert_eq!(fault.message(), "database \"nope\" does not exist");
        assert_eq!(fault.to_string(), "3D000: database \"nope\" does not exist");
    }

    #[test]
    fn test_illegal_parameter_display() {
        let fault = ProbeFault::illegal_parameter("database", "Database 'nope' does not exist");
        assert_eq!(fault.to_string(), "Database 'nope' does not exist");
        assert!(!fault.is_authentication());
    }
}
