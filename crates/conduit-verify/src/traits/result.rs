//! Verification result model
//!
//! A [`VerificationResult`] describes the outcome of one [`Scope`]. Results are
//! only produced by [`ResultBuilder`] (or [`VerificationResult::unsupported`]),
//! which keeps the status consistent with the error list:
//!
//! - `ERROR` iff at least one [`VerificationError`] is attached
//! - `UNSUPPORTED` iff the connector has no probe for the scope (never with errors)
//! - `OK` otherwise

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Well-known keys of [`VerificationError::details`]
pub mod detail_keys {
    /// Name of the offending parameter
    pub const PARAMETER: &str = "parameter";
    /// Category name of the fault that produced the error
    pub const EXCEPTION_CLASS: &str = "exception_class";
    /// Message of the fault that produced the error
    pub const EXCEPTION_MESSAGE: &str = "exception_message";
}

/// Category of check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Structural validity of the parameters, no network I/O
    Parameters,
    /// Live reachability, credential and resource validity
    Connectivity,
}

impl Scope {
    /// All scopes in evaluation order
    pub const ALL: [Scope; 2] = [Scope::Parameters, Scope::Connectivity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parameters => "PARAMETERS",
            Self::Connectivity => "CONNECTIVITY",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parameters" => Ok(Self::Parameters),
            "connectivity" => Ok(Self::Connectivity),
            other => Err(format!(
                "unknown scope '{}' (expected PARAMETERS or CONNECTIVITY)",
                other
            )),
        }
    }
}

/// Outcome of a single scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Error,
    Unsupported,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Error => write!(f, "ERROR"),
            Self::Unsupported => write!(f, "UNSUPPORTED"),
        }
    }
}

/// Connector-agnostic error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StandardCode {
    /// The external system rejected the credentials
    Authentication,
    /// A parameter is malformed or names something that does not exist
    IllegalParameter,
    /// A required parameter is absent
    MissingParameter,
    /// The scope is not supported by the connector
    UnsupportedScope,
    /// Failure without a more specific classification (e.g. timeouts)
    Generic,
    /// Unexpected fault raised by the external system or its client
    Exception,
}

impl StandardCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "AUTHENTICATION",
            Self::IllegalParameter => "ILLEGAL_PARAMETER",
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::UnsupportedScope => "UNSUPPORTED_SCOPE",
            Self::Generic => "GENERIC",
            Self::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for StandardCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified problem attached to a [`VerificationResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationError {
    code: StandardCode,
    message: String,
    details: BTreeMap<String, String>,
}

impl VerificationError {
    pub fn new(code: StandardCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// A required parameter is absent
    pub fn missing_parameter(parameter: impl Into<String>) -> Self {
        let parameter = parameter.into();
        Self::new(
            StandardCode::MissingParameter,
            format!("Missing required parameter '{}'", parameter),
        )
        .with_detail(detail_keys::PARAMETER, parameter)
    }

    /// A parameter value is malformed or semantically invalid
    pub fn illegal_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StandardCode::IllegalParameter, message)
            .with_detail(detail_keys::PARAMETER, parameter)
    }

    /// Attach a diagnostic detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn code(&self) -> StandardCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Outcome of one verification scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    scope: Scope,
    status: Status,
    errors: Vec<VerificationError>,
    // Logged and shown in Display; not part of the wire shape
    #[serde(skip)]
    duration_ms: Option<u64>,
}

impl VerificationResult {
    /// Start building a result for `scope`
    pub fn builder(scope: Scope) -> ResultBuilder {
        ResultBuilder::new(scope)
    }

    /// Result for a scope the connector declares no probe for
    pub fn unsupported(scope: Scope) -> Self {
        Self {
            scope,
            status: Status::Unsupported,
            errors: Vec::new(),
            duration_ms: None,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn errors(&self) -> &[VerificationError] {
        &self.errors
    }

    /// Wall-clock time spent in the scope, if measured
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Codes of all attached errors, in order
    pub fn codes(&self) -> Vec<StandardCode> {
        self.errors.iter().map(VerificationError::code).collect()
    }

    /// Compare two results ignoring transient data (timings)
    pub fn equivalent(&self, other: &Self) -> bool {
        self.scope == other.scope
            && self.status == other.status
            && self.errors.len() == other.errors.len()
            && self
                .errors
                .iter()
                .zip(&other.errors)
                .all(|(a, b)| a.code == b.code && a.message == b.message)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.status {
            Status::Ok => "✓",
            Status::Error => "✗",
            Status::Unsupported => "-",
        };
        write!(f, "{} {} {}", mark, self.scope, self.status)?;
        if let Some(ms) = self.duration_ms {
            write!(f, " ({}ms)", ms)?;
        }
        for error in &self.errors {
            write!(f, "\n    {}", error)?;
        }
        Ok(())
    }
}

/// Accumulates errors for one scope; status is derived on [`build`](Self::build)
#[derive(Debug)]
pub struct ResultBuilder {
    scope: Scope,
    errors: Vec<VerificationError>,
    duration_ms: Option<u64>,
}

impl ResultBuilder {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            errors: Vec::new(),
            duration_ms: None,
        }
    }

    /// Append an error
    pub fn error(mut self, error: VerificationError) -> Self {
        self.errors.push(error);
        self
    }

    /// Append several errors, keeping their order
    pub fn errors(mut self, errors: impl IntoIterator<Item = VerificationError>) -> Self {
        self.errors.extend(errors);
        self
    }

    /// Record how long the scope took
    pub fn duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = Some(elapsed.as_millis() as u64);
        self
    }

    pub fn build(self) -> VerificationResult {
        let status = if self.errors.is_empty() {
            Status::Ok
        } else {
            Status::Error
        };
        VerificationResult {
            scope: self.scope,
            status,
            errors: self.errors,
            duration_ms: self.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_is_ok() {
        let result = VerificationResult::builder(Scope::Connectivity).build();
        assert_eq!(result.status(), Status::Ok);
        assert!(result.errors().is_empty());
    }

    #[test]
    fn test_error_flips_status() {
        let result = VerificationResult::builder(Scope::Parameters)
            .error(VerificationError::missing_parameter("region"))
            .build();
        assert_eq!(result.status(), Status::Error);
        assert_eq!(result.codes(), vec![StandardCode::MissingParameter]);
        assert_eq!(result.errors()[0].detail(detail_keys::PARAMETER), Some("region"));
    }

    #[test]
    fn test_unsupported_has_no_errors() {
        let result = VerificationResult::unsupported(Scope::Parameters);
        assert_eq!(result.status(), Status::Unsupported);
        assert!(result.errors().is_empty());
    }

    #[test]
    fn test_scope_order_and_parse() {
        assert!(Scope::Parameters < Scope::Connectivity);
        assert_eq!("connectivity".parse::<Scope>().unwrap(), Scope::Connectivity);
        assert_eq!(" PARAMETERS ".parse::<Scope>().unwrap(), Scope::Parameters);
        assert!("liveness".parse::<Scope>().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let result = VerificationResult::builder(Scope::Connectivity)
            .error(
                VerificationError::new(StandardCode::Authentication, "bad key")
                    .with_detail(detail_keys::EXCEPTION_CLASS, "Authentication"),
            )
            .duration(Duration::from_millis(42))
            .build();
        assert_eq!(result.duration_ms(), Some(42));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "scope": "CONNECTIVITY",
                "status": "ERROR",
                "errors": [{
                    "code": "AUTHENTICATION",
                    "message": "bad key",
                    "details": {"exception_class": "Authentication"}
                }]
            })
        );
    }

    #[test]
    fn test_equivalent_ignores_duration() {
        let a = VerificationResult::builder(Scope::Connectivity)
            .duration(Duration::from_millis(12))
            .build();
        let b = VerificationResult::builder(Scope::Connectivity)
            .duration(Duration::from_millis(340))
            .build();
        assert_ne!(a, b);
        assert!(a.equivalent(&b));

        let c = VerificationResult::builder(Scope::Connectivity)
            .error(VerificationError::new(StandardCode::Generic, "timeout"))
            .build();
        assert!(!a.equivalent(&c));
    }

    #[test]
    fn test_display() {
        let result = VerificationResult::builder(Scope::Parameters)
            .error(VerificationError::illegal_parameter("port", "port out of range"))
            .build();
        assert_eq!(
            result.to_string(),
            "✗ PARAMETERS ERROR\n    [ILLEGAL_PARAMETER] port out of range"
        );
    }
}
