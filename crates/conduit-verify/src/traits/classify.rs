//! Classification of probe faults into the shared error taxonomy
//!
//! Every fault a probe raises ends up here, at the verifier boundary. The
//! mapping is a pure function of the fault, applied in priority order:
//!
//! 1. authentication/authorization failures -> `AUTHENTICATION`
//! 2. semantically invalid parameter values -> `ILLEGAL_PARAMETER`
//! 3. timeouts -> `GENERIC`
//! 4. anything else -> `EXCEPTION`
//!
//! Details carry the fault category and message only.

use super::result::{detail_keys, StandardCode, VerificationError};
use crate::error::ProbeFault;

/// Translate a probe fault into a verification error
pub fn classify(fault: &ProbeFault) -> VerificationError {
    let error = match fault {
        ProbeFault::Authentication(msg) => {
            VerificationError::new(StandardCode::Authentication, msg.clone())
        }
        ProbeFault::IllegalParameter { parameter, message } => {
            VerificationError::illegal_parameter(parameter.clone(), message.clone())
        }
        ProbeFault::Timeout(msg) => {
            VerificationError::new(StandardCode::Generic, format!("Timed out: {}", msg))
        }
        ProbeFault::Connection(_) | ProbeFault::Service { .. } | ProbeFault::Panic(_) => {
            VerificationError::new(StandardCode::Exception, fault.to_string())
        }
    };

    error
        .with_detail(detail_keys::EXCEPTION_CLASS, fault.category())
        .with_detail(detail_keys::EXCEPTION_MESSAGE, fault.message())
}

/// Best-effort message from a caught panic payload
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication() {
        let error = classify(&ProbeFault::authentication(
            "The security token included in the request is invalid.",
        ));
        assert_eq!(error.code(), StandardCode::Authentication);
        assert_eq!(
            error.message(),
            "The security token included in the request is invalid."
        );
        assert_eq!(
            error.detail(detail_keys::EXCEPTION_CLASS),
            Some("Authentication")
        );
    }

    #[test]
    fn test_illegal_parameter_keeps_parameter() {
        let error = classify(&ProbeFault::illegal_parameter(
            "database",
            "Database 'nope' does not exist",
        ));
        assert_eq!(error.code(), StandardCode::IllegalParameter);
        assert_eq!(error.detail(detail_keys::PARAMETER), Some("database"));
        assert!(error.message().contains("nope"));
    }

    #[test]
    fn test_timeout_is_generic() {
        let error = classify(&ProbeFault::Timeout("no response after 30000ms".into()));
        assert_eq!(error.code(), StandardCode::Generic);
        assert!(error.message().contains("30000ms"));
    }

    #[test]
    fn test_other_faults_are_exceptions() {
        for fault in [
            ProbeFault::connection("connection refused"),
            ProbeFault::service("LimitExceededException", "rate exceeded"),
            ProbeFault::Panic("index out of bounds".into()),
        ] {
            let error = classify(&fault);
            assert_eq!(error.code(), StandardCode::Exception);
            assert_eq!(
                error.detail(detail_keys::EXCEPTION_CLASS),
                Some(fault.category())
            );
            assert_eq!(
                error.detail(detail_keys::EXCEPTION_MESSAGE),
                Some(fault.message())
            );
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
