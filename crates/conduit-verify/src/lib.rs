//! conduit-verify - Connector configuration verification
//!
//! Given a connector type and a map of raw parameters (credentials, endpoints,
//! target resource names), this crate tells whether the configuration is
//! usable against the external system it names, before any data moves.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  caller ──▶ VerifierRegistry::verify(request)                   │
//! │                 │ lookup (UnknownConnector is a usage error)    │
//! │                 ▼                                               │
//! │             AnyVerifier::verify(scopes, parameters)             │
//! │                 │ for PARAMETERS, CONNECTIVITY:                 │
//! │                 │   bind ─▶ probe ─▶ classify faults            │
//! │                 ▼                                               │
//! │             Vec<VerificationResult>                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Connectors: aws-kinesis, kafka, sql (PostgreSQL), mqtt         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Library usage
//!
//! ```rust,ignore
//! use conduit_verify::prelude::*;
//!
//! let registry = create_verifier_registry(VerifierSettings::default())?;
//! let request = VerificationRequest::new("aws-kinesis")
//!     .scope(Scope::Connectivity)
//!     .parameters(parameters! {
//!         "accessKey" => "AKIA...",
//!         "secretKey" => "...",
//!         "region" => "us-east-1",
//!         "streamName" => "orders",
//!     });
//!
//! for result in registry.verify(&request).await? {
//!     println!("{}", result);
//! }
//! ```
//!
//! # CLI usage
//!
//! ```bash
//! # Verify a request file
//! conduit-verify verify --request kinesis.yaml
//!
//! # Inline parameters, one scope
//! conduit-verify verify --connector kafka --scope connectivity -p brokers=localhost:9092
//!
//! # Registered connectors and their configuration schema
//! conduit-verify connectors
//! conduit-verify schema sql
//! ```

pub mod config;
pub mod connectors;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{RequestFile, VerifierSettings};
pub use connectors::create_verifier_registry;
pub use error::{ProbeFault, ProbeResult, Result, VerifyError};
pub use types::Credential;

pub use traits::{
    bind,
    check_connectivity,
    classify,
    detail_keys,
    resource_exists,
    // Verifier contract
    AnyVerifier,
    // Probes
    ClientFactory,
    ConnectorConfig,
    MockBehavior,
    // Testing utilities
    MockClientFactory,
    ParameterValue,
    // Binding
    Parameters,
    ResourceClient,
    ResultBuilder,
    // Result model
    Scope,
    StandardCode,
    Status,
    TargetResource,
    VerificationError,
    // Registry
    VerificationRequest,
    VerificationResult,
    Verifier,
    VerifierDescriptor,
    VerifierRegistry,
    VerifierRegistryBuilder,
};

pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};

pub mod prelude {
    pub use crate::{
        // Re-exports
        async_trait,
        create_verifier_registry,
        parameters,
        AnyVerifier,
        ClientFactory,
        Credential,
        Deserialize,
        ParameterValue,
        Parameters,
        ProbeFault,
        ProbeResult,
        ResourceClient,
        Result,
        Scope,
        Serialize,
        StandardCode,
        Status,
        TargetResource,
        VerificationError,
        VerificationRequest,
        VerificationResult,
        Verifier,
        VerifierRegistry,
        VerifierSettings,
        VerifyError,
    };

    pub use crate::traits::probe::check_connectivity;

    // Re-export validation and schema traits
    pub use schemars::JsonSchema;
    pub use validator::Validate;
}

/// Build a [`Parameters`] map from `key => value` pairs
///
/// ```rust
/// use conduit_verify::{parameters, ParameterValue};
///
/// let params = parameters! { "brokers" => "localhost:9092", "port" => 9092 };
/// assert_eq!(params["port"], ParameterValue::Integer(9092));
/// ```
#[macro_export]
macro_rules! parameters {
    () => {
        $crate::traits::binder::Parameters::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut parameters = $crate::traits::binder::Parameters::new();
        $(
            parameters.insert(
                ::std::string::String::from($key),
                $crate::traits::binder::ParameterValue::from($value),
            );
        )+
        parameters
    }};
}
