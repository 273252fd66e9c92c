//! Core verification traits and types
//!
//! This module provides the building blocks for connector verification:
//! - `result` - scopes, statuses, standard codes, results
//! - `binder` - raw parameters to typed configuration
//! - `verifier` - the `Verifier` contract and scope orchestration
//! - `probe` - client factory traits and resource-existence checks
//! - `classify` - probe faults to standard codes
//! - `registry` - frozen connector type lookup
//! - `testing` - instrumented mock client factory

pub mod binder;
pub mod classify;
pub mod probe;
pub mod registry;
pub mod result;
pub mod testing;
pub mod verifier;

// Re-export result types
pub use result::{
    detail_keys, ResultBuilder, Scope, StandardCode, Status, VerificationError,
    VerificationResult,
};

// Re-export binder types
pub use binder::{bind, validation_errors, ConnectorConfig, ParameterValue, Parameters};

// Re-export verifier types
pub use verifier::{AnyVerifier, Verifier};

// Re-export probe types
pub use probe::{check_connectivity, resource_exists, ClientFactory, ResourceClient, TargetResource};

// Re-export classification
pub use classify::classify;

// Re-export registry types
pub use registry::{
    VerificationRequest, VerifierDescriptor, VerifierRegistry, VerifierRegistryBuilder,
};

// Re-export testing utilities
pub use testing::{MockBehavior, MockClientFactory};
