//! Verifier registry
//!
//! The registry maps connector type identifiers to their verifiers. It is
//! assembled once at startup through [`VerifierRegistryBuilder`] and frozen by
//! [`build`](VerifierRegistryBuilder::build); the resulting [`VerifierRegistry`]
//! has no mutators and can be shared across tasks behind an `Arc`.
//!
//! ```rust,ignore
//! use conduit_verify::prelude::*;
//! use conduit_verify::connectors::kinesis::KinesisVerifier;
//!
//! let mut builder = VerifierRegistry::builder();
//! builder.register(KinesisVerifier::new())?;
//! let registry = Arc::new(builder.build());
//!
//! let request = VerificationRequest::new("aws-kinesis")
//!     .scope(Scope::Connectivity)
//!     .parameter("region", "us-east-1");
//! let results = registry.verify(&request).await?;
//! ```

use super::binder::{ParameterValue, Parameters};
use super::result::{Scope, VerificationResult};
use super::verifier::{AnyVerifier, Verifier};
use crate::config::VerifierSettings;
use crate::error::{Result, VerifyError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A connector type bound to its verifier
#[derive(Clone)]
pub struct VerifierDescriptor {
    connector_type: &'static str,
    description: &'static str,
    scopes: &'static [Scope],
    config_schema: serde_json::Value,
    verifier: Arc<dyn AnyVerifier>,
}

impl VerifierDescriptor {
    /// Describe a typed verifier
    pub fn new<V: Verifier + 'static>(verifier: V) -> Self {
        Self::from_any(Arc::new(verifier))
    }

    /// Describe an already type-erased verifier
    pub fn from_any(verifier: Arc<dyn AnyVerifier>) -> Self {
        Self {
            connector_type: verifier.connector_type(),
            description: verifier.description(),
            scopes: verifier.scopes(),
            config_schema: verifier.config_schema(),
            verifier,
        }
    }

    pub fn connector_type(&self) -> &'static str {
        self.connector_type
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Scopes the connector has probes for
    pub fn scopes(&self) -> &'static [Scope] {
        self.scopes
    }

    pub fn supports(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }

    /// JSON schema of the connector's typed configuration
    pub fn config_schema(&self) -> &serde_json::Value {
        &self.config_schema
    }

    pub fn verifier(&self) -> &Arc<dyn AnyVerifier> {
        &self.verifier
    }
}

impl fmt::Debug for VerifierDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierDescriptor")
            .field("connector_type", &self.connector_type)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// One verification call: connector, scopes and raw parameters
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub connector_type: String,
    /// Requested scopes; empty means all
    pub scopes: BTreeSet<Scope>,
    pub parameters: Parameters,
}

impl VerificationRequest {
    pub fn new(connector_type: impl Into<String>) -> Self {
        Self {
            connector_type: connector_type.into(),
            scopes: BTreeSet::new(),
            parameters: Parameters::new(),
        }
    }

    /// Request a scope
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scopes.insert(scope);
        self
    }

    /// Request several scopes
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes.extend(scopes);
        self
    }

    /// Set a parameter
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Merge a parameter map, later keys win
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters.extend(parameters);
        self
    }
}

/// Append-only builder used during startup
#[derive(Debug, Default)]
pub struct VerifierRegistryBuilder {
    verifiers: BTreeMap<&'static str, VerifierDescriptor>,
    settings: VerifierSettings,
}

impl VerifierRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings applied to every verification
    pub fn settings(mut self, settings: VerifierSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Register a typed verifier
    pub fn register<V: Verifier + 'static>(&mut self, verifier: V) -> Result<&mut Self> {
        self.register_descriptor(VerifierDescriptor::new(verifier))
    }

    /// Register a descriptor; a connector type can only be registered once
    pub fn register_descriptor(&mut self, descriptor: VerifierDescriptor) -> Result<&mut Self> {
        let id = descriptor.connector_type();
        if self.verifiers.contains_key(id) {
            return Err(VerifyError::DuplicateConnector(id.to_string()));
        }
        debug!(connector = id, scopes = ?descriptor.scopes(), "registered verifier");
        self.verifiers.insert(id, descriptor);
        Ok(self)
    }

    /// Freeze the registry
    pub fn build(self) -> VerifierRegistry {
        info!(connectors = self.verifiers.len(), "verifier registry ready");
        VerifierRegistry {
            verifiers: self.verifiers,
            settings: self.settings,
        }
    }
}

/// Read-only lookup table from connector type to verifier
pub struct VerifierRegistry {
    verifiers: BTreeMap<&'static str, VerifierDescriptor>,
    settings: VerifierSettings,
}

impl VerifierRegistry {
    pub fn builder() -> VerifierRegistryBuilder {
        VerifierRegistryBuilder::new()
    }

    /// Look up a connector type
    pub fn lookup(&self, connector_type: &str) -> Result<&VerifierDescriptor> {
        self.verifiers
            .get(connector_type)
            .ok_or_else(|| VerifyError::UnknownConnector(connector_type.to_string()))
    }

    /// Verify a request.
    ///
    /// The only error is an unknown connector type; every verification
    /// outcome, failures included, comes back as results.
    pub async fn verify(&self, request: &VerificationRequest) -> Result<Vec<VerificationResult>> {
        let descriptor = self.lookup(&request.connector_type)?;
        Ok(descriptor
            .verifier()
            .verify(&request.scopes, &request.parameters, &self.settings)
            .await)
    }

    /// All descriptors, sorted by connector type
    pub fn list(&self) -> Vec<&VerifierDescriptor> {
        self.verifiers.values().collect()
    }

    pub fn contains(&self, connector_type: &str) -> bool {
        self.verifiers.contains_key(connector_type)
    }

    pub fn len(&self) -> usize {
        self.verifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }
}

impl fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierRegistry")
            .field("connectors", &self.verifiers.keys().collect::<Vec<_>>())
            .field("settings", &self.settings)
            .finish()
    }
}
