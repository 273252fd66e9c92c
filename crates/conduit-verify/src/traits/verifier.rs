//! Verifier contract and scope orchestration
//!
//! Connector authors implement the typed [`Verifier`] trait. The registry only
//! sees the type-erased [`AnyVerifier`], which every `Verifier` gets through a
//! blanket implementation. That implementation owns the per-scope protocol:
//!
//! 1. scope not declared by the connector -> `UNSUPPORTED`, no errors
//! 2. bind the raw parameters; binding errors end the scope
//! 3. run the probe; faults and panics are classified, never propagated
//! 4. status follows from the collected errors
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_verify::prelude::*;
//!
//! #[derive(Debug, Deserialize, Validate, JsonSchema)]
//! #[serde(rename_all = "camelCase")]
//! pub struct MyConfig {
//!     #[validate(length(min = 1))]
//!     pub endpoint: String,
//! }
//!
//! pub struct MyVerifier;
//!
//! #[async_trait]
//! impl Verifier for MyVerifier {
//!     type Config = MyConfig;
//!
//!     fn connector_type(&self) -> &'static str {
//!         "my-connector"
//!     }
//!
//!     async fn verify_connectivity(&self, config: &MyConfig) -> ProbeResult<Vec<VerificationError>> {
//!         // connect, list, close
//!         Ok(Vec::new())
//!     }
//! }
//! ```

use super::binder::{bind, validation_errors, ConnectorConfig, Parameters};
use super::classify::{classify, panic_message};
use super::result::{Scope, VerificationError, VerificationResult};
use crate::config::{VerifierSettings, MAX_CONNECTIVITY_TIMEOUT_MS};
use crate::error::{ProbeFault, ProbeResult};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

/// Verification logic for one connector type
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Typed configuration the raw parameters bind to
    type Config: ConnectorConfig;

    /// Connector type identifier, e.g. `aws-kinesis`
    fn connector_type(&self) -> &'static str;

    /// One-line description for listings
    fn description(&self) -> &'static str {
        ""
    }

    /// Scopes this connector has probes for
    fn scopes(&self) -> &'static [Scope] {
        &Scope::ALL
    }

    /// Structural validation of a bound configuration.
    ///
    /// Must not perform I/O. The default maps `validator` failures to
    /// `ILLEGAL_PARAMETER`, one per field.
    fn verify_parameters(&self, config: &Self::Config) -> Vec<VerificationError> {
        validation_errors(config)
    }

    /// Exercise the external system with a short-lived client.
    ///
    /// Returns the semantic problems found (e.g. a missing target resource);
    /// faults are classified by the caller.
    async fn verify_connectivity(
        &self,
        config: &Self::Config,
    ) -> ProbeResult<Vec<VerificationError>>;

    /// Connector-specific bound for the CONNECTIVITY scope
    ///
    /// Capped at the settings maximum; zero falls back to the settings value.
    fn connectivity_timeout(&self, _config: &Self::Config) -> Option<Duration> {
        None
    }
}

/// Type-erased verifier for runtime dispatch
#[async_trait]
pub trait AnyVerifier: Send + Sync {
    fn connector_type(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn scopes(&self) -> &'static [Scope];

    /// JSON schema of the typed configuration
    fn config_schema(&self) -> serde_json::Value;

    /// Run one scope against raw parameters; never fails
    async fn verify_scope(
        &self,
        scope: Scope,
        parameters: &Parameters,
        settings: &VerifierSettings,
    ) -> VerificationResult;

    /// Run the requested scopes in `PARAMETERS`, `CONNECTIVITY` order.
    ///
    /// An empty set requests every scope.
    async fn verify(
        &self,
        scopes: &BTreeSet<Scope>,
        parameters: &Parameters,
        settings: &VerifierSettings,
    ) -> Vec<VerificationResult> {
        let mut results = Vec::with_capacity(Scope::ALL.len());
        for scope in Scope::ALL {
            if scopes.is_empty() || scopes.contains(&scope) {
                results.push(self.verify_scope(scope, parameters, settings).await);
            }
        }
        results
    }
}

#[async_trait]
impl<V> AnyVerifier for V
where
    V: Verifier,
{
    fn connector_type(&self) -> &'static str {
        Verifier::connector_type(self)
    }

    fn description(&self) -> &'static str {
        Verifier::description(self)
    }

    fn scopes(&self) -> &'static [Scope] {
        Verifier::scopes(self)
    }

    fn config_schema(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(V::Config)).unwrap_or_default()
    }

    async fn verify_scope(
        &self,
        scope: Scope,
        parameters: &Parameters,
        settings: &VerifierSettings,
    ) -> VerificationResult {
        let connector = Verifier::connector_type(self);
        let span = tracing::info_span!("verify", connector, scope = %scope);

        async move {
            if !Verifier::scopes(self).contains(&scope) {
                debug!("no probe declared for scope");
                return VerificationResult::unsupported(scope);
            }

            let started = Instant::now();
            let errors = match bind::<V::Config>(parameters) {
                Ok(config) => match scope {
                    Scope::Parameters => run_parameters(self, &config),
                    Scope::Connectivity => run_connectivity(self, &config, settings).await,
                },
                Err(errors) => errors,
            };

            let result = VerificationResult::builder(scope)
                .errors(errors)
                .duration(started.elapsed())
                .build();

            if result.is_ok() {
                info!(duration_ms = result.duration_ms(), "scope passed");
            } else {
                let codes: Vec<&str> = result.errors().iter().map(|e| e.code().as_str()).collect();
                warn!(
                    duration_ms = result.duration_ms(),
                    errors = ?codes,
                    "scope failed"
                );
            }
            result
        }
        .instrument(span)
        .await
    }
}

fn run_parameters<V: Verifier>(verifier: &V, config: &V::Config) -> Vec<VerificationError> {
    std::panic::catch_unwind(AssertUnwindSafe(|| verifier.verify_parameters(config)))
        .unwrap_or_else(|payload| {
            vec![classify(&ProbeFault::Panic(panic_message(payload.as_ref())))]
        })
}

async fn run_connectivity<V: Verifier>(
    verifier: &V,
    config: &V::Config,
    settings: &VerifierSettings,
) -> Vec<VerificationError> {
    // Binding alone does not range-check connector timeouts
    let limit = verifier
        .connectivity_timeout(config)
        .filter(|t| !t.is_zero())
        .map(|t| t.min(Duration::from_millis(MAX_CONNECTIVITY_TIMEOUT_MS)))
        .unwrap_or_else(|| settings.connectivity_timeout());

    let probe = AssertUnwindSafe(verifier.verify_connectivity(config)).catch_unwind();
    let outcome = match tokio::time::timeout(limit, probe).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(payload)) => Err(ProbeFault::Panic(panic_message(payload.as_ref()))),
        Err(_) => Err(ProbeFault::Timeout(format!(
            "no response after {}ms",
            limit.as_millis()
        ))),
    };

    match outcome {
        Ok(errors) => errors,
        Err(fault) => {
            debug!(category = fault.category(), "probe fault");
            vec![classify(&fault)]
        }
    }
}
