//! Apache Kafka verifier
//!
//! Uses the pure Rust `rskafka` client. CONNECTIVITY connects to the bootstrap
//! brokers, fetches cluster metadata (`list_topics`) and, when `topic` is set,
//! looks for it in the listing.
//!
//! # Configuration
//!
//! ```yaml
//! connector: kafka
//! parameters:
//!   brokers: kafka-1:9092,kafka-2:9092
//!   securityProtocol: SASL_PLAINTEXT
//!   username: ingest
//!   password: ${KAFKA_PASSWORD}
//!   topic: orders
//! ```
//!
//! rskafka v0.5 only supports SASL PLAIN over plaintext transport here; TLS
//! protocols fail binding.
//!
//! The client makes one attempt per broker (zero backoff deadline). rskafka
//! logs per-broker failures, SASL rejections included, and reports only that
//! no broker was reachable, so a rejected login surfaces as a connection
//! fault naming both causes.

use crate::error::{ProbeFault, ProbeResult};
use crate::traits::binder::validation_errors;
use crate::traits::probe::{check_connectivity, ClientFactory, ResourceClient, TargetResource};
use crate::traits::result::{Scope, VerificationError};
use crate::traits::verifier::Verifier;
use crate::types::Credential;
use async_trait::async_trait;
use rskafka::client::error::{Error as KafkaError, ProtocolError};
use rskafka::client::{Client, ClientBuilder, SaslConfig};
use rskafka::BackoffConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use validator::Validate;

/// Connector type identifier
pub const CONNECTOR_TYPE: &str = "kafka";

/// Security protocol for Kafka connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityProtocol {
    /// No encryption, no authentication
    #[default]
    #[serde(alias = "plaintext")]
    Plaintext,
    /// No encryption, SASL PLAIN authentication
    #[serde(alias = "sasl_plaintext")]
    SaslPlaintext,
}

/// Kafka verifier configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaVerifierConfig {
    /// Comma-separated bootstrap brokers (`host:port`)
    #[validate(length(min = 1))]
    pub brokers: String,

    #[serde(default)]
    pub security_protocol: SecurityProtocol,

    /// SASL username
    pub username: Option<String>,

    /// SASL password
    pub password: Option<Credential>,

    /// Topic that must exist
    #[validate(length(min = 1, max = 249, message = "topic must be 1 to 249 characters"))]
    pub topic: Option<String>,

    /// Bound for the CONNECTIVITY scope in milliseconds
    #[validate(range(min = 1, max = 600000))]
    pub timeout_ms: Option<u64>,
}

impl KafkaVerifierConfig {
    /// Broker addresses, trimmed, empty entries dropped
    pub fn broker_list(&self) -> Vec<String> {
        self.brokers
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// SASL credentials when the protocol requires them
    fn sasl_config(&self) -> ProbeResult<Option<SaslConfig>> {
        match self.security_protocol {
            SecurityProtocol::Plaintext => Ok(None),
            SecurityProtocol::SaslPlaintext => match (&self.username, &self.password) {
                (Some(username), Some(password)) if !password.is_blank() => {
                    Ok(Some(SaslConfig::Plain {
                        username: username.clone(),
                        password: password.expose().to_string(),
                    }))
                }
                _ => Err(ProbeFault::illegal_parameter(
                    "username",
                    "SASL authentication requires username and password",
                )),
            },
        }
    }
}

/// Validate a `host:port` broker address
fn check_broker_address(broker: &str) -> Result<(), String> {
    let Some((host, port)) = broker.rsplit_once(':') else {
        return Err(format!("Broker '{}' must be in host:port form", broker));
    };
    if host.trim().is_empty() {
        return Err(format!("Broker '{}' has an empty host", broker));
    }
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(format!("Broker '{}' has an invalid port", broker)),
    }
}

/// Kafka verifier, generic over the client factory
pub struct KafkaVerifier<F = RsKafkaClientFactory> {
    factory: F,
}

impl KafkaVerifier {
    pub fn new() -> Self {
        Self {
            factory: RsKafkaClientFactory,
        }
    }
}

impl Default for KafkaVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> KafkaVerifier<F> {
    /// Use a custom client factory
    pub fn with_factory(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F> Verifier for KafkaVerifier<F>
where
    F: ClientFactory<KafkaVerifierConfig> + 'static,
{
    type Config = KafkaVerifierConfig;

    fn connector_type(&self) -> &'static str {
        CONNECTOR_TYPE
    }

    fn description(&self) -> &'static str {
        "Apache Kafka cluster and topic"
    }

    fn verify_parameters(&self, config: &KafkaVerifierConfig) -> Vec<VerificationError> {
        let mut errors = validation_errors(config);

        let brokers = config.broker_list();
        if brokers.is_empty() {
            errors.push(VerificationError::illegal_parameter(
                "brokers",
                "At least one broker is required",
            ));
        }
        // First malformed address only; the parameter is reported once
        if let Some(message) = brokers.iter().find_map(|b| check_broker_address(b).err()) {
            errors.push(VerificationError::illegal_parameter("brokers", message));
        }

        if config.security_protocol == SecurityProtocol::SaslPlaintext {
            if config.username.as_deref().map_or(true, |u| u.trim().is_empty()) {
                errors.push(VerificationError::missing_parameter("username"));
            }
            if config.password.as_ref().map_or(true, Credential::is_blank) {
                errors.push(VerificationError::missing_parameter("password"));
            }
        }
        errors
    }

    async fn verify_connectivity(
        &self,
        config: &KafkaVerifierConfig,
    ) -> ProbeResult<Vec<VerificationError>> {
        let target = config
            .topic
            .as_deref()
            .map(|topic| TargetResource::new("Topic", "topic", topic).hint("Check topic name."));
        check_connectivity(&self.factory, config, target).await
    }

    fn connectivity_timeout(&self, config: &KafkaVerifierConfig) -> Option<Duration> {
        config.timeout_ms.map(Duration::from_millis)
    }
}

/// Builds real Kafka clients through rskafka
#[derive(Debug, Clone, Copy, Default)]
pub struct RsKafkaClientFactory;

#[async_trait]
impl ClientFactory<KafkaVerifierConfig> for RsKafkaClientFactory {
    async fn connect(&self, config: &KafkaVerifierConfig) -> ProbeResult<Box<dyn ResourceClient>> {
        let brokers = config.broker_list();
        if brokers.is_empty() {
            return Err(ProbeFault::illegal_parameter(
                "brokers",
                "At least one broker is required",
            ));
        }

        let mut builder = ClientBuilder::new(brokers.clone()).backoff_config(single_attempt());
        if let Some(sasl) = config.sasl_config()? {
            builder = builder.sasl_config(sasl);
        }

        let client = builder
            .build()
            .await
            .map_err(|e| kafka_fault(&e, &brokers))?;

        debug!(brokers = ?brokers, "connected to Kafka");
        Ok(Box::new(KafkaClient { client, brokers }))
    }
}

/// Backoff that gives up after the first failure
fn single_attempt() -> BackoffConfig {
    BackoffConfig {
        deadline: Some(Duration::ZERO),
        ..Default::default()
    }
}

struct KafkaClient {
    client: Client,
    brokers: Vec<String>,
}

#[async_trait]
impl ResourceClient for KafkaClient {
    async fn list_resources(&mut self) -> ProbeResult<Vec<String>> {
        let topics = self
            .client
            .list_topics()
            .await
            .map_err(|e| kafka_fault(&e, &self.brokers))?;
        Ok(topics.into_iter().map(|t| t.name).collect())
    }

    // Dropping the client closes its broker connections.
    async fn close(self: Box<Self>) {}
}

/// Classify an rskafka client error
fn kafka_fault(err: &KafkaError, brokers: &[String]) -> ProbeFault {
    match err {
        KafkaError::Connection(_) | KafkaError::RetryFailed(_) => ProbeFault::connection(format!(
            "Could not connect to any broker in [{}] ({}); check broker addresses and SASL credentials",
            brokers.join(","),
            err
        )),
        KafkaError::Timeout => ProbeFault::Timeout("Kafka request timed out".to_string()),
        KafkaError::ServerError {
            protocol_error,
            error_message,
            ..
        } => protocol_fault(*protocol_error, error_message.as_deref()),
        KafkaError::Request(e) => ProbeFault::connection(e.to_string()),
        KafkaError::InvalidResponse(msg) => ProbeFault::service("InvalidResponse", msg.as_str()),
        other => ProbeFault::service("Kafka", other.to_string()),
    }
}

/// Classify a broker-reported protocol error
fn protocol_fault(error: ProtocolError, message: Option<&str>) -> ProbeFault {
    let message = message.map_or_else(|| error.to_string(), str::to_string);
    match error {
        ProtocolError::SaslAuthenticationFailed
        | ProtocolError::UnsupportedSaslMechanism
        | ProtocolError::IllegalSaslState
        | ProtocolError::TopicAuthorizationFailed
        | ProtocolError::GroupAuthorizationFailed
        | ProtocolError::ClusterAuthorizationFailed
        | ProtocolError::TransactionalIdAuthorizationFailed
        | ProtocolError::DelegationTokenAuthorizationFailed => ProbeFault::authentication(message),
        other => ProbeFault::service(other.to_string(), message),
    }
}
