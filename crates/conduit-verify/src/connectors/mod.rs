//! Connector verifiers
//!
//! One module per connector type. Each verifier is generic over its client
//! factory so that tests can substitute
//! [`MockClientFactory`](crate::traits::testing::MockClientFactory) for the
//! real network client.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    VerifierRegistry                      │
//! ├──────────────┬──────────────┬─────────────┬──────────────┤
//! │ aws-kinesis  │ kafka        │ sql         │ mqtt         │
//! │ aws-sdk      │ rskafka      │ tokio-pg    │ rumqttc      │
//! │ PARAMETERS   │ PARAMETERS   │ PARAMETERS  │              │
//! │ CONNECTIVITY │ CONNECTIVITY │ CONNECTIVITY│ CONNECTIVITY │
//! └──────────────┴──────────────┴─────────────┴──────────────┘
//! ```

#[cfg(feature = "kinesis")]
pub mod kinesis;

#[cfg(feature = "kafka")]
pub mod kafka;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mqtt")]
pub mod mqtt;

use crate::config::VerifierSettings;
use crate::error::Result;
use crate::traits::registry::VerifierRegistry;

/// Create a registry with every enabled connector
pub fn create_verifier_registry(settings: VerifierSettings) -> Result<VerifierRegistry> {
    #[allow(unused_mut)]
    let mut builder = VerifierRegistry::builder().settings(settings);

    #[cfg(feature = "kinesis")]
    builder.register(kinesis::KinesisVerifier::new())?;

    #[cfg(feature = "kafka")]
    builder.register(kafka::KafkaVerifier::new())?;

    #[cfg(feature = "postgres")]
    builder.register(postgres::PostgresVerifier::new())?;

    #[cfg(feature = "mqtt")]
    builder.register(mqtt::MqttVerifier::new())?;

    Ok(builder.build())
}
