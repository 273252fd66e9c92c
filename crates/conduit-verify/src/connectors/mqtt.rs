//! MQTT broker verifier
//!
//! MQTT has no resource listing, so only CONNECTIVITY is declared: the probe
//! completes the CONNECT/CONNACK handshake with the supplied credentials and
//! disconnects. PARAMETERS reports `UNSUPPORTED`.
//!
//! # Configuration
//!
//! ```yaml
//! connector: mqtt
//! scopes: [CONNECTIVITY]
//! parameters:
//!   brokerUrl: mqtts://broker.example.com:8883
//!   username: sensor-gateway
//!   password: ${MQTT_PASSWORD}
//! ```

use crate::error::{ProbeFault, ProbeResult};
use crate::traits::probe::{check_connectivity, ClientFactory, ResourceClient};
use crate::traits::result::{Scope, VerificationError};
use crate::traits::verifier::Verifier;
use crate::types::Credential;
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use validator::Validate;

/// Connector type identifier
pub const CONNECTOR_TYPE: &str = "mqtt";

/// Events polled while waiting for CONNACK or for DISCONNECT to go out
const MAX_HANDSHAKE_EVENTS: usize = 16;

/// Time allowed for DISCONNECT to reach the broker on close
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// MQTT verifier configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MqttVerifierConfig {
    /// Broker URL (`mqtt://host:port`, `mqtts://host:port` or `host:port`)
    #[validate(length(min = 1))]
    pub broker_url: String,

    pub username: Option<String>,

    pub password: Option<Credential>,

    /// Client identifier; a random one is generated when absent
    pub client_id: Option<String>,

    /// Bound for the CONNECTIVITY scope in milliseconds
    #[validate(range(min = 1, max = 600000))]
    pub timeout_ms: Option<u64>,
}

/// Parsed broker address
#[derive(Debug, Clone, PartialEq, Eq)]
struct BrokerAddress {
    host: String,
    port: u16,
    tls: bool,
}

fn parse_broker_url(url: &str) -> ProbeResult<BrokerAddress> {
    let (scheme, rest) = match url.find("://") {
        Some(pos) => (&url[..pos], &url[pos + 3..]),
        None => ("mqtt", url),
    };
    let tls = matches!(scheme.to_lowercase().as_str(), "mqtts" | "ssl" | "tls");
    let rest = rest.trim_end_matches('/');

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().ok().filter(|p| *p > 0).ok_or_else(|| {
                ProbeFault::illegal_parameter(
                    "brokerUrl",
                    format!("Invalid port in broker URL '{}'", url),
                )
            })?;
            (host, port)
        }
        None => (rest, if tls { 8883 } else { 1883 }),
    };
    if host.is_empty() {
        return Err(ProbeFault::illegal_parameter(
            "brokerUrl",
            format!("Missing host in broker URL '{}'", url),
        ));
    }

    Ok(BrokerAddress {
        host: host.to_string(),
        port,
        tls,
    })
}

/// MQTT verifier, generic over the client factory
pub struct MqttVerifier<F = RumqttClientFactory> {
    factory: F,
}

impl MqttVerifier {
    pub fn new() -> Self {
        Self {
            factory: RumqttClientFactory,
        }
    }
}

impl Default for MqttVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> MqttVerifier<F> {
    /// Use a custom client factory
    pub fn with_factory(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F> Verifier for MqttVerifier<F>
where
    F: ClientFactory<MqttVerifierConfig> + 'static,
{
    type Config = MqttVerifierConfig;

    fn connector_type(&self) -> &'static str {
        CONNECTOR_TYPE
    }

    fn description(&self) -> &'static str {
        "MQTT 3.1.1 broker login"
    }

    fn scopes(&self) -> &'static [Scope] {
        &[Scope::Connectivity]
    }

    async fn verify_connectivity(
        &self,
        config: &MqttVerifierConfig,
    ) -> ProbeResult<Vec<VerificationError>> {
        check_connectivity(&self.factory, config, None).await
    }

    fn connectivity_timeout(&self, config: &MqttVerifierConfig) -> Option<Duration> {
        config.timeout_ms.map(Duration::from_millis)
    }
}

/// Connects through rumqttc
#[derive(Debug, Clone, Copy, Default)]
pub struct RumqttClientFactory;

#[async_trait]
impl ClientFactory<MqttVerifierConfig> for RumqttClientFactory {
    async fn connect(&self, config: &MqttVerifierConfig) -> ProbeResult<Box<dyn ResourceClient>> {
        let address = parse_broker_url(&config.broker_url)?;
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("conduit-verify-{}", uuid::Uuid::new_v4().simple()));

        let mut options = MqttOptions::new(client_id, address.host.clone(), address.port);
        options.set_keep_alive(Duration::from_secs(10));
        options.set_clean_session(true);
        if let Some(ref username) = config.username {
            let password = config
                .password
                .as_ref()
                .map(|p| p.expose().to_string())
                .unwrap_or_default();
            options.set_credentials(username.clone(), password);
        }
        if address.tls {
            options.set_transport(rumqttc::Transport::Tls(Default::default()));
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        await_connack(&mut eventloop).await?;

        debug!(host = %address.host, port = address.port, "MQTT handshake completed");
        Ok(Box::new(MqttClient {
            client,
            eventloop,
        }))
    }
}

async fn await_connack(eventloop: &mut EventLoop) -> ProbeResult<()> {
    for _ in 0..MAX_HANDSHAKE_EVENTS {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(connack_fault(code)),
                };
            }
            Ok(_) => continue,
            Err(ConnectionError::ConnectionRefused(code)) => return Err(connack_fault(code)),
            Err(e) => return Err(ProbeFault::connection(e.to_string())),
        }
    }
    Err(ProbeFault::connection("broker did not acknowledge CONNECT"))
}

fn connack_fault(code: ConnectReturnCode) -> ProbeFault {
    match code {
        ConnectReturnCode::BadUserNamePassword | ConnectReturnCode::NotAuthorized => {
            ProbeFault::authentication(format!("Broker rejected the login: {:?}", code))
        }
        ConnectReturnCode::BadClientId => ProbeFault::illegal_parameter(
            "clientId",
            "Broker rejected the client identifier",
        ),
        other => ProbeFault::service("ConnAck", format!("{:?}", other)),
    }
}

struct MqttClient {
    client: AsyncClient,
    // Owns the socket; dropping it closes the connection.
    eventloop: EventLoop,
}

#[async_trait]
impl ResourceClient for MqttClient {
    async fn list_resources(&mut self) -> ProbeResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Queues DISCONNECT and drives the event loop until it is written
    async fn close(self: Box<Self>) {
        let MqttClient {
            client,
            mut eventloop,
        } = *self;
        if client.try_disconnect().is_err() {
            return;
        }

        let flushed = tokio::time::timeout(CLOSE_GRACE, async {
            for _ in 0..MAX_HANDSHAKE_EVENTS {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => return,
                    Ok(_) => continue,
                }
            }
        })
        .await;
        if flushed.is_err() {
            debug!("MQTT disconnect not flushed before close");
        }
    }
}
