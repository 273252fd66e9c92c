//! PostgreSQL verifier (connector type `sql`)
//!
//! CONNECTIVITY logs in with the supplied credentials and lists the tables of
//! `schema` from `information_schema.tables`. When `table` is set it must be
//! one of them.
//!
//! # Configuration
//!
//! ```yaml
//! connector: sql
//! parameters:
//!   host: db.internal
//!   port: 5432
//!   database: shop
//!   username: reporting
//!   password: ${PG_PASSWORD}
//!   schema: public
//!   table: orders
//! ```
//!
//! SQLSTATE mapping: `28P01`/`28000` -> authentication, `3D000` (unknown
//! database) -> illegal `database` parameter.

use crate::error::{ProbeFault, ProbeResult};
use crate::traits::binder::validation_errors;
use crate::traits::probe::{check_connectivity, ClientFactory, ResourceClient, TargetResource};
use crate::traits::result::{Scope, VerificationError};
use crate::traits::verifier::Verifier;
use crate::types::Credential;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;
use tracing::debug;
use validator::Validate;

/// Time allowed for the connection task to send `Terminate` on close
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Connector type identifier
pub const CONNECTOR_TYPE: &str = "sql";

const LIST_TABLES: &str = "SELECT table_name::text FROM information_schema.tables \
                           WHERE table_schema = $1 ORDER BY table_name";

/// PostgreSQL verifier configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostgresVerifierConfig {
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    pub port: u16,

    #[validate(length(min = 1, max = 63, message = "database must be 1 to 63 characters"))]
    pub database: String,

    #[validate(length(min = 1, max = 63, message = "username must be 1 to 63 characters"))]
    pub username: String,

    pub password: Credential,

    /// Schema the tables are listed from
    #[serde(default = "default_schema")]
    #[validate(length(min = 1, max = 63))]
    pub schema: String,

    /// Table that must exist in `schema`
    pub table: Option<String>,

    /// Bound for the CONNECTIVITY scope in milliseconds
    #[validate(range(min = 1, max = 600000))]
    pub timeout_ms: Option<u64>,
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    "public".to_string()
}

/// PostgreSQL verifier, generic over the client factory
pub struct PostgresVerifier<F = PostgresClientFactory> {
    factory: F,
}

impl PostgresVerifier {
    pub fn new() -> Self {
        Self {
            factory: PostgresClientFactory,
        }
    }
}

impl Default for PostgresVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> PostgresVerifier<F> {
    /// Use a custom client factory
    pub fn with_factory(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F> Verifier for PostgresVerifier<F>
where
    F: ClientFactory<PostgresVerifierConfig> + 'static,
{
    type Config = PostgresVerifierConfig;

    fn connector_type(&self) -> &'static str {
        CONNECTOR_TYPE
    }

    fn description(&self) -> &'static str {
        "PostgreSQL database, schema and table"
    }

    fn verify_parameters(&self, config: &PostgresVerifierConfig) -> Vec<VerificationError> {
        validation_errors(config)
    }

    async fn verify_connectivity(
        &self,
        config: &PostgresVerifierConfig,
    ) -> ProbeResult<Vec<VerificationError>> {
        let target = config.table.as_deref().map(|table| {
            TargetResource::new("Table", "table", table).hint("Check table name and schema.")
        });
        check_connectivity(&self.factory, config, target).await
    }

    fn connectivity_timeout(&self, config: &PostgresVerifierConfig) -> Option<Duration> {
        config.timeout_ms.map(Duration::from_millis)
    }
}

/// Opens real connections through tokio-postgres (no TLS)
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresClientFactory;

#[async_trait]
impl ClientFactory<PostgresVerifierConfig> for PostgresClientFactory {
    async fn connect(
        &self,
        config: &PostgresVerifierConfig,
    ) -> ProbeResult<Box<dyn ResourceClient>> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.username)
            .password(config.password.expose())
            .application_name("conduit-verify");
        if let Some(ms) = config.timeout_ms {
            pg.connect_timeout(Duration::from_millis(ms));
        }

        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| postgres_fault(&e, &config.database))?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "postgres connection closed with error");
            }
        });

        debug!(host = %config.host, database = %config.database, "connected to PostgreSQL");
        Ok(Box::new(PostgresClient {
            client,
            connection: Some(connection),
            schema: config.schema.clone(),
        }))
    }
}

struct PostgresClient {
    client: tokio_postgres::Client,
    connection: Option<JoinHandle<()>>,
    schema: String,
}

#[async_trait]
impl ResourceClient for PostgresClient {
    async fn list_resources(&mut self) -> ProbeResult<Vec<String>> {
        let rows = self
            .client
            .query(LIST_TABLES, &[&self.schema])
            .await
            .map_err(|e| postgres_fault(&e, &self.schema))?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| ProbeFault::service("Postgres", e.to_string()))
            })
            .collect()
    }

    /// Drops the client so the connection task sends `Terminate`, then waits
    /// for the task to finish.
    async fn close(self: Box<Self>) {
        let mut this = self;
        let connection = this.connection.take();
        drop(this);
        if let Some(mut connection) = connection {
            if tokio::time::timeout(CLOSE_GRACE, &mut connection).await.is_err() {
                connection.abort();
            }
        }
    }
}

impl Drop for PostgresClient {
    fn drop(&mut self) {
        if let Some(connection) = &self.connection {
            connection.abort();
        }
    }
}

fn postgres_fault(err: &tokio_postgres::Error, database: &str) -> ProbeFault {
    let message = err
        .as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| err.to_string());
    classify_sqlstate(err.code().map(SqlState::code), message, database)
}

/// Classify by SQLSTATE; errors without one are transport failures
fn classify_sqlstate(code: Option<&str>, message: String, database: &str) -> ProbeFault {
    match code {
        Some("28P01") | Some("28000") => ProbeFault::authentication(message),
        Some("3D000") => ProbeFault::illegal_parameter(
            "database",
            format!("Database '{}' does not exist. Check database name.", database),
        ),
        Some(code) => ProbeFault::service(code, message),
        None => ProbeFault::connection(message),
    }
}
