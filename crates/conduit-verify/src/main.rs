//! conduit-verify - Check connector configurations from the command line
//!
//! # Usage
//!
//! ```bash
//! # Verify a request file (connector, scopes, parameters)
//! conduit-verify verify --request kinesis.yaml
//!
//! # Inline parameters
//! conduit-verify verify --connector sql --scope parameters \
//!     -p host=db.internal -p database=shop -p username=reporting -p password=secret
//!
//! # List connector types / show a configuration schema
//! conduit-verify connectors
//! conduit-verify schema aws-kinesis --format yaml
//! ```
//!
//! Exit codes: `0` every scope passed or is unsupported, `1` at least one scope
//! reported errors, `2` the connector type is unknown.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use conduit_verify::{
    create_verifier_registry, ParameterValue, RequestFile, Scope, Status, VerificationRequest,
    VerificationResult, VerifierRegistry, VerifierSettings, VerifyError,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "conduit-verify")]
#[command(version, about = "Verify connector configurations against live systems")]
struct Cli {
    /// Path to a settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a connector configuration
    Verify {
        /// Connector type (e.g. aws-kinesis, kafka, sql, mqtt)
        #[arg(short, long, required_unless_present = "request")]
        connector: Option<String>,

        /// Scope to run (repeatable); all scopes when omitted
        #[arg(long = "scope", value_parser = parse_scope)]
        scopes: Vec<Scope>,

        /// Parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// YAML request file; inline options override its values
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// List available connector types
    Connectors,
    /// Show config schema for a connector type
    Schema {
        /// Connector type
        connector: String,
        /// Output format (json, yaml)
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Serialize)]
struct Report<'a> {
    connector: &'a str,
    results: &'a [VerificationResult],
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.settings {
        Some(path) => VerifierSettings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => VerifierSettings::default(),
    };
    let registry = create_verifier_registry(settings)?;

    match cli.command {
        Commands::Verify {
            connector,
            scopes,
            params,
            request,
            format,
        } => {
            let request = build_request(connector, scopes, params, request)?;
            verify(&registry, request, format).await
        }
        Commands::Connectors => {
            list_connectors(&registry);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schema { connector, format } => {
            show_schema(&registry, &connector, format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn parse_scope(s: &str) -> std::result::Result<Scope, String> {
    s.parse()
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=value: no '=' found in '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("invalid KEY=value: empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn build_request(
    connector: Option<String>,
    scopes: Vec<Scope>,
    params: Vec<(String, String)>,
    request_file: Option<PathBuf>,
) -> Result<VerificationRequest> {
    let mut request = match request_file {
        Some(path) => RequestFile::from_file(&path)
            .with_context(|| format!("Failed to load request from {}", path.display()))?
            .into_request(),
        None => VerificationRequest::new(connector.clone().unwrap_or_default()),
    };

    if let Some(connector) = connector {
        request.connector_type = connector;
    }
    if !scopes.is_empty() {
        request.scopes = scopes.into_iter().collect();
    }
    for (key, value) in params {
        request.parameters.insert(key, ParameterValue::String(value));
    }
    Ok(request)
}

async fn verify(
    registry: &VerifierRegistry,
    request: VerificationRequest,
    format: OutputFormat,
) -> Result<ExitCode> {
    info!(connector = %request.connector_type, "verifying");
    debug!(keys = ?request.parameters.keys().collect::<Vec<_>>(), "request parameters");

    let results = match registry.verify(&request).await {
        Ok(results) => results,
        Err(VerifyError::UnknownConnector(id)) => {
            eprintln!(
                "Unknown connector type: '{}'\nUse 'conduit-verify connectors' to list available types",
                id
            );
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    let report = Report {
        connector: &request.connector_type,
        results: &results,
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Table => {
            println!("{}", request.connector_type);
            for result in &results {
                println!("  {}", result.to_string().replace('\n', "\n  "));
            }
        }
    }

    if results.iter().any(|r| r.status() == Status::Error) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn list_connectors(registry: &VerifierRegistry) {
    println!("{} connectors\n", registry.len());
    println!("{:<14} {:<26} DESCRIPTION", "TYPE", "SCOPES");
    for descriptor in registry.list() {
        let scopes: Vec<&str> = descriptor.scopes().iter().map(Scope::as_str).collect();
        println!(
            "{:<14} {:<26} {}",
            descriptor.connector_type(),
            scopes.join(","),
            descriptor.description()
        );
    }
}

fn show_schema(registry: &VerifierRegistry, connector: &str, format: OutputFormat) -> Result<()> {
    let descriptor = registry.lookup(connector).with_context(|| {
        "Use 'conduit-verify connectors' to list available types".to_string()
    })?;
    let schema = descriptor.config_schema();

    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(schema)?),
        _ => println!("{}", serde_json::to_string_pretty(schema)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("region=us-east-1").unwrap(),
            ("region".to_string(), "us-east-1".to_string())
        );
        assert_eq!(
            parse_key_val("password=a=b").unwrap(),
            ("password".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("region").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_inline_options_override() {
        let request = build_request(
            Some("kafka".to_string()),
            vec![Scope::Parameters],
            vec![("brokers".to_string(), "localhost:9092".to_string())],
            None,
        )
        .unwrap();
        assert_eq!(request.connector_type, "kafka");
        assert_eq!(request.scopes.len(), 1);
        assert_eq!(
            request.parameters["brokers"],
            ParameterValue::String("localhost:9092".into())
        );
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "conduit-verify",
            "verify",
            "--connector",
            "sql",
            "--scope",
            "CONNECTIVITY",
            "-p",
            "host=db",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Verify {
                connector,
                scopes,
                params,
                format,
                ..
            } => {
                assert_eq!(connector.as_deref(), Some("sql"));
                assert_eq!(scopes, vec![Scope::Connectivity]);
                assert_eq!(params.len(), 1);
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected verify"),
        }
        assert!(Cli::try_parse_from(["conduit-verify", "verify"]).is_err());
    }
}
