//! Building blocks for CONNECTIVITY probes
//!
//! A connectivity probe follows the same shape for every connector:
//!
//! ```text
//! ClientFactory::connect(config) ──▶ ResourceClient::list_resources() ──▶ close()
//!                                              │
//!                                              ▼
//!                               resource_exists(listing, target)
//! ```
//!
//! The client is owned by one probe invocation. [`check_connectivity`] closes
//! it whether or not the listing succeeded; client implementations also
//! release their transport on `Drop`, which covers cancellation by timeout.

use super::result::VerificationError;
use crate::error::ProbeResult;
use async_trait::async_trait;
use tracing::debug;

/// Short-lived client for one external system
#[async_trait]
pub trait ResourceClient: Send {
    /// Minimal read-only operation: names of the resources visible with the
    /// supplied credentials, in the order the system returned them.
    ///
    /// Clients for systems without a resource listing return an empty list
    /// once their handshake completed.
    async fn list_resources(&mut self) -> ProbeResult<Vec<String>>;

    /// Release the connection
    async fn close(self: Box<Self>);
}

/// Creates a [`ResourceClient`] from a typed configuration
#[async_trait]
pub trait ClientFactory<C>: Send + Sync {
    async fn connect(&self, config: &C) -> ProbeResult<Box<dyn ResourceClient>>;
}

/// A named resource the configuration expects to exist
#[derive(Debug, Clone, Copy)]
pub struct TargetResource<'a> {
    /// Human-readable kind, e.g. "Stream" or "Topic"
    pub kind: &'static str,
    /// Parameter the name came from
    pub parameter: &'static str,
    /// Configured name
    pub name: &'a str,
    /// Hint appended to the error message
    pub hint: &'static str,
}

impl<'a> TargetResource<'a> {
    pub fn new(kind: &'static str, parameter: &'static str, name: &'a str) -> Self {
        Self {
            kind,
            parameter,
            name,
            hint: "",
        }
    }

    pub fn hint(mut self, hint: &'static str) -> Self {
        self.hint = hint;
        self
    }

    /// Error reported when the resource is absent from the listing
    pub fn missing(&self) -> VerificationError {
        let mut message = format!("{} '{}' does not exist.", self.kind, self.name);
        if !self.hint.is_empty() {
            message.push(' ');
            message.push_str(self.hint);
        }
        VerificationError::illegal_parameter(self.parameter, message)
    }
}

/// Case-insensitive exact match against a listing.
///
/// Scans in listing order and stops at the first match. A blank name never
/// matches.
pub fn resource_exists<S: AsRef<str>>(names: &[S], wanted: &str) -> bool {
    if wanted.trim().is_empty() {
        return false;
    }
    names.iter().any(|name| eq_ignore_case(name.as_ref(), wanted))
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Connect, list, close, then check the target resource if one is named.
///
/// Faults from `connect` or `list_resources` propagate to the caller for
/// classification; a missing target is reported as a regular error.
pub async fn check_connectivity<C, F>(
    factory: &F,
    config: &C,
    target: Option<TargetResource<'_>>,
) -> ProbeResult<Vec<VerificationError>>
where
    C: Sync,
    F: ClientFactory<C> + ?Sized,
{
    let mut client = factory.connect(config).await?;
    let listing = client.list_resources().await;
    client.close().await;
    let names = listing?;

    debug!(resources = names.len(), "listed resources");

    match target {
        Some(target) if !resource_exists(&names, target.name) => Ok(vec![target.missing()]),
        _ => Ok(Vec::new()),
    }
}
