//! Test doubles for verifiers
//!
//! [`MockClientFactory`] stands in for a real client factory. It counts every
//! `connect` and `close` so tests can assert that the PARAMETERS scope never
//! touches the network and that clients are released on every path.
//!
//! ```rust,ignore
//! use conduit_verify::traits::testing::MockClientFactory;
//!
//! let factory = MockClientFactory::listing(["orders"]);
//! let verifier = KinesisVerifier::with_factory(factory.clone());
//! // ... run verification ...
//! assert_eq!(factory.connects(), 1);
//! ```

use super::probe::{ClientFactory, ResourceClient};
use crate::error::{ProbeFault, ProbeResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What the mock does when connected
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Connect succeeds and the listing returns these names
    Listing(Vec<String>),
    /// `connect` fails
    ConnectFault(fn() -> ProbeFault),
    /// `connect` succeeds, `list_resources` fails
    ListFault(fn() -> ProbeFault),
    /// `list_resources` never completes
    Hang,
    /// `list_resources` panics
    Panic,
}

#[derive(Debug, Default)]
struct Counters {
    connects: AtomicUsize,
    closes: AtomicUsize,
    drops: AtomicUsize,
}

/// Instrumented client factory; clones share their counters
#[derive(Debug, Clone)]
pub struct MockClientFactory {
    behavior: MockBehavior,
    counters: Arc<Counters>,
}

impl MockClientFactory {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Factory whose clients list `names`
    pub fn listing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MockBehavior::Listing(
            names.into_iter().map(Into::into).collect(),
        ))
    }

    /// Number of `connect` calls so far
    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    /// Number of explicit `close` calls so far
    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Number of clients released (closed or dropped)
    pub fn released(&self) -> usize {
        self.counters.drops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: Sync> ClientFactory<C> for MockClientFactory {
    async fn connect(&self, _config: &C) -> ProbeResult<Box<dyn ResourceClient>> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        if let MockBehavior::ConnectFault(fault) = &self.behavior {
            return Err(fault());
        }
        Ok(Box::new(MockClient {
            behavior: self.behavior.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockClient {
    behavior: MockBehavior,
    counters: Arc<Counters>,
}

#[async_trait]
impl ResourceClient for MockClient {
    async fn list_resources(&mut self) -> ProbeResult<Vec<String>> {
        match &self.behavior {
            MockBehavior::Listing(names) => Ok(names.clone()),
            MockBehavior::ListFault(fault) => Err(fault()),
            MockBehavior::Hang => futures::future::pending().await,
            MockBehavior::Panic => panic!("mock client exploded"),
            MockBehavior::ConnectFault(fault) => Err(fault()),
        }
    }

    async fn close(self: Box<Self>) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MockClient {
    fn drop(&mut self) {
        self.counters.drops.fetch_add(1, Ordering::SeqCst);
    }
}
