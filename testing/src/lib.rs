//! # Peer Requests Testing
//!
//! Deterministic mocks and a prewired [`TestEnvironment`] for testing the
//! request engine without real infrastructure.
//!
//! This crate provides:
//! - Mock implementations of the environment traits
//! - A fixed [`test_clock`] so timestamps are reproducible
//! - A [`TestEnvironment`] bundling the mocks with handles for assertions
//!
//! ## Example
//!
//! ```ignore
//! use peer_requests_testing::TestEnvironment;
//!
//! #[tokio::test]
//! async fn receives_a_request() {
//!     let env = TestEnvironment::new("did:e:self");
//!     let controller = IncomingRequestsController::new(env.environment.clone(), registry);
//!
//!     controller.received(content, source).await.unwrap();
//!
//!     assert_eq!(env.events.events().len(), 1);
//! }
//! ```

pub mod mocks;

pub use mocks::{
    CapturingEventPublisher, FixedClock, InMemoryAttributeStore, InMemoryRequestCollection,
    SequentialIdGenerator, StaticIdentityResolver, test_clock,
};

use peer_requests_core::environment::RequestsEnvironment;
use peer_requests_core::ids::CoreAddress;
use std::sync::Arc;

/// A fully mocked [`RequestsEnvironment`] with handles to the mocks.
///
/// The `environment` field is what controllers take; the other fields keep
/// concrete handles to the same mock instances so tests can inspect stored
/// requests, captured events and attribute bookkeeping.
pub struct TestEnvironment {
    /// The environment to hand to controllers.
    pub environment: RequestsEnvironment,
    /// Handle to the in-memory request collection.
    pub requests: Arc<InMemoryRequestCollection>,
    /// Handle to the capturing event publisher.
    pub events: Arc<CapturingEventPublisher>,
    /// Handle to the in-memory attribute store.
    pub attributes: Arc<InMemoryAttributeStore>,
    /// The fixed clock all mocks share.
    pub clock: FixedClock,
}

impl TestEnvironment {
    /// Build a test environment whose local identity is `own_address`.
    #[must_use]
    pub fn new(own_address: &str) -> Self {
        let clock = test_clock();
        let requests = Arc::new(InMemoryRequestCollection::new());
        let events = Arc::new(CapturingEventPublisher::new());
        let attributes = Arc::new(InMemoryAttributeStore::new(CoreAddress::new(own_address)));
        let environment = RequestsEnvironment::new(
            Arc::new(clock.clone()),
            Arc::new(SequentialIdGenerator::new()),
            Arc::new(StaticIdentityResolver::new(own_address)),
            Arc::clone(&requests) as Arc<dyn peer_requests_core::environment::RequestCollection>,
            Arc::clone(&events) as Arc<dyn peer_requests_core::events::EventPublisher>,
            Arc::clone(&attributes) as Arc<dyn peer_requests_core::environment::AttributeStore>,
        );
        Self {
            environment,
            requests,
            events,
            attributes,
            clock,
        }
    }
}
