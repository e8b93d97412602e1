//! Mock implementations of the engine's environment traits.
//!
//! Every mock is deterministic: the clock is fixed, ids are sequential and
//! the stores live in memory, so tests never depend on wall time, randomness
//! or external infrastructure.

#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use chrono::{DateTime, Utc};
use peer_requests_core::environment::{
    AttributeStore, AttributeStoreError, Clock, CollectionError, IdGenerator, IdentityResolver,
    LocalAttribute, RequestCollection,
};
use peer_requests_core::events::{EventPublisher, RequestEvent};
use peer_requests_core::ids::{AttributeId, CoreAddress, RequestId};
use peer_requests_core::local_request::LocalRequest;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Fixed clock for deterministic tests.
///
/// Always returns the same time, making tests reproducible.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// A [`FixedClock`] pinned to 2025-01-01T00:00:00Z.
#[must_use]
#[allow(clippy::expect_used)] // Static timestamp is known to parse
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        "2025-01-01T00:00:00Z"
            .parse()
            .expect("static timestamp parses"),
    )
}

/// Id generator producing `REQ1`, `REQ2`, … and `ATT1`, `ATT2`, … in order.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    requests: AtomicU64,
    attributes: AtomicU64,
}

impl SequentialIdGenerator {
    /// Create a generator starting at 1 for both id kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate_request_id(&self) -> RequestId {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        RequestId::new(format!("REQ{n}"))
    }

    fn generate_attribute_id(&self) -> AttributeId {
        let n = self.attributes.fetch_add(1, Ordering::SeqCst) + 1;
        AttributeId::new(format!("ATT{n}"))
    }
}

/// Identity resolver returning a fixed own address.
#[derive(Debug, Clone)]
pub struct StaticIdentityResolver {
    address: CoreAddress,
}

impl StaticIdentityResolver {
    /// Create a resolver for the given address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: CoreAddress::new(address),
        }
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn own_address(&self) -> CoreAddress {
        self.address.clone()
    }
}

/// In-memory request collection backed by a `HashMap` of documents.
#[derive(Debug, Default)]
pub struct InMemoryRequestCollection {
    documents: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemoryRequestCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests, for assertions.
    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    /// Whether the collection holds no requests.
    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

impl RequestCollection for InMemoryRequestCollection {
    fn read(
        &self,
        id: RequestId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, CollectionError>> + Send + '_>>
    {
        Box::pin(async move { Ok(self.documents.lock().await.get(id.as_str()).cloned()) })
    }

    fn create(
        &self,
        request: LocalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CollectionError>> + Send + '_>> {
        Box::pin(async move {
            let document = request
                .to_document()
                .map_err(|e| CollectionError::SerializationError(e.to_string()))?;
            let mut documents = self.documents.lock().await;
            if documents.contains_key(request.id.as_str()) {
                return Err(CollectionError::StorageError(format!(
                    "record '{}' already exists",
                    request.id
                )));
            }
            documents.insert(request.id.to_string(), document);
            Ok(())
        })
    }

    fn update(
        &self,
        _old: serde_json::Value,
        updated: LocalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CollectionError>> + Send + '_>> {
        Box::pin(async move {
            let document = updated
                .to_document()
                .map_err(|e| CollectionError::SerializationError(e.to_string()))?;
            let mut documents = self.documents.lock().await;
            if !documents.contains_key(updated.id.as_str()) {
                return Err(CollectionError::UnknownRecord(updated.id.clone()));
            }
            documents.insert(updated.id.to_string(), document);
            Ok(())
        })
    }
}

/// Event publisher that records every published event for assertions.
#[derive(Debug, Default)]
pub struct CapturingEventPublisher {
    events: StdMutex<Vec<RequestEvent>>,
}

impl CapturingEventPublisher {
    /// Create a publisher with an empty capture buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<RequestEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl EventPublisher for CapturingEventPublisher {
    fn publish(&self, event: RequestEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}

/// In-memory attribute store tracking shared copies per source attribute.
pub struct InMemoryAttributeStore {
    owner: CoreAddress,
    clock: FixedClock,
    ids: SequentialIdGenerator,
    attributes: Mutex<HashMap<String, LocalAttribute>>,
    copies: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryAttributeStore {
    /// Create an empty store owned by `owner`.
    #[must_use]
    pub fn new(owner: CoreAddress) -> Self {
        Self {
            owner,
            clock: test_clock(),
            ids: SequentialIdGenerator::new(),
            attributes: Mutex::new(HashMap::new()),
            copies: Mutex::new(HashMap::new()),
        }
    }

    /// The shared copies recorded for `source`, for assertions.
    pub async fn shared_copies_of(&self, source: &AttributeId) -> Vec<LocalAttribute> {
        let copies = self.copies.lock().await;
        let attributes = self.attributes.lock().await;
        copies
            .get(source.as_str())
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| attributes.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn insert(&self, attribute: LocalAttribute) -> LocalAttribute {
        self.attributes
            .lock()
            .await
            .insert(attribute.id.to_string(), attribute.clone());
        attribute
    }
}

impl AttributeStore for InMemoryAttributeStore {
    fn create_local_attribute(
        &self,
        value: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<LocalAttribute, AttributeStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let attribute = LocalAttribute {
                id: self.ids.generate_attribute_id(),
                owner: self.owner.clone(),
                value,
                shared_with: None,
                created_at: self.clock.now(),
            };
            Ok(self.insert(attribute).await)
        })
    }

    fn create_peer_local_attribute(
        &self,
        value: serde_json::Value,
        peer: CoreAddress,
    ) -> Pin<Box<dyn Future<Output = Result<LocalAttribute, AttributeStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let attribute = LocalAttribute {
                id: self.ids.generate_attribute_id(),
                owner: peer,
                value,
                shared_with: None,
                created_at: self.clock.now(),
            };
            Ok(self.insert(attribute).await)
        })
    }

    fn create_shared_local_attribute_copy(
        &self,
        source: AttributeId,
        peer: CoreAddress,
    ) -> Pin<Box<dyn Future<Output = Result<LocalAttribute, AttributeStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let source_attribute = self
                .attributes
                .lock()
                .await
                .get(source.as_str())
                .cloned()
                .ok_or_else(|| AttributeStoreError::NotFound(source.clone()))?;
            let copy = LocalAttribute {
                id: self.ids.generate_attribute_id(),
                owner: source_attribute.owner,
                value: source_attribute.value,
                shared_with: Some(peer),
                created_at: self.clock.now(),
            };
            self.copies
                .lock()
                .await
                .entry(source.to_string())
                .or_default()
                .push(copy.id.to_string());
            Ok(self.insert(copy).await)
        })
    }

    fn get_local_attribute(
        &self,
        id: AttributeId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<LocalAttribute>, AttributeStoreError>> + Send + '_>>
    {
        Box::pin(async move { Ok(self.attributes.lock().await.get(id.as_str()).cloned()) })
    }
}
