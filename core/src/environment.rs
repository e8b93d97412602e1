//! Environment traits: the injected dependencies of the request engine.
//!
//! All external collaborators are abstracted behind traits and bundled in a
//! [`RequestsEnvironment`], so controllers and processors never touch a real
//! clock, store or transport directly. Production wires real implementations;
//! tests use the deterministic mocks from `peer-requests-testing`.
//!
//! # Dyn Compatibility
//!
//! The async traits here use explicit `Pin<Box<dyn Future>>` returns instead
//! of `async fn` so they can be used as trait objects (`Arc<dyn …>`) inside
//! the shared environment.

use crate::events::EventPublisher;
use crate::ids::{AttributeId, CoreAddress, RequestId};
use crate::local_request::LocalRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Generator for new identifiers.
///
/// Abstracted so tests can produce predictable, sequential ids.
pub trait IdGenerator: Send + Sync {
    /// Generate a fresh request id.
    fn generate_request_id(&self) -> RequestId;

    /// Generate a fresh attribute id.
    fn generate_attribute_id(&self) -> AttributeId;
}

/// Supplies the local account's own address for ownership checks.
pub trait IdentityResolver: Send + Sync {
    /// The address of the local identity.
    fn own_address(&self) -> CoreAddress;
}

/// Errors that can occur in the persisted request collection.
#[derive(Error, Debug, Clone)]
pub enum CollectionError {
    /// The underlying storage failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A document could not be serialized or deserialized by the store.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// `update` was called for a request that was never created.
    #[error("Cannot update unknown record '{0}'")]
    UnknownRecord(RequestId),
}

/// Keyed document store holding serialized [`LocalRequest`]s.
///
/// The engine reads a document, mutates the aggregate in memory and writes it
/// back exactly once per operation; no transaction spans multiple requests.
/// `update` receives the previously read document so implementations can
/// detect lost updates if they choose to, but the engine itself does not
/// retry on conflict.
pub trait RequestCollection: Send + Sync {
    /// Read the document stored under `id`, if any.
    fn read(
        &self,
        id: RequestId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, CollectionError>> + Send + '_>>;

    /// Persist a new request. The document form is derived by the store.
    fn create(
        &self,
        request: LocalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CollectionError>> + Send + '_>>;

    /// Replace the document previously read as `old` with the updated request.
    fn update(
        &self,
        old: serde_json::Value,
        updated: LocalRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), CollectionError>> + Send + '_>>;
}

/// An attribute stored by the local account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAttribute {
    /// Unique id of the attribute.
    pub id: AttributeId,
    /// The identity the attribute belongs to.
    pub owner: CoreAddress,
    /// The attribute value.
    pub value: serde_json::Value,
    /// Peer this attribute is shared with, for shared copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_with: Option<CoreAddress>,
    /// When the attribute was stored.
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur in the attribute store.
#[derive(Error, Debug, Clone)]
pub enum AttributeStoreError {
    /// No attribute exists for the given id.
    #[error("Attribute '{0}' not found")]
    NotFound(AttributeId),

    /// The underlying storage failed.
    #[error("Attribute storage error: {0}")]
    StorageError(String),
}

/// Attribute bookkeeping consumed by attribute-related item processors.
///
/// The core engine never calls this directly; it is part of the processor
/// context so concrete processors can persist what an accepted item implies.
pub trait AttributeStore: Send + Sync {
    /// Store a new attribute owned by the local identity.
    fn create_local_attribute(
        &self,
        value: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<LocalAttribute, AttributeStoreError>> + Send + '_>>;

    /// Store an attribute owned by `peer`, received from that peer.
    fn create_peer_local_attribute(
        &self,
        value: serde_json::Value,
        peer: CoreAddress,
    ) -> Pin<Box<dyn Future<Output = Result<LocalAttribute, AttributeStoreError>> + Send + '_>>;

    /// Record that the attribute `source` is now shared with `peer`.
    fn create_shared_local_attribute_copy(
        &self,
        source: AttributeId,
        peer: CoreAddress,
    ) -> Pin<Box<dyn Future<Output = Result<LocalAttribute, AttributeStoreError>> + Send + '_>>;

    /// Look up a stored attribute.
    fn get_local_attribute(
        &self,
        id: AttributeId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<LocalAttribute>, AttributeStoreError>> + Send + '_>>;
}

/// The bundled dependencies of the request controllers.
#[derive(Clone)]
pub struct RequestsEnvironment {
    /// Clock for timestamps.
    pub clock: Arc<dyn Clock>,
    /// Generator for new ids.
    pub ids: Arc<dyn IdGenerator>,
    /// Resolver for the local identity's address.
    pub identity: Arc<dyn IdentityResolver>,
    /// The persisted request collection.
    pub requests: Arc<dyn RequestCollection>,
    /// Fire-and-forget event publication.
    pub events: Arc<dyn EventPublisher>,
    /// Attribute bookkeeping for attribute-related processors.
    pub attributes: Arc<dyn AttributeStore>,
}

impl RequestsEnvironment {
    /// Bundle the given dependencies.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        identity: Arc<dyn IdentityResolver>,
        requests: Arc<dyn RequestCollection>,
        events: Arc<dyn EventPublisher>,
        attributes: Arc<dyn AttributeStore>,
    ) -> Self {
        Self {
            clock,
            ids,
            identity,
            requests,
            events,
            attributes,
        }
    }
}
