//! # Peer Requests Core
//!
//! Core types and environment traits for the peer-requests engine, the
//! consumption layer of a decentralized identity platform: structured exchange
//! requests (attribute sharing, relationship proposals) between two parties
//! communicating over an external messaging transport.
//!
//! This crate is deliberately free of business logic. It provides:
//!
//! - **Content model**: [`content::Request`] / [`content::Response`] with
//!   their item and one-level group structures
//! - **Aggregate**: [`local_request::LocalRequest`] with its monotonic status
//!   lifecycle and append-only status log
//! - **Validation**: the composable [`validation::ValidationResult`] tree
//! - **Events**: [`events::RequestEvent`] published on every transition
//! - **Environment**: dependency-injection traits for clock, id generation,
//!   identity resolution, the persisted request collection and the attribute
//!   store
//!
//! The state machines driving requests live in `peer-requests-engine`;
//! deterministic mocks of every environment trait live in
//! `peer-requests-testing`.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod content;
pub mod environment;
pub mod error;
pub mod events;
pub mod ids;
pub mod local_request;
pub mod validation;

pub use content::{
    ContentError, JsonMap, Request, RequestItem, RequestItemGroup, RequestItemOrGroup, Response,
    ResponseItem, ResponseItemGroup, ResponseItemOrGroup, ResponseItemResult, ResponseResult,
};
pub use environment::{
    AttributeStore, AttributeStoreError, Clock, CollectionError, IdGenerator, IdentityResolver,
    LocalAttribute, RequestCollection, RequestsEnvironment,
};
pub use error::RequestError;
pub use events::{EventPublisher, RequestEvent};
pub use ids::{AttributeId, CoreAddress, RequestId};
pub use local_request::{
    DocumentError, LocalRequest, LocalRequestStatus, LocalResponse, RequestSource,
    RequestSourceKind, RequestSourceObject, ResponseSource, StatusLogEntry,
};
pub use validation::{ValidationError, ValidationResult};
