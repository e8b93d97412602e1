//! The locally persisted lifecycle record of a request.
//!
//! A [`LocalRequest`] is the aggregate root tracking one request from creation
//! (or receipt) to completion. Its [`status`](LocalRequest::status) only ever
//! moves forward through [`LocalRequestStatus`], and every transition is
//! recorded in an append-only status log. The log is deliberately not exposed
//! for mutation; [`LocalRequest::change_status`] is the single entry point, so
//! the log is complete by construction.
//!
//! # Document form
//!
//! The persistence layer stores requests as JSON documents. `to_document` and
//! `from_document` convert losslessly in both directions, including the status
//! log and nested response content.

use crate::content::{Request, Response};
use crate::ids::{CoreAddress, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a [`LocalRequest`].
///
/// The declaration order is the lifecycle order; the derived `Ord` makes
/// "status ≥ Decided" checks read naturally. Outgoing requests start at
/// `Draft`, incoming requests at `Open`. `ManualDecisionRequired` is only
/// visited when the host application asks for it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LocalRequestStatus {
    /// Created locally, not yet transmitted.
    Draft,
    /// Transmitted (outgoing) or received (incoming), awaiting prerequisites.
    Open,
    /// Prerequisites hold; the request can be decided.
    DecisionRequired,
    /// A manual decision by the user was explicitly requested.
    ManualDecisionRequired,
    /// Accepted or rejected; a response is attached.
    Decided,
    /// The response was transmitted (incoming) or applied (outgoing).
    Completed,
}

impl fmt::Display for LocalRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "Draft",
            Self::Open => "Open",
            Self::DecisionRequired => "DecisionRequired",
            Self::ManualDecisionRequired => "ManualDecisionRequired",
            Self::Decided => "Decided",
            Self::Completed => "Completed",
        };
        write!(f, "{name}")
    }
}

/// The kind of transport artifact that carried a request or response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestSourceKind {
    /// A message sent over an existing relationship.
    Message,
    /// A relationship template offered to (or scanned by) a peer.
    RelationshipTemplate,
}

impl fmt::Display for RequestSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "Message"),
            Self::RelationshipTemplate => write!(f, "Relationship Template"),
        }
    }
}

/// Reference to the transport artifact that carried the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSource {
    /// Kind of the artifact.
    pub source_type: RequestSourceKind,
    /// Transport-level id of the artifact.
    pub reference: String,
}

/// Reference to the transport artifact that carried the response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSource {
    /// Kind of the artifact.
    pub source_type: RequestSourceKind,
    /// Transport-level id of the artifact.
    pub reference: String,
}

/// A transport artifact as handed to the controllers, including its author.
///
/// The author is what allows the ownership checks: an incoming request must
/// not originate from an artifact the local identity authored itself, and an
/// outgoing request must not be marked as sent via a peer-authored artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSourceObject {
    /// Kind of the artifact.
    pub source_type: RequestSourceKind,
    /// Transport-level id of the artifact.
    pub reference: String,
    /// The identity that authored the artifact.
    pub created_by: CoreAddress,
}

impl RequestSourceObject {
    /// The persisted source reference, without the author.
    #[must_use]
    pub fn to_source(&self) -> RequestSource {
        RequestSource {
            source_type: self.source_type,
            reference: self.reference.clone(),
        }
    }
}

/// One entry of the append-only status log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLogEntry {
    /// When the transition happened.
    pub created_at: DateTime<Utc>,
    /// Status before the transition.
    pub old_status: LocalRequestStatus,
    /// Status after the transition.
    pub new_status: LocalRequestStatus,
}

/// The locally stored response of a decided request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalResponse {
    /// When the response was produced (incoming) or received (outgoing).
    pub created_at: DateTime<Utc>,
    /// The response content, structurally mirroring the request.
    pub content: Response,
    /// Transport artifact that carried the response, set at completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
}

/// Errors converting a [`LocalRequest`] to or from its document form.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The request could not be serialized.
    #[error("Failed to serialize LocalRequest: {0}")]
    Serialization(String),

    /// The document could not be deserialized into a request.
    #[error("Failed to deserialize LocalRequest: {0}")]
    Deserialization(String),
}

/// Aggregate root for one request's full local state.
///
/// Public state is readable directly; `status` and the status log are private
/// and only change through [`change_status`](Self::change_status).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRequest {
    /// Unique, immutable id of this request.
    pub id: RequestId,
    /// True when this request was created locally (outgoing).
    pub is_own: bool,
    /// Address of the counterparty.
    pub peer: CoreAddress,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// The request content.
    pub content: Request,
    /// Transport artifact the request travelled through, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<RequestSource>,
    /// The attached response, once decided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<LocalResponse>,
    status: LocalRequestStatus,
    status_log: SmallVec<[StatusLogEntry; 4]>,
}

impl LocalRequest {
    /// Create a new aggregate in the given initial status with an empty log.
    #[must_use]
    pub fn new(
        id: RequestId,
        is_own: bool,
        peer: CoreAddress,
        created_at: DateTime<Utc>,
        content: Request,
        status: LocalRequestStatus,
        source: Option<RequestSource>,
    ) -> Self {
        Self {
            id,
            is_own,
            peer,
            created_at,
            content,
            source,
            response: None,
            status,
            status_log: SmallVec::new(),
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> LocalRequestStatus {
        self.status
    }

    /// The append-only status log, oldest entry first.
    #[must_use]
    pub fn status_log(&self) -> &[StatusLogEntry] {
        &self.status_log
    }

    /// Transition to `new_status`, recording the transition in the log.
    ///
    /// This is the only way the status changes; controllers enforce which
    /// transitions are legal before calling it.
    pub fn change_status(&mut self, new_status: LocalRequestStatus, at: DateTime<Utc>) {
        self.status_log.push(StatusLogEntry {
            created_at: at,
            old_status: self.status,
            new_status,
        });
        self.status = new_status;
    }

    /// Convert this request into its persisted document form.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Serialization`] when serialization fails,
    /// which only happens for non-finite floats inside item payloads.
    pub fn to_document(&self) -> Result<serde_json::Value, DocumentError> {
        serde_json::to_value(self).map_err(|e| DocumentError::Serialization(e.to_string()))
    }

    /// Rebuild a request from its persisted document form.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Deserialization`] when the document does not
    /// have the shape of a serialized [`LocalRequest`].
    pub fn from_document(document: serde_json::Value) -> Result<Self, DocumentError> {
        serde_json::from_value(document).map_err(|e| DocumentError::Deserialization(e.to_string()))
    }
}
