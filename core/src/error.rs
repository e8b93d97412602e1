//! Error types for the request engine.
//!
//! All engine failures are represented by [`RequestError`]. Every variant maps
//! to a stable, machine-readable [`code`](RequestError::code) so callers can
//! branch on failure kind without parsing messages. Business-rule rejections
//! are *not* errors; they travel through
//! [`ValidationResult`](crate::validation::ValidationResult) instead.

use crate::content::ContentError;
use crate::environment::{AttributeStoreError, CollectionError};
use crate::ids::RequestId;
use crate::local_request::{DocumentError, LocalRequestStatus, RequestSourceKind};
use thiserror::Error;

/// Errors surfaced by the request controllers and processors.
#[derive(Error, Debug)]
pub enum RequestError {
    /// An operation was invoked while the request was in the wrong status.
    ///
    /// No partial mutation happens; the request is left untouched.
    #[error("Request has to be in status '{required}'.")]
    InvalidStatus {
        /// The status the operation requires.
        required: LocalRequestStatus,
        /// The status the request is actually in.
        actual: LocalRequestStatus,
    },

    /// No persisted request exists for the given id.
    #[error("Record '{0}' not found.")]
    RecordNotFound(RequestId),

    /// The request content violates a structural invariant.
    #[error(transparent)]
    InvalidContent(#[from] ContentError),

    /// An incoming request was built from a source object authored locally.
    #[error("Cannot create incoming Request from own {0}.")]
    CannotCreateFromOwnSource(RequestSourceKind),

    /// An outgoing request was marked as sent with a peer-authored source object.
    #[error("Cannot create outgoing Request from a peer {0}.")]
    CannotCreateFromPeerSource(RequestSourceKind),

    /// `accept` was called with parameters that fail `can_accept`.
    #[error("Cannot accept the Request with the given parameters. Call 'canAccept' to get more information.")]
    CannotAcceptWithParameters,

    /// `reject` was called with parameters that fail `can_reject`.
    #[error("Cannot reject the Request with the given parameters. Call 'canReject' to get more information.")]
    CannotRejectWithParameters,

    /// A validation aggregate failed where the operation demands success.
    ///
    /// Carries the message of the failing validation so the caller sees the
    /// original reason.
    #[error("{message}")]
    ValidationFailed {
        /// Message of the failing validation result.
        message: String,
    },

    /// A second processor was registered for an item type.
    #[error("There is already a processor registered for '{item_type}'.")]
    ProcessorAlreadyRegistered {
        /// The `@type` that already has a processor.
        item_type: String,
    },

    /// A processor failed while producing or applying a response item.
    #[error("An error occurred while processing a '{item_type}'. Details: {details}")]
    ProcessorFailed {
        /// The `@type` of the item whose processor failed.
        item_type: String,
        /// The underlying failure.
        details: String,
    },

    /// The persisted document store failed.
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// The attribute store failed.
    #[error(transparent)]
    AttributeStore(#[from] AttributeStoreError),

    /// A request could not be converted to or from its document form.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl RequestError {
    /// Stable error code for this failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidStatus { .. } => "error.requests.invalidStatus",
            Self::RecordNotFound(_) => "error.transport.recordNotFound",
            Self::InvalidContent(_) => "error.requests.invalidContent",
            Self::CannotCreateFromOwnSource(_) | Self::CannotCreateFromPeerSource(_) => {
                "error.requests.invalidSource"
            }
            Self::CannotAcceptWithParameters | Self::CannotRejectWithParameters => {
                "error.requests.invalidDecisionParameters"
            }
            Self::ValidationFailed { .. } => "error.requests.validationFailed",
            Self::ProcessorAlreadyRegistered { .. } => "error.requests.processorAlreadyRegistered",
            Self::ProcessorFailed { .. } => "error.requests.itemProcessingFailed",
            Self::Collection(_) => "error.transport.storage",
            Self::AttributeStore(_) => "error.requests.attributeStorage",
            Self::Document(_) => "error.requests.invalidDocument",
        }
    }
}
