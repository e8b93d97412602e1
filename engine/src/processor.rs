//! The pluggable per-item-type business rules.
//!
//! A [`RequestItemProcessor`] implements the rules for one concrete request
//! item type: whether it can be sent, whether its prerequisites hold on
//! receipt, how it is accepted or rejected, and what side effects an incoming
//! response item triggers. The controllers never interpret an item payload
//! themselves; they resolve a processor through the
//! [`registry`](crate::registry) and delegate.
//!
//! Every method has a default implementation with baseline semantics (accept
//! everything, no side effects), so a processor only overrides what its item
//! type actually constrains. [`GenericRequestItemProcessor`] is exactly these
//! defaults and is used for item types without an explicit registration.
//!
//! # Failure semantics
//!
//! Business rejections travel through [`ValidationResult`] returned from the
//! `can_*` methods; those must not additionally fail. An `Err` from any
//! method means infrastructure trouble (store unavailable, corrupt payload)
//! and aborts the whole controller operation.
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] instead of using `async fn` so processors can
//! be handed around as `Box<dyn RequestItemProcessor>` by the registry.

use futures::future::BoxFuture;
use peer_requests_core::content::{Request, RequestItem, ResponseItem, ResponseItemResult};
use peer_requests_core::environment::RequestsEnvironment;
use peer_requests_core::error::RequestError;
use peer_requests_core::ids::{CoreAddress, RequestId};
use peer_requests_core::validation::ValidationResult;

use crate::params::{DecideRequestItemParameters, RequestDecision};

/// Per-request context handed to every processor instance.
///
/// Carries the shared environment plus the request the processor is working
/// on, so processors can reach the attribute store, the clock and the peer
/// without the controllers threading those through every call.
#[derive(Clone)]
pub struct ProcessorContext {
    /// The shared controller environment.
    pub environment: RequestsEnvironment,
    /// The counterparty of the request being processed.
    pub peer: CoreAddress,
    /// Id of the request being processed.
    pub request_id: RequestId,
}

impl ProcessorContext {
    /// Build a context for one request.
    #[must_use]
    pub const fn new(
        environment: RequestsEnvironment,
        peer: CoreAddress,
        request_id: RequestId,
    ) -> Self {
        Self {
            environment,
            peer,
            request_id,
        }
    }
}

/// Build the generic response item for an accepted request item.
#[must_use]
pub(crate) fn generic_accept_item(item: &RequestItem) -> ResponseItem {
    ResponseItem {
        result: ResponseItemResult::Accepted,
        metadata: item.response_metadata.clone(),
        content: None,
    }
}

/// Build the generic response item for a rejected request item.
#[must_use]
pub(crate) fn generic_reject_item(item: &RequestItem) -> ResponseItem {
    ResponseItem {
        result: ResponseItemResult::Rejected,
        metadata: item.response_metadata.clone(),
        content: None,
    }
}

/// Strategy implementing the business rules for one request item type.
pub trait RequestItemProcessor: Send + Sync {
    /// Gate evaluated right after receipt, before the user is asked to decide.
    ///
    /// Returning `Ok(false)` is not an error; it means the request is not yet
    /// actionable and stays in `Open`.
    fn check_prerequisites_of_incoming_request_item<'a>(
        &'a self,
        _item: &'a RequestItem,
    ) -> BoxFuture<'a, Result<bool, RequestError>> {
        Box::pin(async { Ok(true) })
    }

    /// Validate that an item is legal to send to `recipient`.
    fn can_create_outgoing_request_item<'a>(
        &'a self,
        _item: &'a RequestItem,
        _request: &'a Request,
        _recipient: &'a CoreAddress,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        Box::pin(async { Ok(ValidationResult::success()) })
    }

    /// Validate that the item can be accepted with the given parameters.
    fn can_accept<'a>(
        &'a self,
        _item: &'a RequestItem,
        _params: &'a DecideRequestItemParameters,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        Box::pin(async { Ok(ValidationResult::success()) })
    }

    /// Validate that the item can be rejected with the given parameters.
    fn can_reject<'a>(
        &'a self,
        _item: &'a RequestItem,
        _params: &'a DecideRequestItemParameters,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        Box::pin(async { Ok(ValidationResult::success()) })
    }

    /// Produce the response item for an accepted request item.
    ///
    /// Fails when [`can_accept`](Self::can_accept) would have reported an
    /// error; implementations overriding this must keep that ordering.
    fn accept<'a>(
        &'a self,
        item: &'a RequestItem,
        params: &'a DecideRequestItemParameters,
    ) -> BoxFuture<'a, Result<ResponseItem, RequestError>> {
        Box::pin(async move {
            let validation = self.can_accept(item, params).await?;
            if let Some(error) = validation.error_detail() {
                return Err(RequestError::ValidationFailed {
                    message: error.message.clone(),
                });
            }
            Ok(generic_accept_item(item))
        })
    }

    /// Produce the response item for a rejected request item.
    ///
    /// Fails when [`can_reject`](Self::can_reject) would have reported an
    /// error; implementations overriding this must keep that ordering.
    fn reject<'a>(
        &'a self,
        item: &'a RequestItem,
        params: &'a DecideRequestItemParameters,
    ) -> BoxFuture<'a, Result<ResponseItem, RequestError>> {
        Box::pin(async move {
            let validation = self.can_reject(item, params).await?;
            if let Some(error) = validation.error_detail() {
                return Err(RequestError::ValidationFailed {
                    message: error.message.clone(),
                });
            }
            Ok(generic_reject_item(item))
        })
    }

    /// Validate a received peer response item before applying side effects.
    fn can_apply_incoming_response_item<'a>(
        &'a self,
        _response_item: &'a ResponseItem,
        _item: &'a RequestItem,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        Box::pin(async { Ok(ValidationResult::success()) })
    }

    /// Perform the side effect of a confirmed response item.
    fn apply_incoming_response_item<'a>(
        &'a self,
        _response_item: &'a ResponseItem,
        _item: &'a RequestItem,
    ) -> BoxFuture<'a, Result<(), RequestError>> {
        Box::pin(async { Ok(()) })
    }

    /// Dispatch to [`accept`](Self::accept) or [`reject`](Self::reject) by
    /// the parameters' decision tag.
    fn complete<'a>(
        &'a self,
        item: &'a RequestItem,
        params: &'a DecideRequestItemParameters,
    ) -> BoxFuture<'a, Result<ResponseItem, RequestError>> {
        Box::pin(async move {
            match params.decision {
                RequestDecision::Accept => self.accept(item, params).await,
                RequestDecision::Reject => self.reject(item, params).await,
            }
        })
    }
}

/// The baseline processor used for item types without an explicit
/// registration: prerequisites hold, every decision validates, accept and
/// reject produce the generic response items.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericRequestItemProcessor;

impl RequestItemProcessor for GenericRequestItemProcessor {}
