//! Controller driving self-initiated requests from creation to completion.
//!
//! Lifecycle of an outgoing request:
//!
//! ```text
//! create ──► Draft ──sent──► Open ──complete──► Completed
//! ```
//!
//! `create` validates every item against its processor before anything is
//! persisted. `complete` pairs the received response positionally with the
//! request content and lets each item's processor first validate, then apply
//! the response's side effects; the request document itself is only written
//! after every item succeeded.

use std::sync::Arc;

use peer_requests_core::content::{
    Response, ResponseItem, ResponseItemOrGroup, RequestItem, RequestItemOrGroup,
};
use peer_requests_core::environment::RequestsEnvironment;
use peer_requests_core::error::RequestError;
use peer_requests_core::events::RequestEvent;
use peer_requests_core::ids::RequestId;
use peer_requests_core::local_request::{
    LocalRequest, LocalRequestStatus, LocalResponse, RequestSourceObject, ResponseSource,
};
use peer_requests_core::validation::{ValidationResult, codes};

use crate::params::CreateOutgoingRequestParameters;
use crate::processor::ProcessorContext;
use crate::registry::RequestItemProcessorRegistry;

/// State machine for requests initiated by the local identity.
pub struct OutgoingRequestsController {
    environment: RequestsEnvironment,
    registry: Arc<RequestItemProcessorRegistry>,
}

impl OutgoingRequestsController {
    /// Create a controller over the given environment and processor registry.
    #[must_use]
    pub const fn new(
        environment: RequestsEnvironment,
        registry: Arc<RequestItemProcessorRegistry>,
    ) -> Self {
        Self {
            environment,
            registry,
        }
    }

    /// Validate that the request could be created, without persisting.
    ///
    /// Aggregates `can_create_outgoing_request_item` over every item,
    /// recursing one level into groups.
    ///
    /// # Errors
    ///
    /// Fails when the content violates its structural invariants or a
    /// processor fails; business rejections are reported through the
    /// returned [`ValidationResult`].
    pub async fn can_create(
        &self,
        params: &CreateOutgoingRequestParameters,
    ) -> Result<ValidationResult, RequestError> {
        params.content.validate()?;

        // No id is assigned until the request is actually created.
        let context = ProcessorContext::new(
            self.environment.clone(),
            params.peer.clone(),
            params
                .content
                .id
                .clone()
                .unwrap_or_else(|| RequestId::new("")),
        );
        let mut results = Vec::with_capacity(params.content.items.len());
        for entry in &params.content.items {
            results.push(match entry {
                RequestItemOrGroup::Item(item) => {
                    self.validate_create_item(item, params, context.clone()).await?
                }
                RequestItemOrGroup::Group(group) => {
                    let mut inner = Vec::with_capacity(group.items.len());
                    for item in &group.items {
                        inner.push(
                            self.validate_create_item(item, params, context.clone())
                                .await?,
                        );
                    }
                    ValidationResult::from_items(inner)
                }
            });
        }
        Ok(ValidationResult::from_items(results))
    }

    /// Create an outgoing request and persist it in `Draft`.
    ///
    /// # Errors
    ///
    /// Fails with [`RequestError::ValidationFailed`] carrying the validation
    /// error's message when [`can_create`](Self::can_create) reports an
    /// error.
    pub async fn create(
        &self,
        params: &CreateOutgoingRequestParameters,
    ) -> Result<LocalRequest, RequestError> {
        let validation = self.can_create(params).await?;
        if let Some(error) = validation.error_detail() {
            tracing::warn!(peer = %params.peer, "outgoing request failed creation validation");
            return Err(RequestError::ValidationFailed {
                message: error.message.clone(),
            });
        }

        let id = self.environment.ids.generate_request_id();
        let mut content = params.content.clone();
        content.id = Some(id.clone());

        let request = LocalRequest::new(
            id.clone(),
            true,
            params.peer.clone(),
            self.environment.clock.now(),
            content,
            LocalRequestStatus::Draft,
            None,
        );
        self.environment.requests.create(request.clone()).await?;
        tracing::info!(request_id = %id, peer = %request.peer, "outgoing request created");
        self.environment
            .events
            .publish(RequestEvent::OutgoingRequestCreated {
                request_id: id,
                peer: request.peer.clone(),
            });
        Ok(request)
    }

    /// Record that the request left through the transport.
    ///
    /// Requires status `Draft` and advances to `Open`.
    ///
    /// # Errors
    ///
    /// Fails with [`RequestError::CannotCreateFromPeerSource`] when the
    /// source object was authored by a peer, and with
    /// [`RequestError::InvalidStatus`] when the request is not in `Draft`.
    pub async fn sent(
        &self,
        request_id: RequestId,
        source: RequestSourceObject,
    ) -> Result<LocalRequest, RequestError> {
        let (mut request, old_doc) = self.load(&request_id).await?;
        Self::ensure_status(&request, LocalRequestStatus::Draft)?;

        if source.created_by != self.environment.identity.own_address() {
            return Err(RequestError::CannotCreateFromPeerSource(source.source_type));
        }

        request.source = Some(source.to_source());
        self.transition(&mut request, LocalRequestStatus::Open);
        self.environment.requests.update(old_doc, request.clone()).await?;
        Ok(request)
    }

    /// Apply the peer's response and advance to `Completed`.
    ///
    /// Requires status `Open`. Every request item is paired positionally
    /// with its response item (recursing into groups); each pair is first
    /// validated via `can_apply_incoming_response_item`, and only when all
    /// pairs validate are the side effects applied and the response
    /// attached.
    ///
    /// # Errors
    ///
    /// Fails with [`RequestError::ValidationFailed`] carrying the failing
    /// item's message when a pair does not validate, and with
    /// [`RequestError::ProcessorFailed`] when applying a side effect fails.
    pub async fn complete(
        &self,
        request_id: RequestId,
        response_source: Option<ResponseSource>,
        received_response: Response,
    ) -> Result<LocalRequest, RequestError> {
        let (mut request, old_doc) = self.load(&request_id).await?;
        Self::ensure_status(&request, LocalRequestStatus::Open)?;

        let pairs = Self::pair_items(&request, &received_response)?;
        let context = self.context_for(&request);

        for (item, response_item) in &pairs {
            let processor = self.registry.get_processor_for_item(item, context.clone());
            let validation = processor
                .can_apply_incoming_response_item(response_item, item)
                .await?;
            if let Some(error) = validation.error_detail() {
                tracing::warn!(request_id = %request.id, item_type = %item.item_type, "response item failed validation");
                return Err(RequestError::ValidationFailed {
                    message: error.message.clone(),
                });
            }
        }

        for (item, response_item) in &pairs {
            let processor = self.registry.get_processor_for_item(item, context.clone());
            processor
                .apply_incoming_response_item(response_item, item)
                .await
                .map_err(|e| RequestError::ProcessorFailed {
                    item_type: item.item_type.clone(),
                    details: e.to_string(),
                })?;
        }

        request.response = Some(LocalResponse {
            created_at: self.environment.clock.now(),
            content: received_response,
            source: response_source,
        });
        self.transition(&mut request, LocalRequestStatus::Completed);
        self.environment.requests.update(old_doc, request.clone()).await?;
        Ok(request)
    }

    /// Look up an outgoing request.
    ///
    /// Returns `None` for unknown ids *and* for ids that belong to incoming
    /// requests; the two collections are isolated by ownership.
    ///
    /// # Errors
    ///
    /// Fails only when the store or the stored document is broken.
    pub async fn get_outgoing_request(
        &self,
        request_id: RequestId,
    ) -> Result<Option<LocalRequest>, RequestError> {
        let Some(document) = self.environment.requests.read(request_id).await? else {
            return Ok(None);
        };
        let request = LocalRequest::from_document(document)?;
        Ok(request.is_own.then_some(request))
    }

    async fn validate_create_item(
        &self,
        item: &RequestItem,
        params: &CreateOutgoingRequestParameters,
        context: ProcessorContext,
    ) -> Result<ValidationResult, RequestError> {
        let processor = self.registry.get_processor_for_item(item, context);
        processor
            .can_create_outgoing_request_item(item, &params.content, &params.peer)
            .await
    }

    /// Pair every request item with its response item, validating the
    /// structural mirror at both levels.
    fn pair_items<'a>(
        request: &'a LocalRequest,
        response: &'a Response,
    ) -> Result<Vec<(&'a RequestItem, &'a ResponseItem)>, RequestError> {
        let shape_error = || RequestError::ValidationFailed {
            message: format!(
                "{}: the response does not mirror the request content.",
                codes::INVALID_NUMBER_OF_ITEMS
            ),
        };

        if response.items.len() != request.content.items.len() {
            return Err(shape_error());
        }

        let mut pairs = Vec::new();
        for (entry, response_entry) in request.content.items.iter().zip(&response.items) {
            match (entry, response_entry) {
                (RequestItemOrGroup::Item(item), ResponseItemOrGroup::Item(response_item)) => {
                    pairs.push((item, response_item));
                }
                (RequestItemOrGroup::Group(group), ResponseItemOrGroup::Group(response_group)) => {
                    if response_group.items.len() != group.items.len() {
                        return Err(shape_error());
                    }
                    for pair in group.items.iter().zip(&response_group.items) {
                        pairs.push(pair);
                    }
                }
                _ => return Err(shape_error()),
            }
        }
        Ok(pairs)
    }

    async fn load(
        &self,
        request_id: &RequestId,
    ) -> Result<(LocalRequest, serde_json::Value), RequestError> {
        let document = self
            .environment
            .requests
            .read(request_id.clone())
            .await?
            .ok_or_else(|| RequestError::RecordNotFound(request_id.clone()))?;
        let request = LocalRequest::from_document(document.clone())?;
        if !request.is_own {
            // Incoming requests are invisible to this controller.
            return Err(RequestError::RecordNotFound(request_id.clone()));
        }
        Ok((request, document))
    }

    fn ensure_status(
        request: &LocalRequest,
        required: LocalRequestStatus,
    ) -> Result<(), RequestError> {
        if request.status() == required {
            Ok(())
        } else {
            Err(RequestError::InvalidStatus {
                required,
                actual: request.status(),
            })
        }
    }

    fn context_for(&self, request: &LocalRequest) -> ProcessorContext {
        ProcessorContext::new(
            self.environment.clone(),
            request.peer.clone(),
            request.id.clone(),
        )
    }

    fn transition(&self, request: &mut LocalRequest, new_status: LocalRequestStatus) {
        let old_status = request.status();
        request.change_status(new_status, self.environment.clock.now());
        tracing::info!(
            request_id = %request.id,
            %old_status,
            %new_status,
            "outgoing request status changed"
        );
        self.environment
            .events
            .publish(RequestEvent::RequestStatusChanged {
                request_id: request.id.clone(),
                is_own: true,
                old_status,
                new_status,
            });
    }
}
