//! Controller driving peer-initiated requests from receipt to completion.
//!
//! Lifecycle of an incoming request:
//!
//! ```text
//! received ──► Open ──► DecisionRequired ──► ManualDecisionRequired
//!                │              │                      │
//!                │              └───────┬──────────────┘
//!     (prerequisites not met:           ▼
//!      stays Open, no error)      accept / reject ──► Decided ──► Completed
//! ```
//!
//! Every operation loads the request, checks its status precondition, mutates
//! the aggregate in memory and persists it exactly once on full success, so a
//! failing processor never leaves a partially updated record behind.
//!
//! Concurrent decisions on the *same* request from different call sites are
//! not serialized here; callers must avoid them.

use std::sync::Arc;

use peer_requests_core::content::{
    Request, RequestItemOrGroup, Response, ResponseItem, ResponseItemGroup, ResponseItemOrGroup,
    ResponseResult,
};
use peer_requests_core::environment::RequestsEnvironment;
use peer_requests_core::error::RequestError;
use peer_requests_core::events::RequestEvent;
use peer_requests_core::ids::RequestId;
use peer_requests_core::local_request::{
    LocalRequest, LocalRequestStatus, LocalResponse, RequestSourceObject, ResponseSource,
};
use peer_requests_core::validation::ValidationResult;

use crate::params::{
    DecideItemOrGroup, DecideRequestItemParameters, DecideRequestParameters, RequestDecision,
    validate_decide_parameters,
};
use crate::processor::ProcessorContext;
use crate::registry::RequestItemProcessorRegistry;

/// State machine for requests initiated by a peer.
pub struct IncomingRequestsController {
    environment: RequestsEnvironment,
    registry: Arc<RequestItemProcessorRegistry>,
}

impl IncomingRequestsController {
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

    /// Record a request received from a peer and persist it in `Open`.
    ///
    /// The request id is taken from the content when present, otherwise
    /// generated. The peer is the author of the carrying source object.
    ///
    /// # Errors
    ///
    /// Fails with [`RequestError::CannotCreateFromOwnSource`] when the source
    /// object was authored by the local identity, and with
    /// [`RequestError::InvalidContent`] when the content violates its
    /// structural invariants.
    pub async fn received(
        &self,
        content: Request,
        source: RequestSourceObject,
    ) -> Result<LocalRequest, RequestError> {
        content.validate()?;

        if source.created_by == self.environment.identity.own_address() {
            return Err(RequestError::CannotCreateFromOwnSource(source.source_type));
        }

        let id = match &content.id {
            Some(id) => id.clone(),
            None => self.environment.ids.generate_request_id(),
        };
        let request = LocalRequest::new(
            id.clone(),
            false,
            source.created_by.clone(),
            self.environment.clock.now(),
            content,
            LocalRequestStatus::Open,
            Some(source.to_source()),
        );

        self.environment.requests.create(request.clone()).await?;
        tracing::info!(request_id = %id, peer = %request.peer, "incoming request received");
        self.environment
            .events
            .publish(RequestEvent::IncomingRequestReceived {
                request_id: id,
                peer: request.peer.clone(),
            });

        Ok(request)
    }

    /// Evaluate the prerequisite gates of every item.
    ///
    /// Requires status `Open`. When every item (and every item of every
    /// group) reports its prerequisites as met, the request advances to
    /// `DecisionRequired`. Otherwise it stays in `Open`, which is a valid
    /// outcome and not an error: the request is simply not actionable yet.
    ///
    /// # Errors
    ///
    /// Fails when the request is unknown, not in `Open`, or a processor
    /// fails while evaluating a gate.
    pub async fn check_prerequisites(
        &self,
        request_id: RequestId,
    ) -> Result<LocalRequest, RequestError> {
        let (mut request, old_doc) = self.load(&request_id).await?;
        Self::ensure_status(&request, LocalRequestStatus::Open)?;

        if !self.prerequisites_met(&request).await? {
            tracing::debug!(request_id = %request_id, "prerequisites not met, request stays Open");
            return Ok(request);
        }

        self.transition(&mut request, LocalRequestStatus::DecisionRequired);
        self.environment.requests.update(old_doc, request.clone()).await?;
        Ok(request)
    }

    /// Flag the request as needing a manual decision by the user.
    ///
    /// Requires status `DecisionRequired` and advances to
    /// `ManualDecisionRequired`.
    ///
    /// # Errors
    ///
    /// Fails when the request is unknown or not in `DecisionRequired`.
    pub async fn require_manual_decision(
        &self,
        request_id: RequestId,
    ) -> Result<LocalRequest, RequestError> {
        let (mut request, old_doc) = self.load(&request_id).await?;
        Self::ensure_status(&request, LocalRequestStatus::DecisionRequired)?;

        self.transition(&mut request, LocalRequestStatus::ManualDecisionRequired);
        self.environment.requests.update(old_doc, request.clone()).await?;
        Ok(request)
    }

    /// Validate accept parameters without mutating any state.
    ///
    /// # Errors
    ///
    /// Fails when the request is unknown, not decidable, or a processor
    /// fails; business rejections are reported through the returned
    /// [`ValidationResult`], never as an error.
    pub async fn can_accept(
        &self,
        params: &DecideRequestParameters,
    ) -> Result<ValidationResult, RequestError> {
        let (request, _) = self.load(&params.request_id).await?;
        Self::ensure_decidable(&request)?;
        self.validate_decision(&request, params, RequestDecision::Accept)
            .await
    }

    /// Validate reject parameters without mutating any state.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`can_accept`](Self::can_accept).
    pub async fn can_reject(
        &self,
        params: &DecideRequestParameters,
    ) -> Result<ValidationResult, RequestError> {
        let (request, _) = self.load(&params.request_id).await?;
        Self::ensure_decidable(&request)?;
        self.validate_decision(&request, params, RequestDecision::Reject)
            .await
    }

    /// Accept the request, building its response and advancing to `Decided`.
    ///
    /// # Errors
    ///
    /// Fails with [`RequestError::CannotAcceptWithParameters`] when the
    /// parameters do not validate; call [`can_accept`](Self::can_accept) to
    /// find out why.
    pub async fn accept(
        &self,
        params: &DecideRequestParameters,
    ) -> Result<LocalRequest, RequestError> {
        self.decide(params, RequestDecision::Accept).await
    }

    /// Reject the request, building its response and advancing to `Decided`.
    ///
    /// # Errors
    ///
    /// Fails with [`RequestError::CannotRejectWithParameters`] when the
    /// parameters do not validate; call [`can_reject`](Self::can_reject) to
    /// find out why.
    pub async fn reject(
        &self,
        params: &DecideRequestParameters,
    ) -> Result<LocalRequest, RequestError> {
        self.decide(params, RequestDecision::Reject).await
    }

    /// Record that the response left through the transport and advance to
    /// `Completed`.
    ///
    /// Requires status `Decided`.
    ///
    /// # Errors
    ///
    /// Fails when the request is unknown or not in `Decided`.
    pub async fn complete(
        &self,
        request_id: RequestId,
        response_source: Option<ResponseSource>,
    ) -> Result<LocalRequest, RequestError> {
        let (mut request, old_doc) = self.load(&request_id).await?;
        Self::ensure_status(&request, LocalRequestStatus::Decided)?;

        if let Some(response) = &mut request.response {
            response.source = response_source;
        }
        self.transition(&mut request, LocalRequestStatus::Completed);
        self.environment.requests.update(old_doc, request.clone()).await?;
        Ok(request)
    }

    /// Look up an incoming request.
    ///
    /// Returns `None` for unknown ids *and* for ids that belong to outgoing
    /// requests; the two collections are isolated by ownership.
    ///
    /// # Errors
    ///
    /// Fails only when the store or the stored document is broken.
    pub async fn get_incoming_request(
        &self,
        request_id: RequestId,
    ) -> Result<Option<LocalRequest>, RequestError> {
        let Some(document) = self.environment.requests.read(request_id).await? else {
            return Ok(None);
        };
        let request = LocalRequest::from_document(document)?;
        Ok((!request.is_own).then_some(request))
    }

    /// Whether every item of the request reports its prerequisites as met.
    async fn prerequisites_met(&self, request: &LocalRequest) -> Result<bool, RequestError> {
        let context = self.context_for(request);
        for entry in &request.content.items {
            match entry {
                RequestItemOrGroup::Item(item) => {
                    let processor = self.registry.get_processor_for_item(item, context.clone());
                    if !processor
                        .check_prerequisites_of_incoming_request_item(item)
                        .await?
                    {
                        return Ok(false);
                    }
                }
                RequestItemOrGroup::Group(group) => {
                    for item in &group.items {
                        let processor =
                            self.registry.get_processor_for_item(item, context.clone());
                        if !processor
                            .check_prerequisites_of_incoming_request_item(item)
                            .await?
                        {
                            return Ok(false);
                        }
                    }
                }
            }
        }
        Ok(true)
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
        if request.is_own {
            // Outgoing requests are invisible to this controller.
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

    fn ensure_decidable(request: &LocalRequest) -> Result<(), RequestError> {
        match request.status() {
            LocalRequestStatus::DecisionRequired | LocalRequestStatus::ManualDecisionRequired => {
                Ok(())
            }
            actual => Err(RequestError::InvalidStatus {
                required: LocalRequestStatus::DecisionRequired,
                actual,
            }),
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
            "incoming request status changed"
        );
        self.environment
            .events
            .publish(RequestEvent::RequestStatusChanged {
                request_id: request.id.clone(),
                is_own: false,
                old_status,
                new_status,
            });
    }

    async fn validate_decision(
        &self,
        request: &LocalRequest,
        params: &DecideRequestParameters,
        decision: RequestDecision,
    ) -> Result<ValidationResult, RequestError> {
        let structural = validate_decide_parameters(&request.content, params, decision);
        if structural.is_error() {
            tracing::warn!(request_id = %request.id, "decide parameters do not match request shape");
            return Ok(structural);
        }

        let context = self.context_for(request);
        let mut results = Vec::with_capacity(request.content.items.len());
        for (entry, decide) in request.content.items.iter().zip(&params.items) {
            results.push(match (entry, decide) {
                (RequestItemOrGroup::Item(item), DecideItemOrGroup::Item(leaf)) => {
                    self.validate_leaf(item, leaf, context.clone()).await?
                }
                (RequestItemOrGroup::Group(group), DecideItemOrGroup::Group(decide_group)) => {
                    let mut inner = Vec::with_capacity(group.items.len());
                    for (item, leaf) in group.items.iter().zip(&decide_group.items) {
                        inner.push(self.validate_leaf(item, leaf, context.clone()).await?);
                    }
                    ValidationResult::from_items(inner)
                }
                // Kind mismatches were caught by the structural validation.
                _ => ValidationResult::success(),
            });
        }
        Ok(ValidationResult::from_items(results))
    }

    async fn validate_leaf(
        &self,
        item: &peer_requests_core::content::RequestItem,
        leaf: &DecideRequestItemParameters,
        context: ProcessorContext,
    ) -> Result<ValidationResult, RequestError> {
        let processor = self.registry.get_processor_for_item(item, context);
        match leaf.decision {
            RequestDecision::Accept => processor.can_accept(item, leaf).await,
            RequestDecision::Reject => processor.can_reject(item, leaf).await,
        }
    }

    async fn decide(
        &self,
        params: &DecideRequestParameters,
        decision: RequestDecision,
    ) -> Result<LocalRequest, RequestError> {
        let (mut request, old_doc) = self.load(&params.request_id).await?;
        Self::ensure_decidable(&request)?;

        let validation = self.validate_decision(&request, params, decision).await?;
        if validation.is_error() {
            return Err(match decision {
                RequestDecision::Accept => RequestError::CannotAcceptWithParameters,
                RequestDecision::Reject => RequestError::CannotRejectWithParameters,
            });
        }

        let items = self.build_response_items(&request, params).await?;
        let response = Response {
            result: match decision {
                RequestDecision::Accept => ResponseResult::Accepted,
                RequestDecision::Reject => ResponseResult::Rejected,
            },
            request_id: request.id.clone(),
            items,
        };
        request.response = Some(LocalResponse {
            created_at: self.environment.clock.now(),
            content: response,
            source: None,
        });

        self.transition(&mut request, LocalRequestStatus::Decided);
        self.environment.requests.update(old_doc, request.clone()).await?;
        Ok(request)
    }

    async fn build_response_items(
        &self,
        request: &LocalRequest,
        params: &DecideRequestParameters,
    ) -> Result<Vec<ResponseItemOrGroup>, RequestError> {
        let context = self.context_for(request);
        let mut items = Vec::with_capacity(request.content.items.len());
        for (entry, decide) in request.content.items.iter().zip(&params.items) {
            items.push(match (entry, decide) {
                (RequestItemOrGroup::Item(item), DecideItemOrGroup::Item(leaf)) => {
                    ResponseItemOrGroup::Item(
                        self.complete_leaf(item, leaf, context.clone()).await?,
                    )
                }
                (RequestItemOrGroup::Group(group), DecideItemOrGroup::Group(decide_group)) => {
                    let mut inner = Vec::with_capacity(group.items.len());
                    for (item, leaf) in group.items.iter().zip(&decide_group.items) {
                        inner.push(self.complete_leaf(item, leaf, context.clone()).await?);
                    }
                    ResponseItemOrGroup::Group(ResponseItemGroup {
                        metadata: group.response_metadata.clone(),
                        items: inner,
                    })
                }
                // Unreachable: the shapes were validated before this walk.
                _ => continue,
            });
        }
        Ok(items)
    }

    async fn complete_leaf(
        &self,
        item: &peer_requests_core::content::RequestItem,
        leaf: &DecideRequestItemParameters,
        context: ProcessorContext,
    ) -> Result<ResponseItem, RequestError> {
        let processor = self.registry.get_processor_for_item(item, context);
        processor
            .complete(item, leaf)
            .await
            .map_err(|e| RequestError::ProcessorFailed {
                item_type: item.item_type.clone(),
                details: e.to_string(),
            })
    }
}
