//! End-to-end tests for the outgoing request lifecycle.

#![allow(clippy::unwrap_used)] // Test code can use unwrap
#![allow(clippy::panic)] // Test code can panic on wrong variants

use std::sync::Arc;

use futures::future::BoxFuture;
use peer_requests_core::content::{
    Request, RequestItem, RequestItemOrGroup, Response, ResponseItem, ResponseItemOrGroup,
    ResponseItemResult, ResponseResult,
};
use peer_requests_core::environment::AttributeStore;
use peer_requests_core::error::RequestError;
use peer_requests_core::events::RequestEvent;
use peer_requests_core::ids::{CoreAddress, RequestId};
use peer_requests_core::local_request::{
    LocalRequestStatus, RequestSourceKind, RequestSourceObject, ResponseSource,
};
use peer_requests_core::validation::{ValidationResult, codes};
use peer_requests_engine::{
    CreateOutgoingRequestParameters, OutgoingRequestsController, RequestItemProcessor,
    RequestItemProcessorRegistry, SHARE_ATTRIBUTE_ITEM_TYPE, ShareAttributeRequestItemProcessor,
};
use peer_requests_testing::TestEnvironment;

// ============================================================================
// Fixtures
// ============================================================================

const TEST_ITEM_TYPE: &str = "TestRequestItem";

/// Processor whose behavior is steered by flags in the item payload.
struct FlaggedProcessor;

impl RequestItemProcessor for FlaggedProcessor {
    fn can_create_outgoing_request_item<'a>(
        &'a self,
        item: &'a RequestItem,
        _request: &'a Request,
        _recipient: &'a CoreAddress,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        let fails = flag(item, "canCreateFail");
        Box::pin(async move {
            if fails {
                Ok(ValidationResult::error(
                    codes::INVALID_REQUEST_ITEM,
                    "The item cannot be sent.",
                ))
            } else {
                Ok(ValidationResult::success())
            }
        })
    }

    fn can_apply_incoming_response_item<'a>(
        &'a self,
        _response_item: &'a ResponseItem,
        item: &'a RequestItem,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        let fails = flag(item, "canApplyFail");
        Box::pin(async move {
            if fails {
                Ok(ValidationResult::error(
                    codes::INVALID_REQUEST_ITEM,
                    "The response item cannot be applied.",
                ))
            } else {
                Ok(ValidationResult::success())
            }
        })
    }
}

fn flag(item: &RequestItem, name: &str) -> bool {
    item.content
        .get(name)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

fn registry() -> Arc<RequestItemProcessorRegistry> {
    let mut registry = RequestItemProcessorRegistry::new();
    registry
        .register_processor_for_type(Box::new(|_ctx| Box::new(FlaggedProcessor)), TEST_ITEM_TYPE)
        .unwrap();
    registry
        .register_processor_for_type(
            Box::new(|ctx| Box::new(ShareAttributeRequestItemProcessor::new(ctx))),
            SHARE_ATTRIBUTE_ITEM_TYPE,
        )
        .unwrap();
    Arc::new(registry)
}

fn controller(env: &TestEnvironment) -> OutgoingRequestsController {
    OutgoingRequestsController::new(env.environment.clone(), registry())
}

fn test_item(content: serde_json::Value) -> RequestItem {
    RequestItem {
        item_type: TEST_ITEM_TYPE.to_string(),
        must_be_accepted: false,
        title: None,
        description: None,
        response_metadata: None,
        content,
    }
}

fn create_params(items: Vec<RequestItemOrGroup>) -> CreateOutgoingRequestParameters {
    CreateOutgoingRequestParameters {
        peer: CoreAddress::new("did:e:peer"),
        content: Request {
            id: None,
            title: None,
            description: None,
            expires_at: None,
            items,
        },
    }
}

fn own_source() -> RequestSourceObject {
    RequestSourceObject {
        source_type: RequestSourceKind::Message,
        reference: "MSG1".to_string(),
        created_by: CoreAddress::new("did:e:self"),
    }
}

fn accepted_response(request_id: RequestId, items: Vec<ResponseItemOrGroup>) -> Response {
    Response {
        result: ResponseResult::Accepted,
        request_id,
        items,
    }
}

fn accepted_item() -> ResponseItemOrGroup {
    ResponseItemOrGroup::Item(ResponseItem {
        result: ResponseItemResult::Accepted,
        metadata: None,
        content: None,
    })
}

/// Create a request and mark it as sent, leaving it in `Open`.
async fn created_and_sent(
    controller: &OutgoingRequestsController,
    items: Vec<RequestItemOrGroup>,
) -> RequestId {
    let request = controller.create(&create_params(items)).await.unwrap();
    controller
        .sent(request.id.clone(), own_source())
        .await
        .unwrap();
    request.id
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn create_persists_the_request_as_draft() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);

    let request = controller
        .create(&create_params(vec![RequestItemOrGroup::Item(test_item(
            serde_json::json!({}),
        ))]))
        .await
        .unwrap();

    assert_eq!(request.status(), LocalRequestStatus::Draft);
    assert!(request.is_own);
    assert_eq!(request.id, RequestId::new("REQ1"));
    assert_eq!(request.content.id, Some(RequestId::new("REQ1")));

    assert_eq!(
        env.events.events(),
        vec![RequestEvent::OutgoingRequestCreated {
            request_id: RequestId::new("REQ1"),
            peer: CoreAddress::new("did:e:peer"),
        }]
    );
}

#[tokio::test]
async fn create_fails_and_persists_nothing_when_an_item_does_not_validate() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);

    let error = controller
        .create(&create_params(vec![
            RequestItemOrGroup::Item(test_item(serde_json::json!({}))),
            RequestItemOrGroup::Item(test_item(serde_json::json!({ "canCreateFail": true }))),
        ]))
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "The item cannot be sent.");
    assert!(env.requests.is_empty().await);
    assert!(env.events.events().is_empty());
}

#[tokio::test]
async fn can_create_reports_failures_without_failing() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);

    let result = controller
        .can_create(&create_params(vec![RequestItemOrGroup::Item(test_item(
            serde_json::json!({ "canCreateFail": true }),
        ))]))
        .await
        .unwrap();

    assert!(result.is_error());
    assert_eq!(
        result.error_detail().unwrap().code,
        codes::INHERITED_FROM_ITEM
    );
    assert!(result.items()[0].is_error());
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn sent_moves_the_request_to_open_and_records_the_source() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);
    let request = controller
        .create(&create_params(vec![RequestItemOrGroup::Item(test_item(
            serde_json::json!({}),
        ))]))
        .await
        .unwrap();

    let sent = controller
        .sent(request.id.clone(), own_source())
        .await
        .unwrap();

    assert_eq!(sent.status(), LocalRequestStatus::Open);
    let source = sent.source.unwrap();
    assert_eq!(source.reference, "MSG1");
    assert!(env.events.events().contains(&RequestEvent::RequestStatusChanged {
        request_id: request.id,
        is_own: true,
        old_status: LocalRequestStatus::Draft,
        new_status: LocalRequestStatus::Open,
    }));
}

#[tokio::test]
async fn sent_twice_fails_the_status_check() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);
    let id = created_and_sent(
        &controller,
        vec![RequestItemOrGroup::Item(test_item(serde_json::json!({})))],
    )
    .await;

    let error = controller.sent(id, own_source()).await.unwrap_err();

    assert_eq!(error.to_string(), "Request has to be in status 'Draft'.");
}

#[tokio::test]
async fn sent_rejects_a_source_authored_by_a_peer() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);
    let request = controller
        .create(&create_params(vec![RequestItemOrGroup::Item(test_item(
            serde_json::json!({}),
        ))]))
        .await
        .unwrap();
    let peer_source = RequestSourceObject {
        source_type: RequestSourceKind::Message,
        reference: "MSG1".to_string(),
        created_by: CoreAddress::new("did:e:peer"),
    };

    let error = controller.sent(request.id, peer_source).await.unwrap_err();

    assert_eq!(
        error.to_string(),
        "Cannot create outgoing Request from a peer Message."
    );
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test]
async fn complete_attaches_the_response_and_closes_the_request() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);
    let id = created_and_sent(
        &controller,
        vec![RequestItemOrGroup::Item(test_item(serde_json::json!({})))],
    )
    .await;

    let completed = controller
        .complete(
            id.clone(),
            Some(ResponseSource {
                source_type: RequestSourceKind::Message,
                reference: "MSG2".to_string(),
            }),
            accepted_response(id.clone(), vec![accepted_item()]),
        )
        .await
        .unwrap();

    assert_eq!(completed.status(), LocalRequestStatus::Completed);
    let response = completed.response.unwrap();
    assert_eq!(response.content.result, ResponseResult::Accepted);
    assert_eq!(response.source.unwrap().reference, "MSG2");
}

#[tokio::test]
async fn complete_rejects_a_response_that_does_not_mirror_the_request() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);
    let id = created_and_sent(
        &controller,
        vec![
            RequestItemOrGroup::Item(test_item(serde_json::json!({}))),
            RequestItemOrGroup::Item(test_item(serde_json::json!({}))),
        ],
    )
    .await;

    let error = controller
        .complete(
            id.clone(),
            None,
            accepted_response(id.clone(), vec![accepted_item()]),
        )
        .await
        .unwrap_err();

    assert!(error.to_string().contains("does not mirror"));
    // The request is untouched.
    let stored = controller.get_outgoing_request(id).await.unwrap().unwrap();
    assert_eq!(stored.status(), LocalRequestStatus::Open);
    assert!(stored.response.is_none());
}

#[tokio::test]
async fn complete_applies_nothing_when_a_response_item_fails_validation() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);
    let id = created_and_sent(
        &controller,
        vec![RequestItemOrGroup::Item(test_item(
            serde_json::json!({ "canApplyFail": true }),
        ))],
    )
    .await;

    let error = controller
        .complete(
            id.clone(),
            None,
            accepted_response(id.clone(), vec![accepted_item()]),
        )
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "The response item cannot be applied.");
    let stored = controller.get_outgoing_request(id).await.unwrap().unwrap();
    assert_eq!(stored.status(), LocalRequestStatus::Open);
}

#[tokio::test]
async fn completing_an_accepted_share_attribute_records_the_shared_copy() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);
    let source = env
        .attributes
        .create_local_attribute(serde_json::json!({ "name": "DisplayName" }))
        .await
        .unwrap();

    let share_item = RequestItem {
        item_type: SHARE_ATTRIBUTE_ITEM_TYPE.to_string(),
        must_be_accepted: false,
        title: None,
        description: None,
        response_metadata: None,
        content: serde_json::json!({
            "attribute": { "name": "DisplayName" },
            "attributeId": source.id.as_str(),
        }),
    };
    let id = created_and_sent(&controller, vec![RequestItemOrGroup::Item(share_item)]).await;

    let response_items = vec![ResponseItemOrGroup::Item(ResponseItem {
        result: ResponseItemResult::Accepted,
        metadata: None,
        content: Some(serde_json::json!({ "attributeId": "ATTPEER" })),
    })];
    let completed = controller
        .complete(id.clone(), None, accepted_response(id, response_items))
        .await
        .unwrap();

    assert_eq!(completed.status(), LocalRequestStatus::Completed);
    let copies = env.attributes.shared_copies_of(&source.id).await;
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].shared_with, Some(CoreAddress::new("did:e:peer")));
}

#[tokio::test]
async fn an_accepted_share_attribute_without_an_attribute_id_fails_validation() {
    let env = TestEnvironment::new("did:e:self");
    let controller = controller(&env);
    let source = env
        .attributes
        .create_local_attribute(serde_json::json!({ "name": "DisplayName" }))
        .await
        .unwrap();
    let share_item = RequestItem {
        item_type: SHARE_ATTRIBUTE_ITEM_TYPE.to_string(),
        must_be_accepted: false,
        title: None,
        description: None,
        response_metadata: None,
        content: serde_json::json!({
            "attribute": { "name": "DisplayName" },
            "attributeId": source.id.as_str(),
        }),
    };
    let id = created_and_sent(&controller, vec![RequestItemOrGroup::Item(share_item)]).await;

    let error = controller
        .complete(
            id.clone(),
            None,
            accepted_response(id.clone(), vec![accepted_item()]),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, RequestError::ValidationFailed { .. }));
    assert!(env.attributes.shared_copies_of(&source.id).await.is_empty());
    let stored = controller.get_outgoing_request(id).await.unwrap().unwrap();
    assert_eq!(stored.status(), LocalRequestStatus::Open);
}

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn lookup_does_not_return_incoming_requests() {
    let env = TestEnvironment::new("did:e:self");
    let outgoing = controller(&env);
    let incoming = peer_requests_engine::IncomingRequestsController::new(
        env.environment.clone(),
        registry(),
    );
    let received = incoming
        .received(
            Request {
                id: None,
                title: None,
                description: None,
                expires_at: None,
                items: vec![RequestItemOrGroup::Item(test_item(serde_json::json!({})))],
            },
            RequestSourceObject {
                source_type: RequestSourceKind::Message,
                reference: "MSG1".to_string(),
                created_by: CoreAddress::new("did:e:peer"),
            },
        )
        .await
        .unwrap();

    let found = outgoing.get_outgoing_request(received.id).await.unwrap();
    assert!(found.is_none());

    let missing = outgoing
        .get_outgoing_request(RequestId::new("REQ404"))
        .await
        .unwrap();
    assert!(missing.is_none());
}
