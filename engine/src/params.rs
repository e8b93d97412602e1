//! Parameter types for creating and deciding requests, and the structural
//! validator matching decide parameters against request content.
//!
//! Deciding a request means answering every one of its items. The parameter
//! structure therefore mirrors the request content: one entry per top-level
//! item or group, and one leaf parameter per grouped item. The validator
//! checks that mirror before any processor is consulted, so processors can
//! rely on positional pairing.

use peer_requests_core::content::{Request, RequestItemOrGroup};
use peer_requests_core::ids::{CoreAddress, RequestId};
use peer_requests_core::validation::{ValidationResult, codes};
use serde::{Deserialize, Serialize};

/// Accept or reject, for the request as a whole and for each item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestDecision {
    /// Accept.
    Accept,
    /// Reject.
    Reject,
}

/// The decision for one request item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequestItemParameters {
    /// Accept or reject this item.
    pub decision: RequestDecision,

    /// Processor-specific parameters (e.g. which attribute to answer with).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl DecideRequestItemParameters {
    /// Plain accept with no processor-specific payload.
    #[must_use]
    pub const fn accept() -> Self {
        Self {
            decision: RequestDecision::Accept,
            payload: serde_json::Value::Null,
        }
    }

    /// Plain reject with no processor-specific payload.
    #[must_use]
    pub const fn reject() -> Self {
        Self {
            decision: RequestDecision::Reject,
            payload: serde_json::Value::Null,
        }
    }
}

/// Decisions for the items of one request group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequestItemGroupParameters {
    /// One decision per grouped request item, in order.
    pub items: Vec<DecideRequestItemParameters>,
}

/// One entry of the decide parameters, mirroring [`RequestItemOrGroup`].
///
/// Like the content types, groups are recognized structurally by their
/// `items` array during deserialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecideItemOrGroup {
    /// Decisions for a group.
    Group(DecideRequestItemGroupParameters),
    /// Decision for a single item.
    Item(DecideRequestItemParameters),
}

/// Parameters for accepting or rejecting an incoming request.
///
/// The overall decision (accept vs. reject) is implied by the controller
/// method these parameters are passed to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequestParameters {
    /// Id of the request to decide.
    pub request_id: RequestId,

    /// One entry per top-level request item or group, in order.
    pub items: Vec<DecideItemOrGroup>,
}

/// Parameters for creating an outgoing request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutgoingRequestParameters {
    /// The peer the request is addressed to.
    pub peer: CoreAddress,

    /// The request content to send.
    pub content: Request,
}

/// Check that decide parameters structurally mirror the request content and
/// respect the decision rules.
///
/// Rules checked, per position, recursing one level into groups:
///
/// - entry counts match at every level
/// - an item is answered by an item, a group by a group
/// - when `decision` is [`RequestDecision::Accept`]: a top-level item flagged
///   `mustBeAccepted` must be accepted, and inside a group flagged
///   `mustBeAccepted` every grouped item flagged `mustBeAccepted` must be
///   accepted
/// - when `decision` is [`RequestDecision::Reject`]: no item may be accepted
///
/// The result carries one sub-result per entry so callers can point at the
/// offending position.
#[must_use]
pub fn validate_decide_parameters(
    request: &Request,
    params: &DecideRequestParameters,
    decision: RequestDecision,
) -> ValidationResult {
    if params.items.len() != request.items.len() {
        return ValidationResult::error(
            codes::INVALID_NUMBER_OF_ITEMS,
            format!(
                "Number of items ({}) does not match number of request items ({}).",
                params.items.len(),
                request.items.len()
            ),
        );
    }

    let mut results = Vec::with_capacity(request.items.len());
    for (entry, decide) in request.items.iter().zip(&params.items) {
        results.push(match (entry, decide) {
            (RequestItemOrGroup::Item(item), DecideItemOrGroup::Item(leaf)) => {
                validate_leaf(item.must_be_accepted, false, leaf, decision)
            }
            (RequestItemOrGroup::Group(group), DecideItemOrGroup::Group(decide_group)) => {
                if decide_group.items.len() != group.items.len() {
                    ValidationResult::error(
                        codes::INVALID_NUMBER_OF_ITEMS,
                        format!(
                            "Number of items ({}) does not match number of request items ({}).",
                            decide_group.items.len(),
                            group.items.len()
                        ),
                    )
                } else {
                    let inner = group
                        .items
                        .iter()
                        .zip(&decide_group.items)
                        .map(|(item, leaf)| {
                            validate_leaf(
                                item.must_be_accepted,
                                !group.must_be_accepted,
                                leaf,
                                decision,
                            )
                        })
                        .collect();
                    ValidationResult::from_items(inner)
                }
            }
            (RequestItemOrGroup::Item(_), DecideItemOrGroup::Group(_)) => ValidationResult::error(
                codes::ITEM_KIND_MISMATCH,
                "The RequestItem was answered with group parameters.",
            ),
            (RequestItemOrGroup::Group(_), DecideItemOrGroup::Item(_)) => ValidationResult::error(
                codes::ITEM_KIND_MISMATCH,
                "The RequestItemGroup was answered with item parameters.",
            ),
        });
    }

    ValidationResult::from_items(results)
}

fn validate_leaf(
    must_be_accepted: bool,
    group_is_optional: bool,
    leaf: &DecideRequestItemParameters,
    decision: RequestDecision,
) -> ValidationResult {
    match decision {
        RequestDecision::Accept => {
            if must_be_accepted
                && !group_is_optional
                && leaf.decision == RequestDecision::Reject
            {
                ValidationResult::error(
                    codes::MUST_BE_ACCEPTED,
                    "The RequestItem is flagged as 'mustBeAccepted', but it was not accepted.",
                )
            } else {
                ValidationResult::success()
            }
        }
        RequestDecision::Reject => {
            if leaf.decision == RequestDecision::Accept {
                ValidationResult::error(
                    codes::CANNOT_ACCEPT_WHEN_REJECTING,
                    "Cannot accept an item of a Request that is rejected as a whole.",
                )
            } else {
                ValidationResult::success()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use peer_requests_core::content::{RequestItem, RequestItemGroup};
    use proptest::prelude::*;

    fn item(must_be_accepted: bool) -> RequestItem {
        RequestItem {
            item_type: "TestRequestItem".to_string(),
            must_be_accepted,
            title: None,
            description: None,
            response_metadata: None,
            content: serde_json::Value::Null,
        }
    }

    fn request(items: Vec<RequestItemOrGroup>) -> Request {
        Request {
            id: Some(RequestId::new("REQ1")),
            title: None,
            description: None,
            expires_at: None,
            items,
        }
    }

    fn params(items: Vec<DecideItemOrGroup>) -> DecideRequestParameters {
        DecideRequestParameters {
            request_id: RequestId::new("REQ1"),
            items,
        }
    }

    #[test]
    fn accepts_matching_shape() {
        let request = request(vec![
            RequestItemOrGroup::Item(item(true)),
            RequestItemOrGroup::Group(RequestItemGroup {
                must_be_accepted: false,
                title: None,
                description: None,
                response_metadata: None,
                items: vec![item(false), item(false)],
            }),
        ]);
        let params = params(vec![
            DecideItemOrGroup::Item(DecideRequestItemParameters::accept()),
            DecideItemOrGroup::Group(DecideRequestItemGroupParameters {
                items: vec![
                    DecideRequestItemParameters::accept(),
                    DecideRequestItemParameters::reject(),
                ],
            }),
        ]);

        let result = validate_decide_parameters(&request, &params, RequestDecision::Accept);
        assert!(result.is_success());
        assert_eq!(result.items().len(), 2);
    }

    #[test]
    fn rejects_wrong_top_level_count() {
        let request = request(vec![RequestItemOrGroup::Item(item(false))]);
        let params = params(vec![]);

        let result = validate_decide_parameters(&request, &params, RequestDecision::Accept);
        assert_eq!(
            result.error_detail().unwrap().code,
            codes::INVALID_NUMBER_OF_ITEMS
        );
    }

    #[test]
    fn rejects_item_answered_with_group_parameters() {
        let request = request(vec![RequestItemOrGroup::Item(item(false))]);
        let params = params(vec![DecideItemOrGroup::Group(
            DecideRequestItemGroupParameters {
                items: vec![DecideRequestItemParameters::accept()],
            },
        )]);

        let result = validate_decide_parameters(&request, &params, RequestDecision::Accept);
        assert!(result.is_error());
        assert_eq!(
            result.items()[0].error_detail().unwrap().code,
            codes::ITEM_KIND_MISMATCH
        );
    }

    #[test]
    fn rejecting_must_be_accepted_item_fails_accept() {
        let request = request(vec![RequestItemOrGroup::Item(item(true))]);
        let params = params(vec![DecideItemOrGroup::Item(
            DecideRequestItemParameters::reject(),
        )]);

        let result = validate_decide_parameters(&request, &params, RequestDecision::Accept);
        assert!(result.is_error());
        assert_eq!(
            result.items()[0].error_detail().unwrap().code,
            codes::MUST_BE_ACCEPTED
        );
    }

    #[test]
    fn optional_group_may_reject_must_be_accepted_items() {
        let request = request(vec![RequestItemOrGroup::Group(RequestItemGroup {
            must_be_accepted: false,
            title: None,
            description: None,
            response_metadata: None,
            items: vec![item(true)],
        })]);
        let params = params(vec![DecideItemOrGroup::Group(
            DecideRequestItemGroupParameters {
                items: vec![DecideRequestItemParameters::reject()],
            },
        )]);

        let result = validate_decide_parameters(&request, &params, RequestDecision::Accept);
        assert!(result.is_success());
    }

    #[test]
    fn rejecting_request_forbids_accepted_items() {
        let request = request(vec![RequestItemOrGroup::Item(item(false))]);
        let params = params(vec![DecideItemOrGroup::Item(
            DecideRequestItemParameters::accept(),
        )]);

        let result = validate_decide_parameters(&request, &params, RequestDecision::Reject);
        assert!(result.is_error());
        assert_eq!(
            result.items()[0].error_detail().unwrap().code,
            codes::CANNOT_ACCEPT_WHEN_REJECTING
        );
    }

    proptest! {
        /// A structurally matching parameter set always yields one sub-result
        /// per request entry, and per grouped item inside groups.
        #[test]
        fn arity_mirrors_request(shape in prop::collection::vec(prop::option::of(1..4usize), 1..6)) {
            let mut request_items = Vec::new();
            let mut decide_items = Vec::new();
            for group_size in &shape {
                match group_size {
                    None => {
                        request_items.push(RequestItemOrGroup::Item(item(false)));
                        decide_items.push(DecideItemOrGroup::Item(DecideRequestItemParameters::accept()));
                    }
                    Some(size) => {
                        request_items.push(RequestItemOrGroup::Group(RequestItemGroup {
                            must_be_accepted: false,
                            title: None,
                            description: None,
                            response_metadata: None,
                            items: (0..*size).map(|_| item(false)).collect(),
                        }));
                        decide_items.push(DecideItemOrGroup::Group(DecideRequestItemGroupParameters {
                            items: (0..*size).map(|_| DecideRequestItemParameters::accept()).collect(),
                        }));
                    }
                }
            }

            let result = validate_decide_parameters(
                &request(request_items),
                &params(decide_items),
                RequestDecision::Accept,
            );

            prop_assert!(result.is_success());
            prop_assert_eq!(result.items().len(), shape.len());
            for (sub, group_size) in result.items().iter().zip(&shape) {
                if let Some(size) = group_size {
                    prop_assert_eq!(sub.items().len(), *size);
                }
            }
        }
    }
}
