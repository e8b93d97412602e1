//! Processor for the item type that shares an attribute with a peer.
//!
//! A `ShareAttributeRequestItem` carries the attribute value in its payload
//! under `"attribute"` and, on the sender side, optionally the id of the
//! source attribute under `"attributeId"`. Accepting the item stores the
//! attribute as a peer attribute; the sender applies the accepted response by
//! recording a shared copy of the source attribute.

use futures::future::BoxFuture;
use peer_requests_core::content::{
    Request, RequestItem, ResponseItem, ResponseItemResult,
};
use peer_requests_core::error::RequestError;
use peer_requests_core::ids::{AttributeId, CoreAddress};
use peer_requests_core::validation::{ValidationResult, codes};

use crate::params::DecideRequestItemParameters;
use crate::processor::{ProcessorContext, RequestItemProcessor, generic_reject_item};

/// The `"@type"` discriminator this processor is registered under.
pub const SHARE_ATTRIBUTE_ITEM_TYPE: &str = "ShareAttributeRequestItem";

/// Shares an attribute of the sender with the recipient.
pub struct ShareAttributeRequestItemProcessor {
    context: ProcessorContext,
}

impl ShareAttributeRequestItemProcessor {
    /// Build a processor bound to one request.
    #[must_use]
    pub const fn new(context: ProcessorContext) -> Self {
        Self { context }
    }

    fn attribute_value(item: &RequestItem) -> Option<&serde_json::Value> {
        item.content.get("attribute").filter(|v| !v.is_null())
    }

    fn source_attribute_id(item: &RequestItem) -> Option<AttributeId> {
        item.content
            .get("attributeId")
            .and_then(serde_json::Value::as_str)
            .map(AttributeId::new)
    }

    fn missing_attribute() -> ValidationResult {
        ValidationResult::error(
            codes::INVALID_REQUEST_ITEM,
            "The item does not carry an attribute to share.",
        )
    }
}

impl RequestItemProcessor for ShareAttributeRequestItemProcessor {
    fn can_create_outgoing_request_item<'a>(
        &'a self,
        item: &'a RequestItem,
        _request: &'a Request,
        _recipient: &'a CoreAddress,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        Box::pin(async move {
            if Self::attribute_value(item).is_none() {
                return Ok(Self::missing_attribute());
            }
            if let Some(source_id) = Self::source_attribute_id(item) {
                let found = self
                    .context
                    .environment
                    .attributes
                    .get_local_attribute(source_id.clone())
                    .await
                    .map_err(|e| RequestError::ProcessorFailed {
                        item_type: SHARE_ATTRIBUTE_ITEM_TYPE.to_string(),
                        details: e.to_string(),
                    })?;
                if found.is_none() {
                    return Ok(ValidationResult::error(
                        codes::INVALID_REQUEST_ITEM,
                        format!("The attribute '{source_id}' does not exist."),
                    ));
                }
            }
            Ok(ValidationResult::success())
        })
    }

    fn can_accept<'a>(
        &'a self,
        item: &'a RequestItem,
        _params: &'a DecideRequestItemParameters,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        Box::pin(async move {
            if Self::attribute_value(item).is_none() {
                return Ok(Self::missing_attribute());
            }
            Ok(ValidationResult::success())
        })
    }

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
            // can_accept guarantees the value is present.
            let value = Self::attribute_value(item).cloned().unwrap_or_default();
            let attribute = self
                .context
                .environment
                .attributes
                .create_peer_local_attribute(value, self.context.peer.clone())
                .await
                .map_err(|e| RequestError::ProcessorFailed {
                    item_type: SHARE_ATTRIBUTE_ITEM_TYPE.to_string(),
                    details: e.to_string(),
                })?;
            tracing::debug!(
                request_id = %self.context.request_id,
                attribute_id = %attribute.id,
                "stored shared peer attribute"
            );
            Ok(ResponseItem {
                result: ResponseItemResult::Accepted,
                metadata: item.response_metadata.clone(),
                content: Some(serde_json::json!({ "attributeId": attribute.id })),
            })
        })
    }

    fn reject<'a>(
        &'a self,
        item: &'a RequestItem,
        _params: &'a DecideRequestItemParameters,
    ) -> BoxFuture<'a, Result<ResponseItem, RequestError>> {
        Box::pin(async move { Ok(generic_reject_item(item)) })
    }

    fn can_apply_incoming_response_item<'a>(
        &'a self,
        response_item: &'a ResponseItem,
        _item: &'a RequestItem,
    ) -> BoxFuture<'a, Result<ValidationResult, RequestError>> {
        Box::pin(async move {
            if response_item.result == ResponseItemResult::Accepted {
                let has_id = response_item
                    .content
                    .as_ref()
                    .and_then(|c| c.get("attributeId"))
                    .and_then(serde_json::Value::as_str)
                    .is_some();
                if !has_id {
                    return Ok(ValidationResult::error(
                        codes::INVALID_REQUEST_ITEM,
                        "The accepted response item does not carry the peer's attribute id.",
                    ));
                }
            }
            Ok(ValidationResult::success())
        })
    }

    fn apply_incoming_response_item<'a>(
        &'a self,
        response_item: &'a ResponseItem,
        item: &'a RequestItem,
    ) -> BoxFuture<'a, Result<(), RequestError>> {
        Box::pin(async move {
            if response_item.result != ResponseItemResult::Accepted {
                return Ok(());
            }
            let Some(source_id) = Self::source_attribute_id(item) else {
                // No local source attribute to mark as shared.
                return Ok(());
            };
            let copy = self
                .context
                .environment
                .attributes
                .create_shared_local_attribute_copy(source_id, self.context.peer.clone())
                .await
                .map_err(|e| RequestError::ProcessorFailed {
                    item_type: SHARE_ATTRIBUTE_ITEM_TYPE.to_string(),
                    details: e.to_string(),
                })?;
            tracing::debug!(
                request_id = %self.context.request_id,
                attribute_id = %copy.id,
                "recorded shared attribute copy"
            );
            Ok(())
        })
    }
}
