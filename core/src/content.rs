//! Request and Response content types.
//!
//! A [`Request`] is an ordered sequence of items a sender asks the recipient
//! to act upon. Each entry is either a single [`RequestItem`] or a
//! [`RequestItemGroup`] bundling several items; groups cannot be nested, so
//! the structure is at most two levels deep and that invariant is carried by
//! the types themselves (a group holds `Vec<RequestItem>`, never further
//! groups).
//!
//! A [`Response`] mirrors the request structure one to one: the n-th response
//! entry answers the n-th request entry, and a group is answered by a group
//! with one [`ResponseItem`] per grouped request item.
//!
//! # Wire shape
//!
//! Content serializes to JSON with camelCase keys. Request items carry an
//! open-ended `"@type"` discriminator that selects the processor responsible
//! for the item; groups are recognized structurally by their `items` array.

use crate::ids::RequestId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque key-value metadata attached to items and echoed into responses.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Errors raised when content violates its structural invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// A request must ask for at least one thing.
    #[error("A Request must contain at least one item.")]
    EmptyRequest,

    /// An empty group has no meaning and would break positional mirroring.
    #[error("A RequestItemGroup must contain at least one item.")]
    EmptyGroup,

    /// A required value was missing from the content.
    #[error("Value is not defined: {0}")]
    ValueNotDefined(&'static str),
}

/// A single ask within a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    /// Type discriminator selecting the processor for this item.
    #[serde(rename = "@type")]
    pub item_type: String,

    /// Whether the recipient must accept this item to accept the request.
    pub must_be_accepted: bool,

    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Optional display description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Metadata echoed verbatim into the corresponding [`ResponseItem`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_metadata: Option<JsonMap>,

    /// Type-specific payload, interpreted only by the item's processor.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub content: serde_json::Value,
}

/// A named bundle of asks within a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItemGroup {
    /// Whether all items of this group must be accepted to accept the request.
    pub must_be_accepted: bool,

    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Optional display description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Metadata echoed into the corresponding [`ResponseItemGroup`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_metadata: Option<JsonMap>,

    /// The grouped items. Never empty, never nested groups.
    pub items: Vec<RequestItem>,
}

/// One entry of a request: a single item or a one-level group.
///
/// Deserialization tries the group shape first; an object with an `items`
/// array is a group, everything else is a single item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestItemOrGroup {
    /// A group of items.
    Group(RequestItemGroup),
    /// A single item.
    Item(RequestItem),
}

/// The content of a request: what one party asks another to act upon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Id assigned by the sender. Present on transmitted requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Optional display description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Point in time after which the request should no longer be decided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The ordered asks of this request.
    pub items: Vec<RequestItemOrGroup>,
}

impl Request {
    /// Check the structural invariants of this request.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::EmptyRequest`] when the request has no items
    /// and [`ContentError::EmptyGroup`] when any group is empty.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.items.is_empty() {
            return Err(ContentError::EmptyRequest);
        }
        for entry in &self.items {
            if let RequestItemOrGroup::Group(group) = entry {
                if group.items.is_empty() {
                    return Err(ContentError::EmptyGroup);
                }
            }
        }
        Ok(())
    }
}

/// Outcome of a single response item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseItemResult {
    /// The item was accepted.
    Accepted,
    /// The item was rejected.
    Rejected,
}

/// Overall outcome of a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseResult {
    /// The request was accepted (individual items may still be rejected).
    Accepted,
    /// The request was rejected as a whole.
    Rejected,
}

/// The answer to a single [`RequestItem`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    /// Accept/reject outcome for the mirrored request item.
    pub result: ResponseItemResult,

    /// Copy of the request item's `response_metadata`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,

    /// Processor-specific payload (e.g. the id of a created attribute).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

/// The answer to a [`RequestItemGroup`], one item per grouped request item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItemGroup {
    /// Copy of the request group's `response_metadata`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,

    /// The grouped response items, positionally mirroring the request group.
    pub items: Vec<ResponseItem>,
}

/// One entry of a response, mirroring [`RequestItemOrGroup`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseItemOrGroup {
    /// Answer to a group.
    Group(ResponseItemGroup),
    /// Answer to a single item.
    Item(ResponseItem),
}

/// The content of a response: the structural mirror of the decided request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Overall accept/reject outcome.
    pub result: ResponseResult,

    /// Id of the request this response answers.
    pub request_id: RequestId,

    /// The ordered answers, one per request entry.
    pub items: Vec<ResponseItemOrGroup>,
}
