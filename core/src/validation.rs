//! Composable validation results.
//!
//! A [`ValidationResult`] is either a success or an error, and additionally
//! carries one sub-result per item when it was produced by validating a
//! request, a response or a parameter set item by item. This mirrors the
//! item/group structure of the content being validated, so a caller can walk
//! the tree and find out exactly which item of which group failed.
//!
//! # Aggregation rule
//!
//! An aggregate built with [`ValidationResult::from_items`] is an error iff at
//! least one of its children is an error. The aggregate never repeats a
//! child's code or message; it always carries the fixed sentinel
//! [`codes::INHERITED_FROM_ITEM`] so callers can distinguish "my own rule
//! failed" from "something below me failed".

use serde::{Deserialize, Serialize};

/// Stable error codes used in [`ValidationResult`]s.
pub mod codes {
    /// Sentinel code of an aggregate whose children contain at least one error.
    pub const INHERITED_FROM_ITEM: &str = "inheritedFromItem";

    /// Message accompanying [`INHERITED_FROM_ITEM`].
    pub const INHERITED_FROM_ITEM_MESSAGE: &str = "Some child items have errors.";

    /// A request item is not valid for the operation at hand.
    pub const INVALID_REQUEST_ITEM: &str = "error.requests.invalidRequestItem";

    /// The number of decide/response items does not match the request content.
    pub const INVALID_NUMBER_OF_ITEMS: &str = "error.requests.decide.invalidNumberOfItems";

    /// A decide parameter addresses a group where the request has an item, or vice versa.
    pub const ITEM_KIND_MISMATCH: &str = "error.requests.decide.itemKindMismatch";

    /// An item flagged `mustBeAccepted` was not accepted while accepting the request.
    pub const MUST_BE_ACCEPTED: &str = "error.requests.decide.mustBeAccepted";

    /// An item was accepted while rejecting the whole request.
    pub const CANNOT_ACCEPT_WHEN_REJECTING: &str =
        "error.requests.decide.cannotAcceptPartOfRejectedRequest";
}

/// A single validation error with a stable code and a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Stable, machine-readable error code (see [`codes`]).
    pub code: String,
    /// Human-readable description of the failure.
    pub message: String,
}

/// Success/error outcome of a validation, with per-item sub-results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    error: Option<ValidationError>,
    items: Vec<ValidationResult>,
}

impl ValidationResult {
    /// A successful validation with no sub-results.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            error: None,
            items: Vec::new(),
        }
    }

    /// A failed validation with the given code and message.
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: Some(ValidationError {
                code: code.into(),
                message: message.into(),
            }),
            items: Vec::new(),
        }
    }

    /// Build an aggregate over per-item sub-results.
    ///
    /// The aggregate is an error iff any child is an error, in which case it
    /// carries the [`codes::INHERITED_FROM_ITEM`] sentinel. Children are kept
    /// in their original order either way.
    #[must_use]
    pub fn from_items(items: Vec<ValidationResult>) -> Self {
        let error = items.iter().any(ValidationResult::is_error).then(|| ValidationError {
            code: codes::INHERITED_FROM_ITEM.to_string(),
            message: codes::INHERITED_FROM_ITEM_MESSAGE.to_string(),
        });
        Self { error, items }
    }

    /// Whether this result is a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether this result is an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The error of this result, if any.
    #[must_use]
    pub const fn error_detail(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    /// Per-item sub-results, in the order of the validated items.
    #[must_use]
    pub fn items(&self) -> &[ValidationResult] {
        &self.items
    }
}
