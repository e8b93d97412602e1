//! Domain events published on request state changes.
//!
//! Every committed transition publishes one [`RequestEvent`] through the
//! [`EventPublisher`]. Publication is fire-and-forget: the engine never awaits
//! an acknowledgement and a slow or failing bus must not affect request
//! processing.

use crate::ids::{CoreAddress, RequestId};
use crate::local_request::LocalRequestStatus;
use serde::{Deserialize, Serialize};

/// Domain event describing a change to a local request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestEvent {
    /// A peer-initiated request was received and persisted.
    IncomingRequestReceived {
        /// Id of the new request.
        request_id: RequestId,
        /// The requesting peer.
        peer: CoreAddress,
    },

    /// A self-initiated request was created in `Draft`.
    OutgoingRequestCreated {
        /// Id of the new request.
        request_id: RequestId,
        /// The addressed peer.
        peer: CoreAddress,
    },

    /// A request moved to a new lifecycle status.
    RequestStatusChanged {
        /// Id of the request.
        request_id: RequestId,
        /// Whether the request is outgoing.
        is_own: bool,
        /// Status before the transition.
        old_status: LocalRequestStatus,
        /// Status after the transition.
        new_status: LocalRequestStatus,
    },
}

impl RequestEvent {
    /// Stable event type identifier, versioned for schema evolution.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::IncomingRequestReceived { .. } => "IncomingRequestReceived.v1",
            Self::OutgoingRequestCreated { .. } => "OutgoingRequestCreated.v1",
            Self::RequestStatusChanged { .. } => "RequestStatusChanged.v1",
        }
    }
}

/// Fire-and-forget publication of domain events to an external bus.
///
/// Implementations must be `Send + Sync`; they may queue, forward or drop
/// events but must not block the caller on delivery.
pub trait EventPublisher: Send + Sync {
    /// Publish one event. No acknowledgement is awaited.
    fn publish(&self, event: RequestEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_are_versioned() {
        let event = RequestEvent::RequestStatusChanged {
            request_id: RequestId::new("REQ1"),
            is_own: false,
            old_status: LocalRequestStatus::Open,
            new_status: LocalRequestStatus::DecisionRequired,
        };
        assert_eq!(event.event_type(), "RequestStatusChanged.v1");
    }
}
