//! Request engine: controllers and item processors.
//!
//! This crate drives the lifecycle of [`LocalRequest`]s on both sides of a
//! peer relationship:
//!
//! - [`IncomingRequestsController`] handles requests received from a peer,
//!   from receipt through the user's decision to completion.
//! - [`OutgoingRequestsController`] handles requests the local identity
//!   creates, sends and eventually completes with the peer's response.
//!
//! Neither controller interprets item payloads. Per-item-type business rules
//! live in [`RequestItemProcessor`] implementations, resolved through a
//! [`RequestItemProcessorRegistry`] keyed by the item's `"@type"`
//! discriminator. Item types without a registration fall back to
//! [`GenericRequestItemProcessor`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use peer_requests_engine::{
//!     IncomingRequestsController, RequestItemProcessorRegistry,
//!     ShareAttributeRequestItemProcessor, SHARE_ATTRIBUTE_ITEM_TYPE,
//! };
//! # fn environment() -> peer_requests_core::RequestsEnvironment { unimplemented!() }
//!
//! let mut registry = RequestItemProcessorRegistry::new();
//! registry
//!     .register_processor_for_type(
//!         Box::new(|ctx| Box::new(ShareAttributeRequestItemProcessor::new(ctx))),
//!         SHARE_ATTRIBUTE_ITEM_TYPE,
//!     )
//!     .unwrap();
//! let incoming = IncomingRequestsController::new(environment(), Arc::new(registry));
//! ```
//!
//! [`LocalRequest`]: peer_requests_core::LocalRequest

pub mod incoming;
pub mod outgoing;
pub mod params;
pub mod processor;
pub mod registry;
pub mod share_attribute;

pub use incoming::IncomingRequestsController;
pub use outgoing::OutgoingRequestsController;
pub use params::{
    CreateOutgoingRequestParameters, DecideItemOrGroup, DecideRequestItemGroupParameters,
    DecideRequestItemParameters, DecideRequestParameters, RequestDecision,
};
pub use processor::{GenericRequestItemProcessor, ProcessorContext, RequestItemProcessor};
pub use registry::{ProcessorFactory, RequestItemProcessorRegistry};
pub use share_attribute::{SHARE_ATTRIBUTE_ITEM_TYPE, ShareAttributeRequestItemProcessor};
