//! Registry resolving request item types to their processors.
//!
//! The registry maps an item's `"@type"` discriminator to a factory producing
//! a fresh processor instance. Resolution never fails: unregistered types get
//! a [`GenericRequestItemProcessor`], so every item has baseline accept and
//! reject semantics. Each resolution constructs a new instance, so no mutable
//! processor state is ever shared across items or requests.

use std::collections::HashMap;

use peer_requests_core::content::RequestItem;
use peer_requests_core::error::RequestError;

use crate::processor::{GenericRequestItemProcessor, ProcessorContext, RequestItemProcessor};

/// Factory producing one processor instance for one request.
pub type ProcessorFactory =
    Box<dyn Fn(ProcessorContext) -> Box<dyn RequestItemProcessor> + Send + Sync>;

/// Maps each request item type to exactly one processor factory.
#[derive(Default)]
pub struct RequestItemProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl RequestItemProcessorRegistry {
    /// An empty registry; every item type falls back to the generic processor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor factory for an item type.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::ProcessorAlreadyRegistered`] when a factory is
    /// already registered for `item_type`; use
    /// [`replace_processor_for_type`](Self::replace_processor_for_type) to
    /// overwrite deliberately.
    pub fn register_processor_for_type(
        &mut self,
        factory: ProcessorFactory,
        item_type: impl Into<String>,
    ) -> Result<(), RequestError> {
        let item_type = item_type.into();
        if self.factories.contains_key(&item_type) {
            return Err(RequestError::ProcessorAlreadyRegistered { item_type });
        }
        self.factories.insert(item_type, factory);
        Ok(())
    }

    /// Register a processor factory for an item type, overwriting any
    /// existing registration.
    pub fn replace_processor_for_type(
        &mut self,
        factory: ProcessorFactory,
        item_type: impl Into<String>,
    ) {
        self.factories.insert(item_type.into(), factory);
    }

    /// Resolve a fresh processor instance for `item`.
    ///
    /// Every call constructs a new instance with the given context. Items of
    /// unregistered types get a [`GenericRequestItemProcessor`].
    #[must_use]
    pub fn get_processor_for_item(
        &self,
        item: &RequestItem,
        context: ProcessorContext,
    ) -> Box<dyn RequestItemProcessor> {
        match self.factories.get(&item.item_type) {
            Some(factory) => factory(context),
            None => Box::new(GenericRequestItemProcessor),
        }
    }
}
