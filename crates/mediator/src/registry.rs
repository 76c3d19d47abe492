use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use waku_core::container::Resolver;
use waku_core::provider::TypeKey;

use crate::contracts::{ErasedMessage, GlobalBehavior, PipelineFuture, RequestEnvelope};
use crate::errors::MediatorError;

/// Builds the dispatch chain for one request: resolves the handler and every
/// behavior from the current scope, folds them into a single callable, and
/// returns the pending future.
pub(crate) type DispatchFn = Arc<
    dyn Fn(
            &Resolver<'_>,
            RequestEnvelope,
            &[Arc<dyn GlobalBehavior>],
        ) -> Result<PipelineFuture<ErasedMessage>, MediatorError>
        + Send
        + Sync,
>;

/// Resolves one event handler and returns its pending invocation.
pub(crate) type EventInvokeFn = Arc<
    dyn Fn(&Resolver<'_>, ErasedMessage) -> Result<PipelineFuture<()>, MediatorError>
        + Send
        + Sync,
>;

pub(crate) struct RequestBinding {
    pub(crate) request_name: &'static str,
    pub(crate) handler_name: &'static str,
    pub(crate) behaviors: Vec<TypeKey>,
    pub(crate) dispatch: DispatchFn,
}

pub(crate) struct EventBinding {
    pub(crate) handler: TypeKey,
    pub(crate) invoke: EventInvokeFn,
}

/// The application-wide CQRS tables, merged from every module's bindings
/// during the registration phase and frozen (behind `Arc`) afterwards.
///
/// Invariants: exactly one handler per request type; handler classes unique
/// per event type, ordered by topological module order then declaration
/// order.
#[derive(Default)]
pub struct MediatorRegistry {
    requests: HashMap<TypeId, RequestBinding>,
    events: HashMap<TypeId, Vec<EventBinding>>,
}

impl MediatorRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_request(
        &mut self,
        request: TypeId,
        binding: RequestBinding,
    ) -> Result<(), MediatorError> {
        // Class-level duplicates among the binding's own behaviors.
        for (index, behavior) in binding.behaviors.iter().enumerate() {
            if binding.behaviors[..index].contains(behavior) {
                return Err(MediatorError::PipelineBehaviorAlreadyRegistered {
                    request: binding.request_name,
                    behavior: behavior.type_name(),
                });
            }
        }
        match self.requests.entry(request) {
            std::collections::hash_map::Entry::Occupied(existing) => {
                Err(MediatorError::RequestHandlerAlreadyRegistered {
                    request: binding.request_name,
                    existing: existing.get().handler_name,
                    attempted: binding.handler_name,
                })
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                tracing::trace!(
                    request = binding.request_name,
                    handler = binding.handler_name,
                    behaviors = binding.behaviors.len(),
                    "request handler bound"
                );
                slot.insert(binding);
                Ok(())
            }
        }
    }

    pub(crate) fn insert_event(
        &mut self,
        event: TypeId,
        event_name: &'static str,
        binding: EventBinding,
    ) -> Result<(), MediatorError> {
        let handlers = self.events.entry(event).or_default();
        if handlers.iter().any(|existing| existing.handler == binding.handler) {
            return Err(MediatorError::EventHandlerAlreadyRegistered {
                event: event_name,
                handler: binding.handler.type_name(),
            });
        }
        tracing::trace!(
            event = event_name,
            handler = binding.handler.type_name(),
            "event handler bound"
        );
        handlers.push(binding);
        Ok(())
    }

    pub(crate) fn request(&self, request: &TypeId) -> Option<&RequestBinding> {
        self.requests.get(request)
    }

    pub(crate) fn events(&self, event: &TypeId) -> Option<&[EventBinding]> {
        self.events.get(event).map(|handlers| handlers.as_slice())
    }

    /// Number of bound request types.
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// Number of event types with at least one handler.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

impl std::fmt::Debug for MediatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatorRegistry")
            .field("requests", &self.requests.len())
            .field("events", &self.events.len())
            .finish()
    }
}
