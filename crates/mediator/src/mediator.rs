use std::any::TypeId;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use waku_core::container::ScopeHandle;

use crate::contracts::{Event, GlobalBehavior, Request, RequestEnvelope};
use crate::errors::MediatorError;
use crate::events::EventPublisher;
use crate::registry::MediatorRegistry;

/// The mediator: request dispatch plus event fan-out, resolved from the
/// current request scope.
///
/// [`Sender`] and [`Publisher`] are narrowing views over the same instance,
/// hygiene for consumers that only need one half, not isolation.
pub struct MediatorService {
    registry: Arc<MediatorRegistry>,
    globals: Vec<Arc<dyn GlobalBehavior>>,
    publisher: Arc<dyn EventPublisher>,
    scope: ScopeHandle,
}

impl MediatorService {
    pub(crate) fn new(
        registry: Arc<MediatorRegistry>,
        globals: Vec<Arc<dyn GlobalBehavior>>,
        publisher: Arc<dyn EventPublisher>,
        scope: ScopeHandle,
    ) -> Self {
        Self {
            registry,
            globals,
            publisher,
            scope,
        }
    }

    /// Dispatch a request through its pipeline and return the handler's
    /// response.
    ///
    /// The chain is global behaviors, then per-request behaviors, then the
    /// handler; it is fully constructed (every stage resolved) before the
    /// first stage observes the request. Handler and behavior errors
    /// propagate unmodified; [`MediatorError`] covers dispatch failures and
    /// can be recovered with `downcast_ref`.
    pub async fn send<R: Request>(&self, request: R) -> anyhow::Result<R::Response> {
        let binding = self
            .registry
            .request(&TypeId::of::<R>())
            .ok_or(MediatorError::RequestHandlerNotFound {
                request: std::any::type_name::<R>(),
            })?;

        let correlation_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "mediator_send",
            request = std::any::type_name::<R>(),
            correlation_id = %correlation_id,
        );

        let future = {
            let access = self.scope.access().map_err(MediatorError::from)?;
            let resolver = access.resolver();
            let envelope = RequestEnvelope::new(request, correlation_id);
            (binding.dispatch)(&resolver, envelope, &self.globals)?
        };

        let response = future.instrument(span).await?;
        response
            .downcast::<R::Response>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                MediatorError::ResponseTypeMismatch {
                    request: std::any::type_name::<R>(),
                }
                .into()
            })
    }

    /// Fan an event out to its handlers under the configured publisher
    /// strategy. Publishing with zero registered handlers is a no-op, never
    /// an error.
    pub async fn publish<E: Event>(&self, event: E) -> anyhow::Result<()> {
        let Some(bindings) = self.registry.events(&TypeId::of::<E>()) else {
            tracing::trace!(
                event = std::any::type_name::<E>(),
                "no handlers registered, publish is a no-op"
            );
            return Ok(());
        };

        let span = tracing::debug_span!(
            "mediator_publish",
            event = std::any::type_name::<E>(),
            handlers = bindings.len(),
        );

        let invocations = {
            let access = self.scope.access().map_err(MediatorError::from)?;
            let resolver = access.resolver();
            let mut invocations = Vec::with_capacity(bindings.len());
            for binding in bindings {
                invocations.push((binding.invoke)(&resolver, Box::new(event.clone()))?);
            }
            invocations
        };

        self.publisher.publish_all(invocations).instrument(span).await
    }
}

/// Send-only view of the mediator.
pub struct Sender {
    service: Arc<MediatorService>,
}

impl Sender {
    pub(crate) fn new(service: Arc<MediatorService>) -> Self {
        Self { service }
    }

    pub async fn send<R: Request>(&self, request: R) -> anyhow::Result<R::Response> {
        self.service.send(request).await
    }
}

/// Publish-only view of the mediator.
pub struct Publisher {
    service: Arc<MediatorService>,
}

impl Publisher {
    pub(crate) fn new(service: Arc<MediatorService>) -> Self {
        Self { service }
    }

    pub async fn publish<E: Event>(&self, event: E) -> anyhow::Result<()> {
        self.service.publish(event).await
    }
}
