use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use waku_core::container::Resolver;
use waku_core::extensions::{Extension, OnModuleRegistration};
use waku_core::modules::RegistrationContext;
use waku_core::provider::{object, scoped, TypeKey};

use crate::contracts::{
    EnvelopeNext, ErasedMessage, GlobalBehavior, PipelineFuture, RequestEnvelope,
};
use crate::events::{EventPublisher, SequentialPublisher};
use crate::extension::MediatorExtension;
use crate::mediator::{MediatorService, Publisher, Sender};
use crate::registry::{DispatchFn, EventBinding, MediatorRegistry, RequestBinding};

/// Mediator configuration: behaviors applied to every request, and the event
/// publisher strategy. Defaults to no global behaviors and sequential
/// publishing.
#[derive(Clone)]
pub struct MediatorConfig {
    pub(crate) global_behaviors: Vec<Arc<dyn GlobalBehavior>>,
    pub(crate) publisher: Arc<dyn EventPublisher>,
}

impl MediatorConfig {
    pub fn new() -> Self {
        Self {
            global_behaviors: Vec::new(),
            publisher: Arc::new(SequentialPublisher),
        }
    }

    /// Append a behavior applied to every request, outermost first.
    pub fn with_global_behavior(mut self, behavior: impl GlobalBehavior) -> Self {
        self.global_behaviors.push(Arc::new(behavior));
        self
    }

    pub fn with_publisher(mut self, publisher: impl EventPublisher) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-level half of the discover + aggregate pattern.
///
/// During the registration phase this hook walks every discovered
/// [`MediatorExtension`] in topological module order, merges the per-module
/// bindings into one frozen [`MediatorRegistry`], contributes handler and
/// behavior providers to their owning modules, and installs the mediator
/// itself (plus its [`Sender`]/[`Publisher`] views) on the root module.
pub struct MediatorAppExtension {
    config: MediatorConfig,
}

impl MediatorAppExtension {
    pub fn new() -> Self {
        Self::with_config(MediatorConfig::new())
    }

    pub fn with_config(config: MediatorConfig) -> Self {
        Self { config }
    }
}

impl Default for MediatorAppExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for MediatorAppExtension {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_registration(&self) -> Option<&dyn OnModuleRegistration> {
        Some(self)
    }
}

impl OnModuleRegistration for MediatorAppExtension {
    fn on_module_registration(&self, ctx: &mut RegistrationContext<'_>) -> anyhow::Result<()> {
        let mut registry = MediatorRegistry::new();
        let mut contributed: HashSet<TypeKey> = HashSet::new();

        let extensions = ctx.find_extensions::<MediatorExtension>();
        tracing::debug!(modules = extensions.len(), "aggregating mediator bindings");

        for (module_id, extension) in &extensions {
            for registration in &extension.requests {
                let behavior_wraps: Vec<_> = registration
                    .behaviors
                    .iter()
                    .map(|behavior| behavior.wrap.clone())
                    .collect();
                let tail = registration.tail.clone();
                let dispatch: DispatchFn = Arc::new(
                    move |resolver: &Resolver<'_>,
                          envelope: RequestEnvelope,
                          globals: &[Arc<dyn GlobalBehavior>]| {
                        let mut stage = tail(resolver)?;
                        for wrap in behavior_wraps.iter().rev() {
                            stage = wrap(resolver, stage)?;
                        }
                        for global in globals.iter().rev() {
                            let global = global.clone();
                            let inner = stage;
                            stage = Box::new(
                                move |envelope: RequestEnvelope| -> PipelineFuture<ErasedMessage> {
                                    Box::pin(async move {
                                        let next = EnvelopeNext { stage: inner };
                                        global.handle(envelope, next).await
                                    })
                                },
                            );
                        }
                        Ok(stage(envelope))
                    },
                );

                registry.insert_request(
                    registration.request.type_id(),
                    RequestBinding {
                        request_name: registration.request_name,
                        handler_name: registration.handler.type_name(),
                        behaviors: registration
                            .behaviors
                            .iter()
                            .map(|behavior| behavior.behavior)
                            .collect(),
                        dispatch,
                    },
                )?;

                if contributed.insert(registration.handler) {
                    ctx.add_provider(module_id, registration.handler_provider.clone())?;
                }
                for behavior in &registration.behaviors {
                    if contributed.insert(behavior.behavior) {
                        ctx.add_provider(module_id, behavior.provider.clone())?;
                    }
                }
            }

            for registration in &extension.events {
                registry.insert_event(
                    registration.event.type_id(),
                    registration.event_name,
                    EventBinding {
                        handler: registration.handler,
                        invoke: registration.invoke.clone(),
                    },
                )?;
                if contributed.insert(registration.handler) {
                    ctx.add_provider(module_id, registration.handler_provider.clone())?;
                }
            }
        }

        let registry = Arc::new(registry);
        tracing::debug!(
            requests = registry.request_count(),
            events = registry.event_count(),
            "mediator registry frozen"
        );

        // The mediator lives on the root module (implicitly global), so every
        // module resolves it without an explicit import.
        let root = ctx.root_id();
        let globals = self.config.global_behaviors.clone();
        let publisher = self.config.publisher.clone();
        let registry_for_provider = registry.clone();
        let mediator_provider = scoped::<MediatorService, _>(move |resolver| {
            Ok(Arc::new(MediatorService::new(
                registry_for_provider.clone(),
                globals.clone(),
                publisher.clone(),
                resolver.scope_handle(),
            )))
        })
        .provides::<Sender, _>(|service| Arc::new(Sender::new(service)))
        .provides::<Publisher, _>(|service| Arc::new(Publisher::new(service)));
        ctx.add_provider(&root, mediator_provider)?;
        ctx.add_provider(&root, object::<MediatorRegistry>(registry))?;

        Ok(())
    }
}
