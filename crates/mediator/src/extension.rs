use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use waku_core::container::Resolver;
use waku_core::extensions::{Extension, OnModuleDiscover};
use waku_core::provider::{injectable, Inject, Provider, ProviderScope, TypeKey};

use crate::contracts::{
    ErasedMessage, ErasedStage, Event, EventHandler, Next, PipelineBehavior, PipelineFuture,
    Request, RequestEnvelope, RequestHandler,
};
use crate::errors::MediatorError;
use crate::registry::EventInvokeFn;

pub(crate) type TailFn =
    Arc<dyn Fn(&Resolver<'_>) -> Result<ErasedStage, MediatorError> + Send + Sync>;

pub(crate) type WrapFn =
    Arc<dyn Fn(&Resolver<'_>, ErasedStage) -> Result<ErasedStage, MediatorError> + Send + Sync>;

pub(crate) struct RequestRegistration {
    pub(crate) request: TypeKey,
    pub(crate) request_name: &'static str,
    pub(crate) handler: TypeKey,
    pub(crate) handler_provider: Provider,
    pub(crate) behaviors: Vec<BehaviorRegistration>,
    pub(crate) tail: TailFn,
}

pub(crate) struct BehaviorRegistration {
    pub(crate) behavior: TypeKey,
    pub(crate) provider: Provider,
    pub(crate) wrap: WrapFn,
}

pub(crate) struct EventRegistration {
    pub(crate) event: TypeKey,
    pub(crate) event_name: &'static str,
    pub(crate) handler: TypeKey,
    pub(crate) handler_provider: Provider,
    pub(crate) invoke: EventInvokeFn,
}

/// Per-module CQRS bindings, attached to module metadata as an extension.
///
/// The fluent builder accumulates bindings; once the extension lands on a
/// module the buffer is frozen by construction (the builder moves `self`).
/// During the registration phase the application-level
/// [`MediatorAppExtension`](crate::MediatorAppExtension) discovers every
/// instance and merges them into the application-wide registry.
///
/// ```ignore
/// let cqrs = MediatorExtension::new()
///     .bind_request::<CreateUser, CreateUserHandler>()
///     .with_behavior::<ValidationBehavior>()
///     .bind_event::<UserCreated, SendWelcomeEmail>()
///     .build();
/// ModuleMetadata::new("UserModule").with_extension(cqrs)
/// ```
pub struct MediatorExtension {
    pub(crate) requests: Vec<RequestRegistration>,
    pub(crate) events: Vec<EventRegistration>,
}

impl MediatorExtension {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Bind a request type to its single handler. Behaviors for this request
    /// are added on the returned builder.
    pub fn bind_request<R, H>(self) -> RequestBindingBuilder<R>
    where
        R: Request,
        H: RequestHandler<R> + Inject,
    {
        let tail: TailFn = Arc::new(move |resolver: &Resolver<'_>| {
            let handler = resolver.resolve::<H>().map_err(MediatorError::from)?;
            Ok(Box::new(move |envelope: RequestEnvelope| -> PipelineFuture<ErasedMessage> {
                Box::pin(async move {
                    let (request, _, _) = envelope.split::<R>()?;
                    let response = handler.handle(request).await?;
                    Ok(Box::new(response) as ErasedMessage)
                })
            }) as ErasedStage)
        });

        RequestBindingBuilder {
            extension: self,
            registration: RequestRegistration {
                request: TypeKey::of::<R>(),
                request_name: std::any::type_name::<R>(),
                handler: TypeKey::of::<H>(),
                handler_provider: injectable::<H>(ProviderScope::Request).build(),
                behaviors: Vec::new(),
                tail,
            },
            _marker: PhantomData,
        }
    }

    /// Bind an event handler. Repeated calls append handlers; their
    /// declaration order here is their invocation order within the module.
    pub fn bind_event<E, H>(mut self) -> Self
    where
        E: Event,
        H: EventHandler<E> + Inject,
    {
        let invoke: EventInvokeFn = Arc::new(move |resolver: &Resolver<'_>, message: ErasedMessage| {
            let handler = resolver.resolve::<H>().map_err(MediatorError::from)?;
            let invocation: PipelineFuture<()> = Box::pin(async move {
                let event = message.downcast::<E>().map_err(|_| {
                    anyhow::anyhow!(
                        "event type mismatch for '{}'",
                        std::any::type_name::<E>()
                    )
                })?;
                handler.handle(*event).await
            });
            Ok(invocation)
        });

        self.events.push(EventRegistration {
            event: TypeKey::of::<E>(),
            event_name: std::any::type_name::<E>(),
            handler: TypeKey::of::<H>(),
            handler_provider: injectable::<H>(ProviderScope::Request).build(),
            invoke,
        });
        self
    }
}

impl Default for MediatorExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for MediatorExtension {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl OnModuleDiscover for MediatorExtension {}

/// Continues a [`MediatorExtension`] after `bind_request`, typed to the
/// request so behaviors check against it.
pub struct RequestBindingBuilder<R: Request> {
    extension: MediatorExtension,
    registration: RequestRegistration,
    _marker: PhantomData<fn(&R)>,
}

impl<R: Request> RequestBindingBuilder<R> {
    /// Attach a per-request pipeline behavior. Declaration order is
    /// execution order, after every global behavior.
    pub fn with_behavior<B>(mut self) -> Self
    where
        B: PipelineBehavior<R> + Inject,
    {
        let wrap: WrapFn = Arc::new(move |resolver: &Resolver<'_>, inner: ErasedStage| {
            let behavior = resolver.resolve::<B>().map_err(MediatorError::from)?;
            Ok(Box::new(move |envelope: RequestEnvelope| -> PipelineFuture<ErasedMessage> {
                Box::pin(async move {
                    let (request, request_type, correlation_id) = envelope.split::<R>()?;
                    let next = Next::<R> {
                        stage: inner,
                        request_type,
                        correlation_id,
                        _marker: PhantomData,
                    };
                    let response = behavior.handle(request, next).await?;
                    Ok(Box::new(response) as ErasedMessage)
                })
            }) as ErasedStage)
        });

        self.registration.behaviors.push(BehaviorRegistration {
            behavior: TypeKey::of::<B>(),
            provider: injectable::<B>(ProviderScope::Request).build(),
            wrap,
        });
        self
    }

    /// Close this binding and open the next one.
    pub fn bind_request<R2, H2>(self) -> RequestBindingBuilder<R2>
    where
        R2: Request,
        H2: RequestHandler<R2> + Inject,
    {
        self.build().bind_request::<R2, H2>()
    }

    /// Close this binding and bind an event handler.
    pub fn bind_event<E, H>(self) -> MediatorExtension
    where
        E: Event,
        H: EventHandler<E> + Inject,
    {
        self.build().bind_event::<E, H>()
    }

    /// Close this binding and return the finished extension.
    pub fn build(mut self) -> MediatorExtension {
        self.extension.requests.push(self.registration);
        self.extension
    }
}
