use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use async_trait::async_trait;
use uuid::Uuid;

/// An immutable message with exactly one handler, keyed by its concrete type.
pub trait Request: Send + Sync + 'static {
    type Response: Send + 'static;
}

/// An immutable fan-out message: zero or more handlers, none returns a value.
///
/// `Clone` lets the grouped publisher hand each handler its own copy on an
/// owned task.
pub trait Event: Clone + Send + Sync + 'static {}

#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: R) -> anyhow::Result<R::Response>;
}

#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync + 'static {
    async fn handle(&self, event: E) -> anyhow::Result<()>;
}

/// Type-erased message moving through an erased pipeline stage.
pub type ErasedMessage = Box<dyn Any + Send>;

/// Boxed future every pipeline stage returns.
pub type PipelineFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

/// One fully-built stage of the dispatch chain.
pub(crate) type ErasedStage =
    Box<dyn FnOnce(RequestEnvelope) -> PipelineFuture<ErasedMessage> + Send>;

/// The erased request plus its dispatch metadata, carried through the chain
/// so every stage sees the same correlation id.
pub struct RequestEnvelope {
    message: ErasedMessage,
    request_type: &'static str,
    correlation_id: Uuid,
}

impl RequestEnvelope {
    pub(crate) fn new<R: Request>(request: R, correlation_id: Uuid) -> Self {
        Self {
            message: Box::new(request),
            request_type: std::any::type_name::<R>(),
            correlation_id,
        }
    }

    pub fn request_type(&self) -> &'static str {
        self.request_type
    }

    /// Correlation identifier for this dispatch, fresh per `send`.
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Peek at the typed request without consuming the envelope.
    pub fn downcast_ref<R: Request>(&self) -> Option<&R> {
        self.message.downcast_ref::<R>()
    }

    pub(crate) fn split<R: Request>(self) -> anyhow::Result<(R, &'static str, Uuid)> {
        let Self {
            message,
            request_type,
            correlation_id,
        } = self;
        let request = message.downcast::<R>().map_err(|_| {
            anyhow::anyhow!("request type mismatch in pipeline for '{request_type}'")
        })?;
        Ok((*request, request_type, correlation_id))
    }
}

/// The rest of the typed pipeline, handed to a [`PipelineBehavior`].
pub struct Next<R: Request> {
    pub(crate) stage: ErasedStage,
    pub(crate) request_type: &'static str,
    pub(crate) correlation_id: Uuid,
    pub(crate) _marker: PhantomData<fn(&R)>,
}

impl<R: Request> Next<R> {
    /// Run the remaining stages with the given request.
    pub async fn run(self, request: R) -> anyhow::Result<R::Response> {
        let envelope = RequestEnvelope {
            message: Box::new(request),
            request_type: self.request_type,
            correlation_id: self.correlation_id,
        };
        let output = (self.stage)(envelope).await?;
        output.downcast::<R::Response>().map(|boxed| *boxed).map_err(|_| {
            anyhow::anyhow!(
                "response type mismatch in pipeline for '{}'",
                self.request_type
            )
        })
    }
}

/// Middleware around one request type's handler.
///
/// A behavior calls `next.run(request)` exactly once; not calling it is a
/// deliberate short-circuit and is legal: the tail of the chain, including
/// the handler, never runs in that case.
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: R, next: Next<R>) -> anyhow::Result<R::Response>;
}

/// The rest of the erased pipeline, handed to a [`GlobalBehavior`].
pub struct EnvelopeNext {
    pub(crate) stage: ErasedStage,
}

impl EnvelopeNext {
    pub async fn run(self, envelope: RequestEnvelope) -> anyhow::Result<ErasedMessage> {
        (self.stage)(envelope).await
    }
}

/// Middleware applied to every request type. Written against the erased
/// envelope since the concrete type is only known per binding.
#[async_trait]
pub trait GlobalBehavior: Send + Sync + 'static {
    async fn handle(
        &self,
        envelope: RequestEnvelope,
        next: EnvelopeNext,
    ) -> anyhow::Result<ErasedMessage>;
}
