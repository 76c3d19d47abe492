//! # waku-mediator
//!
//! CQRS mediator for the waku framework: one handler per request type,
//! pipeline behaviors chained around it, and event fan-out under pluggable
//! publisher strategies.
//!
//! Modules declare their bindings with a [`MediatorExtension`]; the
//! application installs a [`MediatorAppExtension`], which aggregates every
//! module's bindings into one frozen registry during the registration phase
//! and provides the mediator through the container.

mod aggregator;
mod contracts;
mod errors;
mod events;
mod extension;
mod mediator;
mod registry;

pub use aggregator::{MediatorAppExtension, MediatorConfig};
pub use contracts::{
    EnvelopeNext, ErasedMessage, Event, EventHandler, GlobalBehavior, Next, PipelineBehavior,
    PipelineFuture, Request, RequestEnvelope, RequestHandler,
};
pub use errors::MediatorError;
pub use events::{ConcurrentPublisher, EventPublisher, SequentialPublisher};
pub use extension::{MediatorExtension, RequestBindingBuilder};
pub use mediator::{MediatorService, Publisher, Sender};
pub use registry::MediatorRegistry;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Event, EventHandler, MediatorAppExtension, MediatorConfig, MediatorError,
        MediatorExtension, MediatorService, Next, PipelineBehavior, Publisher, Request,
        RequestHandler, Sender,
    };
}
