//! # waku-core
//!
//! Structural core of the waku microframework: explicit module boundaries,
//! startup-time validation of the wiring graph, and a declarative
//! dependency-injection composition layer.
//!
//! The pipeline runs once, at startup: source modules are discovered
//! transitively from a composition root, configured, topologically sorted,
//! compiled into a frozen [`modules::ModuleRegistry`], flattened into a
//! scoped container, and validated, yielding a long-lived [`Application`].

mod application;
pub mod config;
pub mod container;
pub mod context;
pub mod errors;
pub mod extensions;
mod factory;
pub mod lifespan;
pub mod modules;
pub mod provider;
pub mod validation;

pub use application::Application;
pub use config::{ValidationPolicy, WakuConfiguration};
pub use context::Context;
pub use errors::WakuError;
pub use factory::WakuFactory;
pub use lifespan::Lifespan;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework information
pub const FRAMEWORK_NAME: &str = "waku";

/// Get framework version
pub fn version() -> &'static str {
    VERSION
}

/// Get framework name
pub fn name() -> &'static str {
    FRAMEWORK_NAME
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::container::{AppContainer, RequestScope, Resolver};
    pub use crate::context::Context;
    pub use crate::extensions::Extension;
    pub use crate::lifespan::Lifespan;
    pub use crate::modules::{DynamicModule, ModuleDef, ModuleMetadata, ModuleRef};
    pub use crate::provider::{
        activator, contextual, injectable, many, object, scoped, singleton, transient, Inject,
        Predicate, Provider, ProviderScope, TypeKey,
    };
    pub use crate::{Application, WakuError, WakuFactory};
}
