pub mod activation;
mod descriptor;
pub mod helpers;
mod inject;
mod key;

pub use activation::{activator, Activator, Predicate};
pub use descriptor::{Provider, ProviderBuilder, ProviderScope};
pub use helpers::{
    contextual, injectable, many, object, scoped, singleton, transient, MultiBinding,
};
pub use inject::Inject;
pub use key::{ServiceInstance, TypeKey};

pub(crate) use descriptor::{CoerceFn, DisposeFn, ProviderSource};
