mod composer;
#[allow(clippy::module_inception)]
mod container;

pub use container::{
    AppContainer, ContextToken, OverrideToken, RequestScope, Resolver, ScopeAccess, ScopeHandle,
};

pub(crate) use composer::{compose, RegistrationMap};
