use crate::container::Resolver;
use crate::errors::WakuError;
use crate::provider::TypeKey;

/// Constructor injection for concrete types.
///
/// Implementors declare the interfaces they consume and build themselves from
/// a [`Resolver`]. The declared dependency list is what the accessibility
/// validator checks against the module import mesh, so it should name every
/// interface `inject` resolves.
///
/// ```
/// use std::sync::Arc;
/// use waku_core::container::Resolver;
/// use waku_core::provider::{Inject, TypeKey};
/// use waku_core::WakuError;
///
/// trait Logger: Send + Sync {}
///
/// struct UserService {
///     logger: Arc<dyn Logger>,
/// }
///
/// impl Inject for UserService {
///     fn dependencies() -> Vec<TypeKey> {
///         vec![TypeKey::of::<dyn Logger>()]
///     }
///
///     fn inject(resolver: &Resolver<'_>) -> Result<Self, WakuError> {
///         Ok(Self {
///             logger: resolver.resolve::<dyn Logger>()?,
///         })
///     }
/// }
/// ```
pub trait Inject: Sized + Send + Sync + 'static {
    /// Interfaces this type resolves during construction.
    fn dependencies() -> Vec<TypeKey> {
        Vec::new()
    }

    /// Build an instance, resolving dependencies from the current scope.
    fn inject(resolver: &Resolver<'_>) -> Result<Self, WakuError>;
}
