use std::sync::{Arc, Mutex, RwLock, Weak};

use uuid::Uuid;

use crate::container::composer::{Registration, RegistrationKind, RegistrationMap};
use crate::context::Context;
use crate::errors::WakuError;
use crate::provider::{
    DisposeFn, Provider, ProviderScope, ProviderSource, ServiceInstance, TypeKey,
};

/// Shared state behind both the APP container and request scopes.
///
/// The registration map is shared between parent and children; each level has
/// its own cache, context and finalizer stack.
pub(crate) struct ContainerCore {
    scope_id: Uuid,
    registrations: Arc<RwLock<RegistrationMap>>,
    parent: Option<Arc<ContainerCore>>,
    cache: RwLock<std::collections::HashMap<TypeKey, ServiceInstance>>,
    context: RwLock<Context>,
    finalizers: Mutex<Vec<(ServiceInstance, DisposeFn)>>,
}

impl ContainerCore {
    fn app(registrations: RegistrationMap, context: Context) -> Self {
        Self {
            scope_id: Uuid::new_v4(),
            registrations: Arc::new(RwLock::new(registrations)),
            parent: None,
            cache: RwLock::new(std::collections::HashMap::new()),
            context: RwLock::new(context),
            finalizers: Mutex::new(Vec::new()),
        }
    }

    fn child(parent: &Arc<ContainerCore>, context: Context) -> Self {
        Self {
            scope_id: Uuid::new_v4(),
            registrations: parent.registrations.clone(),
            parent: Some(parent.clone()),
            cache: RwLock::new(std::collections::HashMap::new()),
            context: RwLock::new(context),
            finalizers: Mutex::new(Vec::new()),
        }
    }

    fn is_app_scope(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn resolve_key(
        self: &Arc<Self>,
        key: &TypeKey,
    ) -> Result<ServiceInstance, WakuError> {
        let registration = self
            .registrations
            .read()
            .map_err(|_| WakuError::Lock {
                resource: "container registrations",
            })?
            .get(key)
            .cloned();
        let Some(registration) = registration else {
            return Err(WakuError::ProviderNotFound {
                type_name: key.type_name(),
            });
        };

        match registration.provider.scope() {
            ProviderScope::App => match &self.parent {
                Some(parent) => parent.resolve_key(key),
                None => self.resolve_local(key, &registration),
            },
            ProviderScope::Request => {
                if self.is_app_scope() {
                    Err(WakuError::OutOfScope {
                        type_name: key.type_name(),
                    })
                } else {
                    self.resolve_local(key, &registration)
                }
            }
        }
    }

    fn resolve_local(
        self: &Arc<Self>,
        key: &TypeKey,
        registration: &Registration,
    ) -> Result<ServiceInstance, WakuError> {
        if registration.provider.is_cached() {
            let cached = self
                .cache
                .read()
                .map_err(|_| WakuError::Lock {
                    resource: "container cache",
                })?
                .get(key)
                .cloned();
            if let Some(instance) = cached {
                return Ok(instance);
            }
        }

        let instance = self.construct(key, registration)?;

        if let Some(finalizer) = &registration.provider.finalizer {
            self.finalizers
                .lock()
                .map_err(|_| WakuError::Lock {
                    resource: "container finalizers",
                })?
                .push((instance.clone(), finalizer.clone()));
        }
        if registration.provider.is_cached() {
            self.cache
                .write()
                .map_err(|_| WakuError::Lock {
                    resource: "container cache",
                })?
                .insert(*key, instance.clone());
        }
        Ok(instance)
    }

    fn construct(
        self: &Arc<Self>,
        key: &TypeKey,
        registration: &Registration,
    ) -> Result<ServiceInstance, WakuError> {
        match &registration.kind {
            RegistrationKind::Alias { target, coerce } => {
                let base = self.resolve_key(target)?;
                coerce(base)
            }
            RegistrationKind::Primary => match &registration.provider.source {
                ProviderSource::Factory(factory) => {
                    let resolver = Resolver { core: self };
                    factory(&resolver)
                }
                ProviderSource::Instance(instance) => Ok(instance.clone()),
                ProviderSource::Contextual => self
                    .context
                    .read()
                    .map_err(|_| WakuError::Lock {
                        resource: "container context",
                    })?
                    .get_raw(key)
                    .ok_or(WakuError::ContextMissing {
                        type_name: key.type_name(),
                        scope: registration.provider.scope().as_str(),
                    }),
                ProviderSource::Collector { elements, assemble } => {
                    let mut resolved = Vec::with_capacity(elements.len());
                    for (element, coerce) in elements {
                        resolved.push(coerce(self.resolve_key(element)?)?);
                    }
                    assemble(resolved)
                }
            },
        }
    }

    fn context_lookup(&self, key: &TypeKey) -> Option<ServiceInstance> {
        let local = self.context.read().ok()?.get_raw(key);
        match local {
            Some(instance) => Some(instance),
            None => self.parent.as_ref()?.context_lookup(key),
        }
    }

    /// Drain the finalizer stack LIFO. Runs on every exit path.
    fn run_finalizers(&self) {
        let drained = match self.finalizers.lock() {
            Ok(mut stack) => std::mem::take(&mut *stack),
            Err(_) => return,
        };
        for (instance, finalizer) in drained.into_iter().rev() {
            finalizer(instance);
        }
    }
}

/// The factory-facing handle: what a provider factory receives to resolve its
/// dependencies from the current scope.
pub struct Resolver<'a> {
    core: &'a Arc<ContainerCore>,
}

impl<'a> Resolver<'a> {
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, WakuError> {
        let key = TypeKey::of::<T>();
        let instance = self.core.resolve_key(&key)?;
        instance.extract::<T>().ok_or(WakuError::TypeMismatch {
            type_name: key.type_name(),
        })
    }

    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resolve::<T>().ok()
    }

    /// Read a context entry, searching the request context first and falling
    /// back to the APP context.
    pub fn context<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.core
            .context_lookup(&TypeKey::of::<T>())
            .and_then(|instance| instance.extract::<T>())
    }

    /// A weak handle to the current scope, for services that resolve lazily
    /// after construction. Does not keep the scope alive.
    pub fn scope_handle(&self) -> ScopeHandle {
        ScopeHandle(Arc::downgrade(self.core))
    }
}

/// Weak reference to a scope; upgrade with [`ScopeHandle::access`].
#[derive(Clone)]
pub struct ScopeHandle(Weak<ContainerCore>);

impl ScopeHandle {
    pub fn access(&self) -> Result<ScopeAccess, WakuError> {
        self.0
            .upgrade()
            .map(|core| ScopeAccess { core })
            .ok_or(WakuError::ScopeClosed)
    }
}

/// Strong, short-lived access to a scope obtained from a [`ScopeHandle`].
pub struct ScopeAccess {
    core: Arc<ContainerCore>,
}

impl ScopeAccess {
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver { core: &self.core }
    }
}

/// The root (APP-scope) container.
///
/// Built once by the factory from the composed registration map; lives until
/// application shutdown, when its finalizers run in reverse creation order.
#[derive(Clone)]
pub struct AppContainer {
    core: Arc<ContainerCore>,
}

impl AppContainer {
    pub(crate) fn new(registrations: RegistrationMap, context: Context) -> Self {
        Self {
            core: Arc::new(ContainerCore::app(registrations, context)),
        }
    }

    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, WakuError> {
        Resolver { core: &self.core }.resolve::<T>()
    }

    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Resolver { core: &self.core }.try_resolve::<T>()
    }

    pub fn context<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Resolver { core: &self.core }.context::<T>()
    }

    /// Enter a request scope with an empty request context.
    pub fn scope(&self) -> RequestScope {
        self.scope_with(Context::new())
    }

    /// Enter a request scope, supplying the REQUEST-level context map.
    pub fn scope_with(&self, context: Context) -> RequestScope {
        RequestScope {
            core: Arc::new(ContainerCore::child(&self.core, context)),
        }
    }

    pub(crate) fn run_finalizers(&self) {
        self.core.run_finalizers();
    }

    // --- testing seams --------------------------------------------------

    /// Swap in a replacement provider, returning a token that restores the
    /// previous registration and evicts anything it cached. Testing support;
    /// production code composes providers through modules.
    pub fn install_override(&self, provider: Provider) -> Result<OverrideToken, WakuError> {
        let mut registrations = self.core.registrations.write().map_err(|_| WakuError::Lock {
            resource: "container registrations",
        })?;
        let mut cache = self.core.cache.write().map_err(|_| WakuError::Lock {
            resource: "container cache",
        })?;

        let mut entries = Vec::new();
        let primary = provider.interface();
        let aliases: Vec<_> = provider.aliases.clone();

        let previous = registrations.insert(
            primary,
            Registration {
                provider: provider.clone(),
                owner_name: "override",
                kind: RegistrationKind::Primary,
            },
        );
        entries.push((primary, previous, cache.remove(&primary)));

        for (alias, coerce) in aliases {
            let previous = registrations.insert(
                alias,
                Registration {
                    provider: provider.clone(),
                    owner_name: "override",
                    kind: RegistrationKind::Alias {
                        target: primary,
                        coerce,
                    },
                },
            );
            entries.push((alias, previous, cache.remove(&alias)));
        }

        Ok(OverrideToken { entries })
    }

    /// Undo an [`install_override`](Self::install_override).
    pub fn restore_override(&self, token: OverrideToken) -> Result<(), WakuError> {
        let mut registrations = self.core.registrations.write().map_err(|_| WakuError::Lock {
            resource: "container registrations",
        })?;
        let mut cache = self.core.cache.write().map_err(|_| WakuError::Lock {
            resource: "container cache",
        })?;
        for (key, previous_registration, previous_cache) in token.entries.into_iter().rev() {
            match previous_registration {
                Some(registration) => {
                    registrations.insert(key, registration);
                }
                None => {
                    registrations.remove(&key);
                }
            }
            match previous_cache {
                Some(instance) => {
                    cache.insert(key, instance);
                }
                None => {
                    cache.remove(&key);
                }
            }
        }
        Ok(())
    }

    /// Merge entries into the APP context, returning a token that restores
    /// the previous map.
    pub fn override_context(&self, entries: Context) -> Result<ContextToken, WakuError> {
        let mut context = self.core.context.write().map_err(|_| WakuError::Lock {
            resource: "container context",
        })?;
        let previous = context.clone();
        context.merge(entries);
        Ok(ContextToken { previous })
    }

    pub fn restore_context(&self, token: ContextToken) -> Result<(), WakuError> {
        let mut context = self.core.context.write().map_err(|_| WakuError::Lock {
            resource: "container context",
        })?;
        *context = token.previous;
        Ok(())
    }
}

/// Restores the registrations an override displaced.
pub struct OverrideToken {
    entries: Vec<(TypeKey, Option<Registration>, Option<ServiceInstance>)>,
}

/// Restores the APP context an override displaced.
pub struct ContextToken {
    previous: Context,
}

/// A child resolution scope; the typical lifetime is one request.
///
/// Dropping the scope finalizes every instance it created, LIFO, whether the
/// exit was normal or exceptional.
pub struct RequestScope {
    core: Arc<ContainerCore>,
}

impl RequestScope {
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, WakuError> {
        Resolver { core: &self.core }.resolve::<T>()
    }

    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Resolver { core: &self.core }.try_resolve::<T>()
    }

    pub fn context<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Resolver { core: &self.core }.context::<T>()
    }

    pub fn id(&self) -> Uuid {
        self.core.scope_id
    }

    /// Exit the scope, running finalizers LIFO. Equivalent to dropping it.
    pub fn close(self) {}
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.core.run_finalizers();
    }
}
