use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::Resolver;
use crate::errors::WakuError;
use crate::provider::activation::Predicate;
use crate::provider::{ServiceInstance, TypeKey};

/// Provider lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProviderScope {
    /// Lifetime = from container build until application shutdown
    App,
    /// Lifetime = one child scope entry
    Request,
}

impl ProviderScope {
    pub fn is_app(&self) -> bool {
        matches!(self, ProviderScope::App)
    }

    pub fn is_request(&self) -> bool {
        matches!(self, ProviderScope::Request)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderScope::App => "app",
            ProviderScope::Request => "request",
        }
    }
}

impl fmt::Display for ProviderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) type FactoryFn =
    Arc<dyn Fn(&Resolver<'_>) -> Result<ServiceInstance, WakuError> + Send + Sync>;

pub(crate) type CoerceFn =
    Arc<dyn Fn(ServiceInstance) -> Result<ServiceInstance, WakuError> + Send + Sync>;

pub(crate) type DisposeFn = Arc<dyn Fn(ServiceInstance) + Send + Sync>;

pub(crate) type AssembleFn =
    Arc<dyn Fn(Vec<ServiceInstance>) -> Result<ServiceInstance, WakuError> + Send + Sync>;

/// Where a provider's value comes from.
#[derive(Clone)]
pub(crate) enum ProviderSource {
    /// Construct by calling a factory with the current scope's resolver.
    Factory(FactoryFn),
    /// A pre-built instance.
    Instance(ServiceInstance),
    /// Project the matching entry out of a context map at resolution time.
    Contextual,
    /// Resolve every element key and assemble the collection value.
    Collector {
        elements: Vec<(TypeKey, CoerceFn)>,
        assemble: AssembleFn,
    },
}

impl ProviderSource {
    fn kind(&self) -> &'static str {
        match self {
            Self::Factory(_) => "factory",
            Self::Instance(_) => "instance",
            Self::Contextual => "contextual",
            Self::Collector { .. } => "collector",
        }
    }
}

/// Declarative record describing one injectable value.
///
/// Built through [`ProviderBuilder`]; the helper functions in
/// [`crate::provider::helpers`] are the surface users normally write.
#[derive(Clone)]
pub struct Provider {
    pub(crate) interface: TypeKey,
    pub(crate) aliases: Vec<(TypeKey, CoerceFn)>,
    pub(crate) implementation: &'static str,
    pub(crate) scope: ProviderScope,
    pub(crate) cached: bool,
    pub(crate) dependencies: Vec<TypeKey>,
    pub(crate) activation: Option<Predicate>,
    pub(crate) is_override: bool,
    pub(crate) source: ProviderSource,
    pub(crate) finalizer: Option<DisposeFn>,
}

impl Provider {
    pub fn interface(&self) -> TypeKey {
        self.interface
    }

    pub fn scope(&self) -> ProviderScope {
        self.scope
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn is_override(&self) -> bool {
        self.is_override
    }

    pub fn dependencies(&self) -> &[TypeKey] {
        &self.dependencies
    }

    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    pub(crate) fn is_contextual(&self) -> bool {
        matches!(self.source, ProviderSource::Contextual)
    }

    /// Flag this provider to replace an earlier registration of the same
    /// interface instead of conflicting.
    pub fn with_override(mut self) -> Self {
        self.is_override = true;
        self
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("interface", &self.interface)
            .field("implementation", &self.implementation)
            .field("source", &self.source.kind())
            .field("scope", &self.scope)
            .field("cached", &self.cached)
            .field("override", &self.is_override)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Builder for one provider record. `I` is the primary interface the value is
/// registered under.
pub struct ProviderBuilder<I: ?Sized + 'static> {
    provider: Provider,
    _interface: PhantomData<fn(&I)>,
}

impl<I: ?Sized + Send + Sync + 'static> ProviderBuilder<I> {
    pub(crate) fn from_factory<F>(scope: ProviderScope, cached: bool, factory: F) -> Self
    where
        F: Fn(&Resolver<'_>) -> Result<Arc<I>, WakuError> + Send + Sync + 'static,
    {
        Self::from_source(
            scope,
            cached,
            ProviderSource::Factory(Arc::new(move |resolver| {
                factory(resolver).map(ServiceInstance::new)
            })),
        )
    }

    pub(crate) fn from_instance(instance: Arc<I>) -> Self {
        Self::from_source(
            ProviderScope::App,
            true,
            ProviderSource::Instance(ServiceInstance::new(instance)),
        )
    }

    pub(crate) fn contextual(scope: ProviderScope) -> Self {
        Self::from_source(scope, true, ProviderSource::Contextual)
    }

    fn from_source(scope: ProviderScope, cached: bool, source: ProviderSource) -> Self {
        Self {
            provider: Provider {
                interface: TypeKey::of::<I>(),
                aliases: Vec::new(),
                implementation: std::any::type_name::<I>(),
                scope,
                cached,
                dependencies: Vec::new(),
                activation: None,
                is_override: false,
                source,
                finalizer: None,
            },
            _interface: PhantomData,
        }
    }

    /// Declare a dependency the factory resolves. The accessibility validator
    /// checks declared dependencies against the module import mesh.
    pub fn depends_on<D: ?Sized + 'static>(self) -> Self {
        self.depends_on_key(TypeKey::of::<D>())
    }

    pub(crate) fn depends_on_key(mut self, key: TypeKey) -> Self {
        self.provider.dependencies.push(key);
        self
    }

    pub fn cached(mut self, cached: bool) -> Self {
        self.provider.cached = cached;
        self
    }

    /// Attach an activation predicate, evaluated once at container build.
    pub fn when(mut self, predicate: Predicate) -> Self {
        self.provider.activation = Some(predicate);
        self
    }

    /// Replace an earlier registration of the same interface instead of
    /// conflicting.
    pub fn with_override(mut self) -> Self {
        self.provider.is_override = true;
        self
    }

    /// Register the same value under an additional interface. The coercion
    /// closure is where the unsize cast happens:
    /// `.provides::<dyn Writer>(|svc| svc)`.
    pub fn provides<I2, C>(mut self, coerce: C) -> Self
    where
        I2: ?Sized + Send + Sync + 'static,
        C: Fn(Arc<I>) -> Arc<I2> + Send + Sync + 'static,
    {
        let coerce: CoerceFn = Arc::new(move |instance: ServiceInstance| {
            let value = instance
                .extract::<I>()
                .ok_or(WakuError::TypeMismatch {
                    type_name: std::any::type_name::<I>(),
                })?;
            Ok(ServiceInstance::new(coerce(value)))
        });
        self.provider.aliases.push((TypeKey::of::<I2>(), coerce));
        self
    }

    /// Run teardown when the owning scope exits. Finalizers run LIFO on all
    /// exit paths, which is the two-phase (construct / finalize) factory shape.
    pub fn finalize<F>(mut self, teardown: F) -> Self
    where
        F: Fn(Arc<I>) + Send + Sync + 'static,
    {
        self.provider.finalizer = Some(Arc::new(move |instance: ServiceInstance| {
            if let Some(value) = instance.extract::<I>() {
                teardown(value);
            }
        }));
        self
    }

    pub fn build(self) -> Provider {
        self.provider
    }
}

impl<I: ?Sized + Send + Sync + 'static> From<ProviderBuilder<I>> for Provider {
    fn from(builder: ProviderBuilder<I>) -> Self {
        builder.build()
    }
}
