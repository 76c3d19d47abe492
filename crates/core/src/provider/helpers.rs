//! Provider helpers: the declaration surface users write.
//!
//! Every helper reduces to the same [`Provider`] record; they only differ in
//! scope, caching and source defaults.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::Resolver;
use crate::errors::WakuError;
use crate::provider::activation::Predicate;
use crate::provider::descriptor::{CoerceFn, FactoryFn, Provider, ProviderBuilder, ProviderScope};
use crate::provider::{Inject, ServiceInstance, TypeKey};

/// APP scope, cached: one instance for the whole application lifetime.
pub fn singleton<I, F>(factory: F) -> ProviderBuilder<I>
where
    I: ?Sized + Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> Result<Arc<I>, WakuError> + Send + Sync + 'static,
{
    ProviderBuilder::from_factory(ProviderScope::App, true, factory)
}

/// REQUEST scope, cached: one instance per scope entry.
pub fn scoped<I, F>(factory: F) -> ProviderBuilder<I>
where
    I: ?Sized + Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> Result<Arc<I>, WakuError> + Send + Sync + 'static,
{
    ProviderBuilder::from_factory(ProviderScope::Request, true, factory)
}

/// REQUEST scope, uncached: a fresh instance on every resolution.
pub fn transient<I, F>(factory: F) -> ProviderBuilder<I>
where
    I: ?Sized + Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> Result<Arc<I>, WakuError> + Send + Sync + 'static,
{
    ProviderBuilder::from_factory(ProviderScope::Request, false, factory)
}

/// APP scope, pre-built instance.
pub fn object<I>(instance: Arc<I>) -> ProviderBuilder<I>
where
    I: ?Sized + Send + Sync + 'static,
{
    ProviderBuilder::from_instance(instance)
}

/// Resolves from the externally supplied context map at scope entry instead of
/// constructing.
pub fn contextual<T>(scope: ProviderScope) -> ProviderBuilder<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    ProviderBuilder::contextual(scope)
}

/// Constructor injection for a concrete type: the factory is
/// [`Inject::inject`] and the dependency list is [`Inject::dependencies`].
pub fn injectable<T: Inject>(scope: ProviderScope) -> ProviderBuilder<T> {
    let mut builder =
        ProviderBuilder::<T>::from_factory(scope, true, |resolver| T::inject(resolver).map(Arc::new));
    for dependency in T::dependencies() {
        builder = builder.depends_on_key(dependency);
    }
    builder
}

/// Multi-binding: register several implementations of one interface, plus an
/// optional collector that resolves the whole group as `Vec<Arc<I>>`.
pub fn many<I>() -> MultiBinding<I>
where
    I: ?Sized + Send + Sync + 'static,
{
    MultiBinding {
        scope: ProviderScope::App,
        cached: true,
        collect: true,
        activation: None,
        elements: Vec::new(),
        _interface: PhantomData,
    }
}

pub struct MultiBinding<I: ?Sized + 'static> {
    scope: ProviderScope,
    cached: bool,
    collect: bool,
    activation: Option<Predicate>,
    elements: Vec<MultiElement>,
    _interface: PhantomData<fn(&I)>,
}

struct MultiElement {
    key: TypeKey,
    implementation: &'static str,
    factory: FactoryFn,
    coerce: CoerceFn,
}

impl<I: ?Sized + Send + Sync + 'static> MultiBinding<I> {
    /// Register one implementation. The element stays individually resolvable
    /// under its own type; the coercion closure lifts it to the group
    /// interface: `.add(|_| Ok(Arc::new(AuthPlugin)), |p| p)`.
    pub fn add<T, F, C>(mut self, factory: F, coerce: C) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, WakuError> + Send + Sync + 'static,
        C: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let lift: CoerceFn = Arc::new(move |instance: ServiceInstance| {
            let value = instance.extract::<T>().ok_or(WakuError::TypeMismatch {
                type_name: std::any::type_name::<T>(),
            })?;
            Ok(ServiceInstance::new(coerce(value)))
        });
        self.elements.push(MultiElement {
            key: TypeKey::of::<T>(),
            implementation: std::any::type_name::<T>(),
            factory: Arc::new(move |resolver| factory(resolver).map(ServiceInstance::new)),
            coerce: lift,
        });
        self
    }

    pub fn scope(mut self, scope: ProviderScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// When false, only the individual registrations are emitted.
    pub fn collect(mut self, collect: bool) -> Self {
        self.collect = collect;
        self
    }

    pub fn when(mut self, predicate: Predicate) -> Self {
        self.activation = Some(predicate);
        self
    }

    /// Expand into provider records: one per element, and one collector when
    /// collecting is enabled.
    pub fn build(self) -> Vec<Provider> {
        let mut providers = Vec::with_capacity(self.elements.len() + 1);
        let mut collector_elements = Vec::with_capacity(self.elements.len());

        for element in self.elements {
            collector_elements.push((element.key, element.coerce));
            providers.push(Provider {
                interface: element.key,
                aliases: Vec::new(),
                implementation: element.implementation,
                scope: self.scope,
                cached: self.cached,
                dependencies: Vec::new(),
                activation: self.activation.clone(),
                is_override: false,
                source: crate::provider::descriptor::ProviderSource::Factory(element.factory),
                finalizer: None,
            });
        }

        if self.collect {
            let dependencies: Vec<TypeKey> =
                collector_elements.iter().map(|(key, _)| *key).collect();
            providers.push(Provider {
                interface: TypeKey::of::<Vec<Arc<I>>>(),
                aliases: Vec::new(),
                implementation: std::any::type_name::<Vec<Arc<I>>>(),
                scope: self.scope,
                cached: self.cached,
                dependencies,
                activation: self.activation,
                is_override: false,
                source: crate::provider::descriptor::ProviderSource::Collector {
                    elements: collector_elements,
                    assemble: Arc::new(|instances: Vec<ServiceInstance>| {
                        let mut values = Vec::with_capacity(instances.len());
                        for instance in instances {
                            values.push(instance.extract::<I>().ok_or(
                                WakuError::TypeMismatch {
                                    type_name: std::any::type_name::<I>(),
                                },
                            )?);
                        }
                        Ok(ServiceInstance::new(Arc::new(values)))
                    }),
                },
                finalizer: None,
            });
        }

        providers
    }
}

impl<I: ?Sized + Send + Sync + 'static> From<MultiBinding<I>> for Vec<Provider> {
    fn from(binding: MultiBinding<I>) -> Self {
        binding.build()
    }
}
