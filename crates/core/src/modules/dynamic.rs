use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::errors::WakuError;
use crate::extensions::Extension;
use crate::modules::metadata::{Export, ModuleMetadata};
use crate::provider::{Activator, Provider};

/// Static module declaration: a type whose associated function yields the
/// module's metadata. The type itself is only an identity; all content lives
/// in the returned [`ModuleMetadata`].
pub trait ModuleDef: 'static {
    fn metadata() -> ModuleMetadata;
}

/// Stable module identity.
///
/// Static modules are identified by their declaring type. Dynamic modules get
/// a fresh identity at construction, so two builds of equal content are still
/// two distinct modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleId {
    Static(TypeId),
    Dynamic(Uuid),
}

/// A reference to a module: either a [`ModuleDef`] type or a dynamic record.
#[derive(Clone)]
pub struct ModuleRef {
    kind: RefKind,
}

#[derive(Clone)]
enum RefKind {
    Static {
        target: TypeId,
        name: &'static str,
        metadata: fn() -> ModuleMetadata,
    },
    Dynamic(Arc<DynamicModule>),
}

impl ModuleRef {
    pub fn of<M: ModuleDef>() -> Self {
        Self {
            kind: RefKind::Static {
                target: TypeId::of::<M>(),
                name: short_type_name::<M>(),
                metadata: M::metadata,
            },
        }
    }

    pub fn dynamic(module: DynamicModule) -> Self {
        Self {
            kind: RefKind::Dynamic(Arc::new(module)),
        }
    }

    pub fn id(&self) -> ModuleId {
        match &self.kind {
            RefKind::Static { target, .. } => ModuleId::Static(*target),
            RefKind::Dynamic(module) => ModuleId::Dynamic(module.id),
        }
    }

    pub fn name(&self) -> &'static str {
        match &self.kind {
            RefKind::Static { name, .. } => name,
            RefKind::Dynamic(module) => module.metadata.name(),
        }
    }

    /// Materialize the metadata and run its `OnModuleConfigure` hooks. Hook
    /// failures are wrapped with the owning module's identity.
    pub(crate) fn extract_metadata(&self) -> Result<ModuleMetadata, WakuError> {
        let mut metadata = match &self.kind {
            RefKind::Static { metadata, .. } => metadata(),
            RefKind::Dynamic(module) => module.metadata.clone(),
        };
        let extensions = metadata.extensions.clone();
        for extension in extensions {
            if let Some(hook) = extension.as_configure() {
                hook.on_module_configure(&mut metadata).map_err(|source| {
                    WakuError::extension(self.name(), "OnModuleConfigure", source)
                })?;
            }
        }
        Ok(metadata)
    }
}

impl PartialEq for ModuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ModuleRef {}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RefKind::Static { name, .. } => write!(f, "ModuleRef({name})"),
            RefKind::Dynamic(module) => {
                write!(f, "ModuleRef({}#{})", module.metadata.name(), module.id)
            }
        }
    }
}

/// A module assembled at runtime rather than declared as a type.
///
/// Each construction yields a logically distinct module, even when the
/// contents are equal; reuse the same record (clone the [`ModuleRef`]) to
/// reference one module from several importers.
pub struct DynamicModule {
    id: Uuid,
    metadata: ModuleMetadata,
}

impl DynamicModule {
    pub fn new(name: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata: ModuleMetadata::new(name),
        }
    }

    pub fn from_metadata(metadata: ModuleMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<Provider>) -> Self {
        self.metadata = self.metadata.with_provider(provider);
        self
    }

    pub fn with_providers(mut self, providers: impl Into<Vec<Provider>>) -> Self {
        self.metadata = self.metadata.with_providers(providers);
        self
    }

    pub fn with_activator(mut self, activator: Activator) -> Self {
        self.metadata = self.metadata.with_activator(activator);
        self
    }

    pub fn import<M: ModuleDef>(mut self) -> Self {
        self.metadata = self.metadata.import::<M>();
        self
    }

    pub fn import_ref(mut self, module: ModuleRef) -> Self {
        self.metadata = self.metadata.import_ref(module);
        self
    }

    pub fn export<T: ?Sized + 'static>(mut self) -> Self {
        self.metadata = self.metadata.export::<T>();
        self
    }

    pub fn export_module<M: ModuleDef>(mut self) -> Self {
        self.metadata = self.metadata.export_module::<M>();
        self
    }

    pub fn add_export(mut self, export: Export) -> Self {
        self.metadata.add_export(export);
        self
    }

    pub fn with_extension(mut self, extension: impl Extension) -> Self {
        self.metadata = self.metadata.with_extension(extension);
        self
    }

    pub fn with_extension_arc(mut self, extension: Arc<dyn Extension>) -> Self {
        self.metadata = self.metadata.with_extension_arc(extension);
        self
    }

    pub fn global(mut self) -> Self {
        self.metadata = self.metadata.global();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }
}

impl fmt::Debug for DynamicModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamicModule({}#{})", self.metadata.name(), self.id)
    }
}

pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OrdersModule;

    impl ModuleDef for OrdersModule {
        fn metadata() -> ModuleMetadata {
            ModuleMetadata::new("OrdersModule")
        }
    }

    #[test]
    fn static_refs_to_same_type_are_equal() {
        assert_eq!(ModuleRef::of::<OrdersModule>(), ModuleRef::of::<OrdersModule>());
    }

    #[test]
    fn two_dynamic_constructions_are_distinct_modules() {
        let a = ModuleRef::dynamic(DynamicModule::new("DbModule"));
        let b = ModuleRef::dynamic(DynamicModule::new("DbModule"));
        assert_ne!(a, b);

        // ...while cloning the reference keeps the identity.
        assert_eq!(a, a.clone());
    }

    #[test]
    fn short_name_strips_path() {
        assert_eq!(short_type_name::<OrdersModule>(), "OrdersModule");
    }
}
