use std::fmt;
use std::sync::Arc;

use crate::extensions::Extension;
use crate::modules::dynamic::{ModuleDef, ModuleRef};
use crate::provider::{Activator, Provider, TypeKey};

/// What a module makes visible to its importers: a single provider interface,
/// or a whole module (forwarding that module's exports transitively).
#[derive(Clone)]
pub enum Export {
    Type(TypeKey),
    Module(ModuleRef),
}

impl Export {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeKey::of::<T>())
    }

    pub fn module<M: ModuleDef>() -> Self {
        Self::Module(ModuleRef::of::<M>())
    }

    pub fn module_ref(module: ModuleRef) -> Self {
        Self::Module(module)
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(key) => write!(f, "Export::Type({key})"),
            Self::Module(module) => write!(f, "Export::Module({})", module.name()),
        }
    }
}

/// Per-module, pre-compilation bag of declarations.
///
/// Mutable until the registry builder compiles it into a [`crate::modules::Module`];
/// `OnModuleConfigure` hooks receive it by `&mut` during metadata extraction.
#[derive(Clone)]
pub struct ModuleMetadata {
    pub(crate) name: &'static str,
    pub(crate) providers: Vec<Provider>,
    pub(crate) activators: Vec<Activator>,
    pub(crate) imports: Vec<ModuleRef>,
    pub(crate) exports: Vec<Export>,
    pub(crate) extensions: Vec<Arc<dyn Extension>>,
    pub(crate) is_global: bool,
}

impl ModuleMetadata {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            providers: Vec::new(),
            activators: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            extensions: Vec::new(),
            is_global: false,
        }
    }

    // --- fluent declaration surface -------------------------------------

    pub fn with_provider(mut self, provider: impl Into<Provider>) -> Self {
        self.providers.push(provider.into());
        self
    }

    pub fn with_providers(mut self, providers: impl Into<Vec<Provider>>) -> Self {
        self.providers.extend(providers.into());
        self
    }

    pub fn with_activator(mut self, activator: Activator) -> Self {
        self.activators.push(activator);
        self
    }

    pub fn import<M: ModuleDef>(self) -> Self {
        self.import_ref(ModuleRef::of::<M>())
    }

    pub fn import_ref(mut self, module: ModuleRef) -> Self {
        self.imports.push(module);
        self
    }

    /// Re-export a provider interface to importers.
    pub fn export<T: ?Sized + 'static>(mut self) -> Self {
        self.exports.push(Export::of::<T>());
        self
    }

    /// Re-export an entire imported module, forwarding its exports.
    pub fn export_module<M: ModuleDef>(mut self) -> Self {
        self.exports.push(Export::module::<M>());
        self
    }

    pub fn export_module_ref(mut self, module: ModuleRef) -> Self {
        self.exports.push(Export::module_ref(module));
        self
    }

    pub fn with_extension(self, extension: impl Extension) -> Self {
        self.with_extension_arc(Arc::new(extension))
    }

    pub fn with_extension_arc(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Make this module's exports visible everywhere without explicit import.
    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }

    // --- mutation surface for configure hooks ---------------------------

    pub fn add_provider(&mut self, provider: impl Into<Provider>) {
        self.providers.push(provider.into());
    }

    pub fn add_import(&mut self, module: ModuleRef) {
        self.imports.push(module);
    }

    pub fn add_export(&mut self, export: Export) {
        self.exports.push(export);
    }

    // --- accessors ------------------------------------------------------

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn activators(&self) -> &[Activator] {
        &self.activators
    }

    pub fn imports(&self) -> &[ModuleRef] {
        &self.imports
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    pub fn is_global(&self) -> bool {
        self.is_global
    }
}

impl fmt::Debug for ModuleMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleMetadata")
            .field("name", &self.name)
            .field("providers", &self.providers.len())
            .field("imports", &self.imports.len())
            .field("exports", &self.exports.len())
            .field("extensions", &self.extensions.len())
            .field("is_global", &self.is_global)
            .finish()
    }
}
