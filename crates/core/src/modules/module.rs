use std::fmt;
use std::sync::Arc;

use crate::extensions::Extension;
use crate::modules::dynamic::ModuleId;
use crate::modules::metadata::{Export, ModuleMetadata};
use crate::provider::{Activator, Provider, TypeKey};

/// A compiled, immutable module.
///
/// Produced by the registry builder once every configure and registration
/// hook has run; nothing mutates it afterwards.
pub struct Module {
    id: ModuleId,
    name: &'static str,
    metadata: ModuleMetadata,
    imports: Vec<ModuleId>,
    exported_modules: Vec<ModuleId>,
    is_global: bool,
}

impl Module {
    pub(crate) fn new(
        id: ModuleId,
        metadata: ModuleMetadata,
        imports: Vec<ModuleId>,
        is_global: bool,
    ) -> Self {
        let exported_modules = metadata
            .exports()
            .iter()
            .filter_map(|export| match export {
                Export::Module(module) => Some(module.id()),
                Export::Type(_) => None,
            })
            .collect();
        Self {
            id,
            name: metadata.name(),
            metadata,
            imports,
            exported_modules,
            is_global,
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn providers(&self) -> &[Provider] {
        self.metadata.providers()
    }

    pub fn activators(&self) -> &[Activator] {
        self.metadata.activators()
    }

    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        self.metadata.extensions()
    }

    /// Resolved direct imports, in declaration order.
    pub fn imports(&self) -> &[ModuleId] {
        &self.imports
    }

    pub fn exports(&self) -> &[Export] {
        self.metadata.exports()
    }

    /// Modules re-exported wholesale, forwarding their exports to importers.
    pub fn exported_modules(&self) -> &[ModuleId] {
        &self.exported_modules
    }

    pub fn is_global(&self) -> bool {
        self.is_global
    }

    /// Whether a provider for the interface is declared here (including alias
    /// bindings).
    pub fn provides(&self, key: &TypeKey) -> bool {
        self.providers().iter().any(|provider| {
            provider.interface() == *key
                || provider.aliases.iter().any(|(alias, _)| alias == key)
        })
    }

    /// Whether the interface appears in this module's type exports.
    pub fn exports_type(&self, key: &TypeKey) -> bool {
        self.exports().iter().any(|export| match export {
            Export::Type(exported) => exported == key,
            Export::Module(_) => false,
        })
    }

    /// Whether the interface is declared here as a contextual provider.
    pub fn declares_context(&self, key: &TypeKey) -> bool {
        self.providers()
            .iter()
            .any(|provider| provider.is_contextual() && provider.interface() == *key)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("providers", &self.providers().len())
            .field("imports", &self.imports.len())
            .field("global", &self.is_global)
            .finish()
    }
}
