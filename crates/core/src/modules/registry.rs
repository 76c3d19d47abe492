use std::collections::HashMap;

use serde_json::json;

use crate::errors::WakuError;
use crate::modules::dynamic::ModuleId;
use crate::modules::metadata::Export;
use crate::modules::module::Module;

/// The frozen module registry: every compiled module in topological order
/// (leaves first, root last) plus an identity index.
///
/// Read-only after construction; the application shares it for its whole
/// lifetime.
pub struct ModuleRegistry {
    modules: Vec<Module>,
    by_id: HashMap<ModuleId, usize>,
}

impl ModuleRegistry {
    pub(crate) fn new(modules: Vec<Module>) -> Result<Self, WakuError> {
        let mut by_id = HashMap::with_capacity(modules.len());
        for (position, module) in modules.iter().enumerate() {
            if by_id.insert(module.id().clone(), position).is_some() {
                return Err(WakuError::DuplicateModule {
                    name: module.name().to_string(),
                });
            }
        }
        Ok(Self { modules, by_id })
    }

    /// Modules in topological order: every imported module precedes its
    /// importer, the root comes last.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn get(&self, id: &ModuleId) -> Option<&Module> {
        self.by_id.get(id).map(|position| &self.modules[*position])
    }

    /// The composition root.
    pub fn root(&self) -> &Module {
        self.modules.last().expect("registry is never empty")
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Find every extension of type `E` across the tree, in topological module
    /// order. This is the discover side of the discover + aggregate pattern.
    pub fn find_extensions<E: 'static>(&self) -> Vec<(&Module, &E)> {
        let mut found = Vec::new();
        for module in &self.modules {
            for extension in module.extensions() {
                if let Some(typed) = extension.as_any().downcast_ref::<E>() {
                    found.push((module, typed));
                }
            }
        }
        found
    }

    /// JSON rendering of the module graph for diagnostics.
    pub fn graph_dump(&self) -> serde_json::Value {
        let modules: Vec<_> = self
            .modules
            .iter()
            .map(|module| {
                let imports: Vec<_> = module
                    .imports()
                    .iter()
                    .filter_map(|id| self.get(id).map(|m| m.name()))
                    .collect();
                let providers: Vec<_> = module
                    .providers()
                    .iter()
                    .map(|provider| {
                        json!({
                            "interface": provider.interface().type_name(),
                            "scope": provider.scope().as_str(),
                            "cached": provider.is_cached(),
                        })
                    })
                    .collect();
                let exports: Vec<_> = module
                    .exports()
                    .iter()
                    .map(|export| match export {
                        Export::Type(key) => json!({ "type": key.type_name() }),
                        Export::Module(module) => json!({ "module": module.name() }),
                    })
                    .collect();
                json!({
                    "name": module.name(),
                    "global": module.is_global(),
                    "imports": imports,
                    "providers": providers,
                    "exports": exports,
                })
            })
            .collect();
        json!({ "modules": modules })
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.modules.iter().map(|m| m.name()))
            .finish()
    }
}
