use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::errors::WakuError;
use crate::extensions::Extension;
use crate::modules::dynamic::{ModuleId, ModuleRef};
use crate::modules::metadata::ModuleMetadata;
use crate::modules::module::Module;
use crate::modules::registry::ModuleRegistry;
use crate::provider::Provider;

/// One module as seen during the registration phase: metadata extracted and
/// configured, not yet compiled.
pub(crate) struct DiscoveredModule {
    pub(crate) id: ModuleId,
    pub(crate) name: &'static str,
    pub(crate) metadata: ModuleMetadata,
    pub(crate) import_ids: Vec<ModuleId>,
}

/// What `OnModuleRegistration` hooks receive: read access to the whole
/// discovered tree, write access limited to provider contribution.
pub struct RegistrationContext<'a> {
    modules: &'a [DiscoveredModule],
    root: ModuleId,
    contributions: Vec<(ModuleId, Provider)>,
}

impl<'a> RegistrationContext<'a> {
    /// Identity of the composition root.
    pub fn root_id(&self) -> ModuleId {
        self.root.clone()
    }

    /// Module identities in topological order.
    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.iter().map(|module| &module.id)
    }

    /// Read-only view of a module's metadata.
    pub fn metadata(&self, id: &ModuleId) -> Option<&'a ModuleMetadata> {
        let modules: &'a [DiscoveredModule] = self.modules;
        modules
            .iter()
            .find(|module| module.id == *id)
            .map(|module| &module.metadata)
    }

    /// Find every extension of type `E` across the discovered tree, in
    /// topological module order. Enables cross-module aggregation: an
    /// application-level hook walks the tree and merges per-module state.
    ///
    /// The returned references borrow the tree itself, so contributions via
    /// [`add_provider`](Self::add_provider) stay possible while holding them.
    pub fn find_extensions<E: 'static>(&self) -> Vec<(ModuleId, &'a E)> {
        let modules: &'a [DiscoveredModule] = self.modules;
        let mut found = Vec::new();
        for module in modules {
            for extension in module.metadata.extensions() {
                if let Some(typed) = extension.as_any().downcast_ref::<E>() {
                    found.push((module.id.clone(), typed));
                }
            }
        }
        found
    }

    /// Contribute a provider to the named module. The contribution is merged
    /// into the module's metadata before compilation.
    pub fn add_provider(
        &mut self,
        owner: &ModuleId,
        provider: impl Into<Provider>,
    ) -> Result<(), WakuError> {
        if !self.modules.iter().any(|module| module.id == *owner) {
            return Err(WakuError::UnknownModule {
                name: format!("{owner:?}"),
            });
        }
        self.contributions.push((owner.clone(), provider.into()));
        Ok(())
    }
}

/// Builds the frozen [`ModuleRegistry`] from a root module reference.
///
/// Pipeline: metadata extraction (configure hooks fire inside) → transitive
/// discovery → topological sort → registration hooks (application-level
/// first, then per-module in topological order) → compile.
pub struct RegistryBuilder {
    root: ModuleRef,
    app_extensions: Vec<Arc<dyn Extension>>,
}

impl RegistryBuilder {
    pub fn new(root: ModuleRef) -> Self {
        Self {
            root,
            app_extensions: Vec::new(),
        }
    }

    pub fn with_app_extensions(mut self, extensions: Vec<Arc<dyn Extension>>) -> Self {
        self.app_extensions = extensions;
        self
    }

    pub fn build(self) -> Result<ModuleRegistry, WakuError> {
        let root_id = self.root.id();
        let root_name = self.root.name();

        // Discovery + topological sort in one depth-first pass: a module is
        // pushed after all of its imports, so the output is leaves-first and
        // the root lands last. The visit stack doubles as the cycle path.
        let mut sorter = TopoSorter::default();
        sorter.visit(&self.root)?;
        let mut discovered = sorter.ordered;

        tracing::debug!(
            modules = ?discovered.iter().map(|m| m.name).collect::<Vec<_>>(),
            "module dependency order resolved"
        );

        // Registration phase: application-level hooks run first, owned by the
        // root module; module-level hooks follow in topological order.
        let mut context = RegistrationContext {
            modules: &discovered,
            root: root_id.clone(),
            contributions: Vec::new(),
        };
        for extension in &self.app_extensions {
            if let Some(hook) = extension.as_registration() {
                hook.on_module_registration(&mut context).map_err(|source| {
                    WakuError::extension(root_name, "OnModuleRegistration", source)
                })?;
            }
        }
        for position in 0..discovered.len() {
            let extensions: Vec<_> = discovered[position].metadata.extensions().to_vec();
            let module_name = discovered[position].name;
            for extension in extensions {
                if let Some(hook) = extension.as_registration() {
                    hook.on_module_registration(&mut context).map_err(|source| {
                        WakuError::extension(module_name, "OnModuleRegistration", source)
                    })?;
                }
            }
        }
        let contributions = context.contributions;

        let mut index: HashMap<ModuleId, usize> = HashMap::with_capacity(discovered.len());
        for (position, module) in discovered.iter().enumerate() {
            index.insert(module.id.clone(), position);
        }
        for (owner, provider) in contributions {
            let position = index[&owner];
            tracing::trace!(
                module = discovered[position].name,
                interface = provider.interface().type_name(),
                "provider contributed during registration"
            );
            discovered[position].metadata.add_provider(provider);
        }

        // Compile. The root is implicitly global and carries the
        // application-level extensions.
        let module_count = discovered.len();
        let mut modules = Vec::with_capacity(module_count);
        for (position, module) in discovered.into_iter().enumerate() {
            let is_root = position == module_count - 1;
            let mut metadata = module.metadata;
            if is_root {
                for extension in &self.app_extensions {
                    metadata = metadata.with_extension_arc(extension.clone());
                }
            }
            let is_global = metadata.is_global() || is_root;
            modules.push(Module::new(module.id, metadata, module.import_ids, is_global));
        }

        ModuleRegistry::new(modules)
    }
}

#[derive(Default)]
struct TopoSorter {
    ordered: Vec<DiscoveredModule>,
    permanent: HashSet<ModuleId>,
    in_progress: HashSet<ModuleId>,
    stack: Vec<&'static str>,
}

impl TopoSorter {
    fn visit(&mut self, module: &ModuleRef) -> Result<(), WakuError> {
        let id = module.id();
        if self.permanent.contains(&id) {
            return Ok(());
        }
        if self.in_progress.contains(&id) {
            let mut path = self.stack.clone();
            path.push(module.name());
            return Err(WakuError::ModuleCycle {
                path: path.into_iter().map(String::from).collect(),
            });
        }

        self.in_progress.insert(id.clone());
        self.stack.push(module.name());

        let metadata = module.extract_metadata()?;
        let import_ids: Vec<ModuleId> =
            metadata.imports().iter().map(|import| import.id()).collect();
        for import in metadata.imports().to_vec() {
            self.visit(&import)?;
        }

        self.stack.pop();
        self.in_progress.remove(&id);
        self.permanent.insert(id.clone());
        self.ordered.push(DiscoveredModule {
            id,
            name: module.name(),
            metadata,
            import_ids,
        });
        Ok(())
    }
}
