use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::container::{AppContainer, RequestScope};
use crate::context::Context;
use crate::errors::WakuError;
use crate::extensions::HookContext;
use crate::lifespan::Lifespan;
use crate::modules::ModuleRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Created,
    Running,
    Stopped,
}

/// The long-lived application object produced by
/// [`WakuFactory::create`](crate::WakuFactory::create).
///
/// At runtime this is a read-only module registry plus a container factory;
/// there is no hot reconfiguration. `start` and `shutdown` drive the
/// lifecycle; both are idempotent.
pub struct Application {
    registry: Arc<ModuleRegistry>,
    container: AppContainer,
    lifespans: Vec<Arc<dyn Lifespan>>,
    state: Mutex<LifecycleState>,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("registry", &self.registry)
            .field("state", &*self.state.lock().unwrap())
            .finish()
    }
}

impl Application {
    pub(crate) fn new(
        registry: Arc<ModuleRegistry>,
        container: AppContainer,
        lifespans: Vec<Arc<dyn Lifespan>>,
    ) -> Self {
        Self {
            registry,
            container,
            lifespans,
            state: Mutex::new(LifecycleState::Created),
        }
    }

    /// The root (APP-scope) container.
    pub fn container(&self) -> &AppContainer {
        &self.container
    }

    /// The frozen module registry.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Enter a request scope with an empty request context.
    pub fn scope(&self) -> RequestScope {
        self.container.scope()
    }

    /// Enter a request scope, supplying the REQUEST-level context map.
    pub fn scope_with(&self, context: Context) -> RequestScope {
        self.container.scope_with(context)
    }

    /// Run the startup sequence: module init hooks in topological order,
    /// application init hooks, lifespans in declaration order, then
    /// after-init hooks.
    ///
    /// If any step fails, everything already done is unwound in mirror order
    /// before the error is returned; there is no half-initialized state.
    pub async fn start(&self) -> Result<(), WakuError> {
        {
            let state = self.state.lock().map_err(|_| WakuError::Lock {
                resource: "application state",
            })?;
            if *state != LifecycleState::Created {
                return Ok(());
            }
        }

        let modules = self.registry.modules();

        let mut initialized = 0usize;
        for module in modules {
            for (position, extension) in module.extensions().iter().enumerate() {
                if let Some(hook) = extension.as_init() {
                    let ctx = self.hook_context(module);
                    if let Err(source) = hook.on_module_init(&ctx).await {
                        let error = WakuError::extension(module.name(), "OnModuleInit", source);
                        // Extensions of the failing module that already ran
                        // their init hooks unwind first, then the fully
                        // initialized modules, LIFO throughout.
                        self.destroy_extensions(module, position).await;
                        self.destroy_modules(initialized).await;
                        return Err(error);
                    }
                }
            }
            initialized += 1;
            tracing::trace!(module = module.name(), "module initialized");
        }

        for module in modules {
            for extension in module.extensions() {
                if let Some(hook) = extension.as_application_init() {
                    let ctx = self.hook_context(module);
                    if let Err(source) = hook.on_application_init(&ctx).await {
                        let error =
                            WakuError::extension(module.name(), "OnApplicationInit", source);
                        self.destroy_modules(modules.len()).await;
                        return Err(error);
                    }
                }
            }
        }

        let mut entered = 0usize;
        for lifespan in &self.lifespans {
            if let Err(source) = lifespan.start().await {
                let error = WakuError::extension(
                    self.registry.root().name(),
                    "Lifespan::start",
                    source,
                );
                self.stop_lifespans(entered).await;
                self.destroy_modules(modules.len()).await;
                return Err(error);
            }
            entered += 1;
        }

        for module in modules {
            for extension in module.extensions() {
                if let Some(hook) = extension.as_after_application_init() {
                    let ctx = self.hook_context(module);
                    if let Err(source) = hook.after_application_init(&ctx).await {
                        let error =
                            WakuError::extension(module.name(), "AfterApplicationInit", source);
                        self.stop_lifespans(self.lifespans.len()).await;
                        self.destroy_modules(modules.len()).await;
                        return Err(error);
                    }
                }
            }
        }

        *self.state.lock().map_err(|_| WakuError::Lock {
            resource: "application state",
        })? = LifecycleState::Running;
        tracing::debug!(modules = self.registry.len(), "application started");
        Ok(())
    }

    /// Mirror of [`start`](Self::start): lifespans stop in reverse order,
    /// module destroy hooks run in reverse topological order, shutdown hooks
    /// fire, and APP-scope finalizers run LIFO.
    ///
    /// Teardown failures are logged and skipped so every resource gets its
    /// chance to release.
    pub async fn shutdown(&self) -> Result<(), WakuError> {
        {
            let mut state = self.state.lock().map_err(|_| WakuError::Lock {
                resource: "application state",
            })?;
            if *state != LifecycleState::Running {
                return Ok(());
            }
            *state = LifecycleState::Stopped;
        }

        self.stop_lifespans(self.lifespans.len()).await;
        self.destroy_modules(self.registry.len()).await;

        for module in self.registry.modules().iter().rev() {
            for extension in module.extensions().iter().rev() {
                if let Some(hook) = extension.as_application_shutdown() {
                    let ctx = self.hook_context(module);
                    if let Err(error) = hook.on_application_shutdown(&ctx).await {
                        tracing::warn!(
                            module = module.name(),
                            error = %error,
                            "OnApplicationShutdown hook failed"
                        );
                    }
                }
            }
        }

        self.container.run_finalizers();
        tracing::debug!("application stopped");
        Ok(())
    }

    /// Start, run the future, then shut down in mirror order regardless of
    /// how the future exits.
    pub async fn run_until<F, T>(&self, fut: F) -> Result<T, WakuError>
    where
        F: Future<Output = T>,
    {
        self.start().await?;
        let output = fut.await;
        self.shutdown().await?;
        Ok(output)
    }

    fn hook_context<'a>(&'a self, module: &'a crate::modules::Module) -> HookContext<'a> {
        HookContext {
            container: &self.container,
            registry: self.registry.as_ref(),
            module,
        }
    }

    /// Destroy hooks for the first `count` modules, LIFO.
    async fn destroy_modules(&self, count: usize) {
        for module in self.registry.modules()[..count].iter().rev() {
            self.destroy_extensions(module, module.extensions().len()).await;
            tracing::trace!(module = module.name(), "module destroyed");
        }
    }

    /// Destroy hooks for the first `count` extensions of one module, LIFO.
    async fn destroy_extensions(&self, module: &crate::modules::Module, count: usize) {
        for extension in module.extensions()[..count].iter().rev() {
            if let Some(hook) = extension.as_destroy() {
                let ctx = self.hook_context(module);
                if let Err(error) = hook.on_module_destroy(&ctx).await {
                    tracing::warn!(
                        module = module.name(),
                        error = %error,
                        "OnModuleDestroy hook failed"
                    );
                }
            }
        }
    }

    /// Stop the first `count` lifespans, in reverse declaration order.
    async fn stop_lifespans(&self, count: usize) {
        for lifespan in self.lifespans[..count].iter().rev() {
            if let Err(error) = lifespan.stop().await {
                tracing::warn!(error = %error, "lifespan stop failed");
            }
        }
    }
}
