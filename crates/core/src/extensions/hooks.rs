use async_trait::async_trait;

use crate::container::AppContainer;
use crate::modules::{Module, ModuleMetadata, ModuleRegistry, RegistrationContext};

/// Runs at metadata-extraction time with write access to the still-mutable
/// metadata. Synchronous; must not perform I/O.
pub trait OnModuleConfigure: Send + Sync {
    fn on_module_configure(&self, metadata: &mut ModuleMetadata) -> anyhow::Result<()>;
}

/// Runs after all metadata is collected, before compilation. Read access to
/// the whole discovered tree, write access limited to provider contribution.
/// Synchronous; must not suspend.
pub trait OnModuleRegistration: Send + Sync {
    fn on_module_registration(&self, ctx: &mut RegistrationContext<'_>) -> anyhow::Result<()>;
}

/// Marker for extensions that want to be found across the module tree via
/// [`ModuleRegistry::find_extensions`] during the registration phase.
pub trait OnModuleDiscover: Send + Sync {}

/// Module initialization, run in topological order during application start.
#[async_trait]
pub trait OnModuleInit: Send + Sync {
    async fn on_module_init(&self, ctx: &HookContext<'_>) -> anyhow::Result<()>;
}

/// Module teardown, run in reverse topological order during shutdown.
#[async_trait]
pub trait OnModuleDestroy: Send + Sync {
    async fn on_module_destroy(&self, ctx: &HookContext<'_>) -> anyhow::Result<()>;
}

/// Application-level initialization, after every module init hook.
#[async_trait]
pub trait OnApplicationInit: Send + Sync {
    async fn on_application_init(&self, ctx: &HookContext<'_>) -> anyhow::Result<()>;
}

/// Runs last during startup, once lifespans are entered.
#[async_trait]
pub trait AfterApplicationInit: Send + Sync {
    async fn after_application_init(&self, ctx: &HookContext<'_>) -> anyhow::Result<()>;
}

/// Application-level teardown, after every module destroy hook.
#[async_trait]
pub trait OnApplicationShutdown: Send + Sync {
    async fn on_application_shutdown(&self, ctx: &HookContext<'_>) -> anyhow::Result<()>;
}

/// What suspending hooks see: the built container, the frozen registry and the
/// module that owns the hook.
pub struct HookContext<'a> {
    pub container: &'a AppContainer,
    pub registry: &'a ModuleRegistry,
    pub module: &'a Module,
}
