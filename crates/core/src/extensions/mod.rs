mod hooks;

use std::any::Any;

pub use hooks::{
    AfterApplicationInit, HookContext, OnApplicationInit, OnApplicationShutdown,
    OnModuleConfigure, OnModuleDestroy, OnModuleDiscover, OnModuleInit, OnModuleRegistration,
};

/// An extension is a bag of capabilities attached to a module (or, for
/// application-level extensions, to the root module).
///
/// Capabilities are detected structurally: an extension overrides the
/// accessor for each hook set it participates in and returns `self`. Nothing
/// is inferred from the type beyond what the accessors expose, so one object
/// can implement any combination of hooks.
pub trait Extension: Send + Sync + 'static {
    /// Downcast support for marker-based discovery
    /// ([`crate::modules::ModuleRegistry::find_extensions`]).
    fn as_any(&self) -> &dyn Any;

    /// Extension name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_configure(&self) -> Option<&dyn OnModuleConfigure> {
        None
    }

    fn as_registration(&self) -> Option<&dyn OnModuleRegistration> {
        None
    }

    fn as_init(&self) -> Option<&dyn OnModuleInit> {
        None
    }

    fn as_destroy(&self) -> Option<&dyn OnModuleDestroy> {
        None
    }

    fn as_application_init(&self) -> Option<&dyn OnApplicationInit> {
        None
    }

    fn as_after_application_init(&self) -> Option<&dyn AfterApplicationInit> {
        None
    }

    fn as_application_shutdown(&self) -> Option<&dyn OnApplicationShutdown> {
        None
    }
}
