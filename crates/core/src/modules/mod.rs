mod builder;
mod dynamic;
mod metadata;
mod module;
mod registry;

pub use builder::{RegistrationContext, RegistryBuilder};
pub use dynamic::{DynamicModule, ModuleDef, ModuleId, ModuleRef};
pub use metadata::{Export, ModuleMetadata};
pub use module::Module;
pub use registry::ModuleRegistry;
