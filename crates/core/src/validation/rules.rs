use crate::context::Context;
use crate::errors::WakuError;
use crate::modules::ModuleRegistry;

/// What validation rules see: the frozen registry and the APP context the
/// container was composed with.
pub struct ValidationContext<'a> {
    pub registry: &'a ModuleRegistry,
    pub app_context: &'a Context,
}

/// A startup validation rule. Rules run once the registry is frozen and the
/// container composed; every returned diagnostic is reported, so rules should
/// not stop at the first finding.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<WakuError>;
}
