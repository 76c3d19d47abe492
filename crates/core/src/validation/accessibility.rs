use std::collections::HashSet;

use crate::modules::{Module, ModuleId, ModuleRegistry};
use crate::provider::TypeKey;
use crate::validation::rules::{ValidationContext, ValidationRule};
use crate::WakuError;

/// Verifies that every declared provider dependency is reachable through the
/// module import/export mesh.
///
/// A dependency `D` of a provider declared in module `M` is accessible when,
/// in order:
///
/// 1. `D` is provided by a global module, or is an APP-scope context key;
/// 2. `D` is provided locally in `M`;
/// 3. `D` is a context variable registered on `M` itself;
/// 4. `D` is exported by a directly-imported module of `M`, transitively
///    following whole-module re-exports;
/// 5. otherwise it is inaccessible and reported.
#[derive(Debug, Default)]
pub struct AccessibilityRule;

impl ValidationRule for AccessibilityRule {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<WakuError> {
        let mut violations = Vec::new();
        for module in ctx.registry.modules() {
            for provider in module.providers() {
                for dependency in provider.dependencies() {
                    if !accessible_from(ctx, module, dependency) {
                        violations.push(WakuError::DependencyInaccessible {
                            required: dependency.type_name(),
                            required_by: provider.implementation(),
                            module: module.name().to_string(),
                        });
                    }
                }
            }
        }
        violations
    }
}

fn accessible_from(ctx: &ValidationContext<'_>, module: &Module, dependency: &TypeKey) -> bool {
    // 1. Global providers and APP-scope context keys are visible everywhere.
    if ctx
        .registry
        .modules()
        .iter()
        .any(|m| m.is_global() && m.provides(dependency))
    {
        return true;
    }
    if ctx.app_context.contains_key(dependency) {
        return true;
    }

    // 2. Declared locally.
    if module.provides(dependency) {
        return true;
    }

    // 3. Context variable registered on the module itself.
    if module.declares_context(dependency) {
        return true;
    }

    // 4. Exported by a direct import, following whole-module re-exports.
    for import in module.imports() {
        if let Some(imported) = ctx.registry.get(import) {
            let mut visited = HashSet::new();
            if exports_transitively(ctx.registry, imported, dependency, &mut visited) {
                return true;
            }
        }
    }

    false
}

fn exports_transitively(
    registry: &ModuleRegistry,
    module: &Module,
    dependency: &TypeKey,
    visited: &mut HashSet<ModuleId>,
) -> bool {
    if !visited.insert(module.id().clone()) {
        return false;
    }
    if module.exports_type(dependency) {
        return true;
    }
    module.exported_modules().iter().any(|re_exported| {
        registry
            .get(re_exported)
            .map(|m| exports_transitively(registry, m, dependency, visited))
            .unwrap_or(false)
    })
}
