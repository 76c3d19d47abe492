use std::collections::{HashMap, HashSet};

use crate::context::Context;
use crate::errors::WakuError;
use crate::modules::ModuleRegistry;
use crate::provider::{CoerceFn, Provider, ProviderScope, TypeKey};

/// One flattened container entry: a provider plus where it came from.
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) provider: Provider,
    pub(crate) owner_name: &'static str,
    pub(crate) kind: RegistrationKind,
}

#[derive(Clone)]
pub(crate) enum RegistrationKind {
    Primary,
    /// Resolves the target key, then lifts the instance to this interface.
    Alias { target: TypeKey, coerce: CoerceFn },
}

#[derive(Default)]
pub(crate) struct RegistrationMap {
    entries: HashMap<TypeKey, Registration>,
}

impl RegistrationMap {
    pub(crate) fn get(&self, key: &TypeKey) -> Option<&Registration> {
        self.entries.get(key)
    }

    pub(crate) fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn insert(&mut self, key: TypeKey, registration: Registration) -> Option<Registration> {
        self.entries.insert(key, registration)
    }

    pub(crate) fn remove(&mut self, key: &TypeKey) -> Option<Registration> {
        self.entries.remove(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&TypeKey, &Registration)> {
        self.entries.iter()
    }
}

/// Flattens the registry's providers into container registrations.
///
/// Phases: activator evaluation (once, against the APP context) → provider
/// registration with activation filtering and conflict/override handling →
/// APP→REQUEST scope check → declared-dependency cycle check. All diagnostics
/// are collected; the factory aggregates them into one startup error.
pub(crate) fn compose(
    registry: &ModuleRegistry,
    app_context: &Context,
) -> Result<RegistrationMap, Vec<WakuError>> {
    let mut errors = Vec::new();

    let mut markers: HashMap<String, bool> = HashMap::new();
    for module in registry.modules() {
        for activator in module.activators() {
            match activator.evaluate(app_context) {
                Ok(value) => {
                    for marker in activator.markers() {
                        if markers.insert(marker.clone(), value).is_some() {
                            tracing::warn!(marker = %marker, "marker redefined by a later activator");
                        }
                        tracing::trace!(marker = %marker, value, "marker evaluated");
                    }
                }
                Err(source) => errors.push(WakuError::Activator {
                    marker: activator.markers().join(","),
                    source,
                }),
            }
        }
    }

    let mut map = RegistrationMap::default();
    for module in registry.modules() {
        for provider in module.providers() {
            if let Some(predicate) = &provider.activation {
                let is_registered = |key: &TypeKey| map.contains(key);
                match predicate.evaluate(&markers, &is_registered) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::trace!(
                            interface = provider.interface().type_name(),
                            module = module.name(),
                            "provider inactive, skipped"
                        );
                        continue;
                    }
                    Err(error) => {
                        errors.push(error);
                        continue;
                    }
                }
            }

            register(
                &mut map,
                provider.interface(),
                Registration {
                    provider: provider.clone(),
                    owner_name: module.name(),
                    kind: RegistrationKind::Primary,
                },
                &mut errors,
            );
            for (alias, coerce) in &provider.aliases {
                register(
                    &mut map,
                    *alias,
                    Registration {
                        provider: provider.clone(),
                        owner_name: module.name(),
                        kind: RegistrationKind::Alias {
                            target: provider.interface(),
                            coerce: coerce.clone(),
                        },
                    },
                    &mut errors,
                );
            }
        }
    }

    check_scopes(&map, &mut errors);
    check_cycles(&map, &mut errors);

    if errors.is_empty() {
        Ok(map)
    } else {
        Err(errors)
    }
}

fn register(
    map: &mut RegistrationMap,
    key: TypeKey,
    registration: Registration,
    errors: &mut Vec<WakuError>,
) {
    match map.get(&key) {
        None => {
            map.insert(key, registration);
        }
        Some(existing) => {
            if registration.provider.is_override() {
                tracing::debug!(
                    interface = key.type_name(),
                    replaced = existing.owner_name,
                    by = registration.owner_name,
                    "provider overridden"
                );
                map.insert(key, registration);
            } else {
                errors.push(WakuError::ProviderConflict {
                    interface: key.type_name(),
                    first: existing.owner_name.to_string(),
                    second: registration.owner_name.to_string(),
                });
            }
        }
    }
}

/// An APP-scoped provider must not depend on a REQUEST-scoped one: its
/// dependencies resolve only in the APP scope.
fn check_scopes(map: &RegistrationMap, errors: &mut Vec<WakuError>) {
    for (key, registration) in map.iter() {
        if registration.provider.scope() != ProviderScope::App {
            continue;
        }
        for dependency in registration.provider.dependencies() {
            if let Some(dep_registration) = map.get(dependency) {
                if dep_registration.provider.scope() == ProviderScope::Request {
                    errors.push(WakuError::ScopeMismatch {
                        provider: key.type_name(),
                        dependency: dependency.type_name(),
                    });
                }
            }
        }
    }
}

/// Reject cycles in the declared dependency graph; a cycle would recurse
/// forever at resolution time.
fn check_cycles(map: &RegistrationMap, errors: &mut Vec<WakuError>) {
    let mut done: HashSet<TypeKey> = HashSet::new();
    for (key, _) in map.iter() {
        if done.contains(key) {
            continue;
        }
        let mut path = Vec::new();
        let mut in_progress = HashSet::new();
        if let Some(cycle) = walk(map, key, &mut in_progress, &mut done, &mut path) {
            errors.push(WakuError::ProviderCycle { path: cycle });
        }
    }
}

fn walk(
    map: &RegistrationMap,
    key: &TypeKey,
    in_progress: &mut HashSet<TypeKey>,
    done: &mut HashSet<TypeKey>,
    path: &mut Vec<&'static str>,
) -> Option<Vec<String>> {
    if done.contains(key) {
        return None;
    }
    if in_progress.contains(key) {
        let mut cycle: Vec<String> = path.iter().map(|name| name.to_string()).collect();
        cycle.push(key.type_name().to_string());
        return Some(cycle);
    }
    in_progress.insert(*key);
    path.push(key.type_name());
    if let Some(registration) = map.get(key) {
        for dependency in registration.provider.dependencies() {
            if let Some(cycle) = walk(map, dependency, in_progress, done, path) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    in_progress.remove(key);
    done.insert(*key);
    None
}
