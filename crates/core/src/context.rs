use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::{ServiceInstance, TypeKey};

/// Typed key-value map supplied by the host environment.
///
/// Two maps exist per application: the APP-level map passed at factory time
/// (read by activators and APP-scoped contextual providers) and a REQUEST-level
/// map supplied on each scope entry. Contextual providers never construct; they
/// project the matching entry out of one of these maps.
#[derive(Default, Clone)]
pub struct Context {
    entries: HashMap<TypeKey, ServiceInstance>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an owned value under its own type.
    pub fn with<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.with_arc(Arc::new(value))
    }

    /// Insert a shared value, allowing trait-object keys.
    pub fn with_arc<T: ?Sized + Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
        self.entries
            .insert(TypeKey::of::<T>(), ServiceInstance::new(value));
        self
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeKey::of::<T>())
            .and_then(|instance| instance.extract::<T>())
    }

    pub fn contains_key(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get_raw(&self, key: &TypeKey) -> Option<ServiceInstance> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn merge(&mut self, other: Context) {
        self.entries.extend(other.entries);
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Flag(bool);

    #[test]
    fn typed_round_trip() {
        let ctx = Context::new().with(Flag(true)).with(7_u64);
        assert_eq!(ctx.get::<Flag>().unwrap().0, true);
        assert_eq!(*ctx.get::<u64>().unwrap(), 7);
        assert!(ctx.get::<String>().is_none());
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn later_insert_replaces_earlier() {
        let ctx = Context::new().with(Flag(false)).with(Flag(true));
        assert_eq!(ctx.get::<Flag>().unwrap().0, true);
        assert_eq!(ctx.len(), 1);
    }
}
