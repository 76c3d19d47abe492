use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable identifier for an interface type.
///
/// Works for trait objects as well as concrete types: `TypeKey::of::<dyn Api>()`
/// and `TypeKey::of::<ApiImpl>()` are both valid keys.
#[derive(Clone, Copy, Eq)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A type-erased service value.
///
/// The inner box holds the `Arc<I>` itself, so the same wrapper round-trips
/// trait objects: store `Arc<dyn Api>`, read back `Arc<dyn Api>`. Cloning is a
/// cheap `Arc` bump, which is what lets scope caches hand the same instance to
/// every consumer.
#[derive(Clone)]
pub struct ServiceInstance {
    value: Arc<dyn Any + Send + Sync>,
    key: TypeKey,
}

impl ServiceInstance {
    pub fn new<I: ?Sized + Send + Sync + 'static>(value: Arc<I>) -> Self {
        Self {
            value: Arc::new(value),
            key: TypeKey::of::<I>(),
        }
    }

    /// Read the value back under its interface type. Returns `None` when the
    /// requested type does not match the stored one.
    pub fn extract<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.value.downcast_ref::<Arc<I>>().cloned()
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceInstance({})", self.key)
    }
}
