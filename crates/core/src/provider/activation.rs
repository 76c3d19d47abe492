use std::collections::HashMap;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use crate::context::Context;
use crate::errors::WakuError;
use crate::provider::TypeKey;

/// Boolean algebra over activation conditions, evaluated once at container
/// build time. Providers whose predicate evaluates to false are never
/// registered; activation is not a runtime switch.
#[derive(Clone)]
pub enum Predicate {
    /// A named marker whose value is decided by an [`Activator`].
    Marker(String),
    /// True iff the type has an active registration in the container.
    Has(TypeKey),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn marker(name: impl Into<String>) -> Self {
        Self::Marker(name.into())
    }

    pub fn has<T: ?Sized + 'static>() -> Self {
        Self::Has(TypeKey::of::<T>())
    }

    /// Evaluate against the marker table and the set of registrations made so
    /// far. Referencing a marker no activator controls is an error.
    pub(crate) fn evaluate(
        &self,
        markers: &HashMap<String, bool>,
        is_registered: &dyn Fn(&TypeKey) -> bool,
    ) -> Result<bool, WakuError> {
        match self {
            Self::Marker(name) => {
                markers
                    .get(name)
                    .copied()
                    .ok_or_else(|| WakuError::UnknownMarker {
                        marker: name.clone(),
                    })
            }
            Self::Has(key) => Ok(is_registered(key)),
            Self::Not(inner) => Ok(!inner.evaluate(markers, is_registered)?),
            Self::And(a, b) => {
                Ok(a.evaluate(markers, is_registered)? && b.evaluate(markers, is_registered)?)
            }
            Self::Or(a, b) => {
                Ok(a.evaluate(markers, is_registered)? || b.evaluate(markers, is_registered)?)
            }
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self))
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Self) -> Self::Output {
        Predicate::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Self) -> Self::Output {
        Predicate::Or(Box::new(self), Box::new(rhs))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marker(name) => write!(f, "Marker({name})"),
            Self::Has(key) => write!(f, "Has({key})"),
            Self::Not(inner) => write!(f, "!{inner:?}"),
            Self::And(a, b) => write!(f, "({a:?} & {b:?})"),
            Self::Or(a, b) => write!(f, "({a:?} | {b:?})"),
        }
    }
}

pub(crate) type ActivatorFn = Arc<dyn Fn(&Context) -> anyhow::Result<bool> + Send + Sync>;

/// Decides the value of one or more markers at container build time.
///
/// The function runs exactly once, against the APP-level context.
#[derive(Clone)]
pub struct Activator {
    markers: Vec<String>,
    eval: ActivatorFn,
}

impl Activator {
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Let the same activator function decide an additional marker.
    pub fn also_controls(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    pub(crate) fn evaluate(&self, context: &Context) -> anyhow::Result<bool> {
        (self.eval)(context)
    }
}

impl fmt::Debug for Activator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activator")
            .field("markers", &self.markers)
            .finish()
    }
}

/// Register a predicate that decides whether the named marker is on.
pub fn activator<F>(marker: impl Into<String>, eval: F) -> Activator
where
    F: Fn(&Context) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    Activator {
        markers: vec![marker.into()],
        eval: Arc::new(eval),
    }
}
