//! Reference-counted value handles.
//!
//! A decoded [`Value`] has a single owner. To hand it across component
//! boundaries, wrap it in a [`SharedValue`]: every holder owns one counted
//! reference, and the backing storage is freed when the last one is
//! released. Values never reference each other, so there are no cycles.

use crate::value::Value;
use std::ops::Deref;
use std::sync::Arc;

/// A counted, immutable handle to a [`Value`].
#[derive(Debug)]
pub struct SharedValue(Arc<Value>);

impl SharedValue {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// Number of live references, this one included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Takes another reference for a new holder.
    pub fn incr_ref(&self) -> Self {
        Self(Arc::clone(&self.0))
    }

    /// Releases this reference. The last release gets the value back;
    /// earlier ones return `None`.
    pub fn decr_ref(self) -> Option<Value> {
        Arc::into_inner(self.0)
    }

    /// Whether both handles refer to the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Clone for SharedValue {
    fn clone(&self) -> Self {
        self.incr_ref()
    }
}

impl Deref for SharedValue {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for SharedValue {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl PartialEq for SharedValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}
