//! Resource binding primitives.
//!
//! Transactional resources reach the toolkit through wrapper objects. Several
//! wrappers can manage the same underlying resource, so bindings are keyed by
//! the *hold object* (the real resource a wrapper ultimately holds) rather
//! than by wrapper identity.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;

use xarm_core::Result;

/// A cheap-clone handle to the underlying resource a factory wrapper manages.
///
/// Two `HoldObject`s compare equal when they refer to the same underlying
/// object, so distinct wrapper objects over one resource collapse onto a
/// single logical binding.
#[derive(Clone)]
pub struct HoldObject(Arc<dyn Any + Send + Sync>);

impl HoldObject {
    /// Wraps an underlying resource handle.
    pub fn new(inner: Arc<dyn Any + Send + Sync>) -> Self {
        Self(inner)
    }

    /// Returns a reference to the held object.
    pub fn inner(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.0
    }
}

impl PartialEq for HoldObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HoldObject {}

impl Hash for HoldObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for HoldObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HoldObject({:p})", Arc::as_ptr(&self.0))
    }
}

/// A factory wrapper that can report the underlying resource it manages.
pub trait ResourceFactoryHolder: Send + Sync {
    /// Returns the hold object used to deduplicate bindings of this factory.
    fn hold_object(&self) -> HoldObject;
}

/// Capability set for resources bound into a transaction.
///
/// Both methods default to no-ops so plain resources can be bound without
/// ceremony; resources that participate in XA cleanup override them and are
/// delisted then closed during commit processing.
#[async_trait]
pub trait BoundResource: Send + Sync {
    /// Delists the resource from its enclosing transaction.
    async fn delist(&self) -> Result<bool> {
        Ok(true)
    }

    /// Releases the resource.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
