use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Typed map of values shared by every request, such as the [`crate::Issuer`].
#[derive(Default)]
pub struct AppData {
    inner: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl std::fmt::Debug for AppData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppData").finish_non_exhaustive()
    }
}

impl AppData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under its type, returning the value it replaced.
    pub fn provide_arc<T: Send + Sync + 'static>(&self, value: Arc<T>) -> Option<Arc<T>> {
        // The map holds no invariants a panicking writer could break.
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(TypeId::of::<T>(), value as Arc<dyn Any + Send + Sync>)
            .and_then(|prev| prev.downcast::<T>().ok())
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&TypeId::of::<T>())
            .cloned()
            .and_then(|stored| stored.downcast::<T>().ok())
    }
}
