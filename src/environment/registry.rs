//! Reference-counted shared resources keyed by scope
//!
//! A resource is created by the first `acquire` for a scope key and destroyed
//! by the `release` that drops the last reference. Creation and destruction
//! both happen under the registry lock, so concurrent acquires for the same
//! key converge on one instance and a release never races a re-create.

use crate::error::{AppError, AppResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

struct Entry<R> {
    resource: Arc<R>,
    refs: usize,
}

/// Scope key -> ref-counted shared resource
pub struct SharedResourceRegistry<R> {
    entries: Mutex<HashMap<String, Entry<R>>>,
}

impl<R> Default for SharedResourceRegistry<R> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<R: Send + Sync> SharedResourceRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the resource for `key`, creating it with `create` if absent
    ///
    /// Each successful call takes one reference that must be given back with
    /// [`release`](Self::release). A failed `create` takes no reference.
    pub async fn acquire<F, Fut>(&self, key: &str, create: F) -> AppResult<Arc<R>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<R>>,
    {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(key) {
            entry.refs += 1;
            tracing::debug!(scope = %key, refs = entry.refs, "Shared resource reused");
            return Ok(entry.resource.clone());
        }

        let resource = Arc::new(create().await?);
        entries.insert(
            key.to_string(),
            Entry {
                resource: resource.clone(),
                refs: 1,
            },
        );
        tracing::debug!(scope = %key, "Shared resource created");
        Ok(resource)
    }

    /// Drop one reference to `key`, destroying the resource on the last one
    ///
    /// Returns `Ok(true)` when this call destroyed the resource. The entry is
    /// removed before `destroy` runs, so a failed destroy is reported once and
    /// never retried.
    pub async fn release<F, Fut>(&self, key: &str, destroy: F) -> AppResult<bool>
    where
        F: FnOnce(Arc<R>) -> Fut,
        Fut: Future<Output = AppResult<()>>,
    {
        let mut entries = self.entries.lock().await;

        let entry = entries.get_mut(key).ok_or_else(|| {
            AppError::Internal(format!("release of unacquired shared resource '{}'", key))
        })?;
        entry.refs -= 1;

        if entry.refs > 0 {
            tracing::debug!(scope = %key, refs = entry.refs, "Shared resource released");
            return Ok(false);
        }

        let Some(Entry { resource, .. }) = entries.remove(key) else {
            return Ok(false);
        };
        destroy(resource).await?;
        tracing::debug!(scope = %key, "Shared resource destroyed");
        Ok(true)
    }

    /// Current reference count for `key` (0 when absent)
    pub async fn ref_count(&self, key: &str) -> usize {
        self.entries
            .lock()
            .await
            .get(key)
            .map(|entry| entry.refs)
            .unwrap_or(0)
    }
}
