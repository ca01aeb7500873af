//! Store maintenance for one generation.
//!
//! Wraps a [`Store`] with the policies the engine needs: all-or-nothing
//! population at install, lookups that degrade to a miss when the store is
//! unavailable, and fire-and-forget write-back that can be flushed.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::try_join_all;
use swcache_core::{Error, LookupScope, RequestDescriptor, RequestKey, RequestMode, Response, Store};
use tokio::task::JoinHandle;
use url::Url;

use crate::fetch::Fetcher;

pub struct StoreMaintainer {
    store: Arc<dyn Store>,
    generation: String,
    max_entry_bytes: usize,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl StoreMaintainer {
    pub fn new(store: Arc<dyn Store>, generation: impl Into<String>, max_entry_bytes: usize) -> Self {
        Self { store, generation: generation.into(), max_entry_bytes, pending: Mutex::new(Vec::new()) }
    }

    /// Name of the current generation.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Create the current generation. Returns true when it did not exist yet.
    pub async fn open_generation(&self) -> Result<bool, Error> {
        self.store.open_generation(&self.generation).await
    }

    /// Fetch every URL and store the responses in one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any fetch is rejected, any response
    /// is not 2xx, or the batch write fails. Nothing is stored in that case.
    pub async fn populate(&self, fetcher: &dyn Fetcher, urls: &[Url]) -> Result<usize, Error> {
        let fetches = urls.iter().map(|url| async move {
            let request = RequestDescriptor::get(url.clone()).with_mode(RequestMode::SameOrigin);
            match fetcher.fetch(&request).await {
                Ok(response) if response.ok() => Ok((request.key(), response)),
                Ok(response) => Err(Error::InstallFailed(format!("{url}: status {}", response.status()))),
                Err(e) => Err(Error::InstallFailed(format!("{url}: {e}"))),
            }
        });

        let entries = try_join_all(fetches).await?;
        let count = entries.len();

        self.store
            .write_batch(&self.generation, entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("writing {}: {e}", self.generation)))?;

        tracing::info!(generation = %self.generation, count, "populated generation");
        Ok(count)
    }

    async fn lookup(&self, key: &RequestKey, scope: LookupScope<'_>) -> Option<Response> {
        match self.store.lookup(key, scope).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "store lookup failed, treating as miss");
                None
            }
        }
    }

    /// Look up `key` in the current generation only.
    pub async fn lookup_current(&self, key: &RequestKey) -> Option<Response> {
        self.lookup(key, LookupScope::Current(&self.generation)).await
    }

    /// Look up `key` in every generation, current first.
    pub async fn lookup_any(&self, key: &RequestKey) -> Option<Response> {
        self.lookup(key, LookupScope::All { preferred: &self.generation }).await
    }

    /// Whether `response` may be written back.
    pub fn is_eligible(&self, response: &Response) -> bool {
        response.is_storable(self.max_entry_bytes)
    }

    /// Store `response` under the current generation on a spawned task.
    ///
    /// Returns false without spawning when the response is not eligible.
    /// Write failures are logged and dropped, including writes whose
    /// generation was deleted by a newer deployment in the meantime.
    pub fn write_back(&self, key: RequestKey, response: Response) -> bool {
        if !self.is_eligible(&response) {
            tracing::debug!(key = %key, status = response.status(), "response not eligible for storage");
            return false;
        }

        let store = Arc::clone(&self.store);
        let generation = self.generation.clone();
        let handle = tokio::spawn(async move {
            match store.write(&generation, &key, response).await {
                Ok(()) => {}
                Err(Error::UnknownGeneration(_)) => {
                    tracing::info!(key = %key, generation = %generation, "generation deleted, dropping write-back");
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "write-back failed"),
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        true
    }

    /// Wait for every write-back spawned so far.
    pub async fn flush(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "write-back task did not complete");
            }
        }
    }

    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.store.generation_names().await
    }

    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.store.delete_generation(name).await
    }

    /// Delete every generation except the current one. Returns the names
    /// that were removed.
    pub async fn prune(&self) -> Result<Vec<String>, Error> {
        let mut purged = Vec::new();
        for name in self.generation_names().await? {
            if name == self.generation {
                continue;
            }
            if self.delete(&name).await? {
                tracing::info!(generation = %name, "deleted stale generation");
                purged.push(name);
            }
        }
        Ok(purged)
    }
}
