//! Test doubles for the network and store capabilities.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use swcache_core::{CacheDb, Error, LookupScope, RequestDescriptor, RequestKey, Response, Store};

/// Scripted network. Unrouted URLs answer 404; offline mode rejects every
/// fetch with `NetworkFailure`.
pub struct FakeNetwork {
    routes: HashMap<String, Response>,
    online: AtomicBool,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, url: &str, response: Response) -> Self {
        self.routes.insert(url.to_string(), response);
        self
    }

    pub fn offline(self) -> Self {
        self.set_online(false);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::fetch::Fetcher for FakeNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.url().to_string());

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::NetworkFailure(format!("{}: offline", request.url())));
        }

        Ok(match self.routes.get(request.url().as_str()) {
            Some(response) => response.duplicate(),
            None => Response::new(404, "not found").with_status_text("Not Found"),
        })
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

fn unavailable() -> Error {
    Error::StoreUnavailable(tokio_rusqlite::Error::ConnectionClosed)
}

#[async_trait::async_trait]
impl Store for FailingStore {
    async fn open_generation(&self, _name: &str) -> Result<bool, Error> {
        Err(unavailable())
    }

    async fn generation_names(&self) -> Result<Vec<String>, Error> {
        Err(unavailable())
    }

    async fn delete_generation(&self, _name: &str) -> Result<bool, Error> {
        Err(unavailable())
    }

    async fn lookup(&self, _key: &RequestKey, _scope: LookupScope<'_>) -> Result<Option<Response>, Error> {
        Err(unavailable())
    }

    async fn write(&self, _generation: &str, _key: &RequestKey, _response: Response) -> Result<(), Error> {
        Err(unavailable())
    }

    async fn write_batch(&self, _generation: &str, _entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        Err(unavailable())
    }
}

/// In-memory [`CacheDb`] that counts reads and writes.
pub struct CountingStore {
    pub db: CacheDb,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    pub async fn new() -> Self {
        Self { db: CacheDb::open_in_memory().await.unwrap(), reads: AtomicUsize::new(0), writes: AtomicUsize::new(0) }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn accesses(&self) -> usize {
        self.reads() + self.writes()
    }
}

#[async_trait::async_trait]
impl Store for CountingStore {
    async fn open_generation(&self, name: &str) -> Result<bool, Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.db.open_generation(name).await
    }

    async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.db.generation_names().await
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.db.delete_generation(name).await
    }

    async fn lookup(&self, key: &RequestKey, scope: LookupScope<'_>) -> Result<Option<Response>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.db.lookup(key, scope).await
    }

    async fn write(&self, generation: &str, key: &RequestKey, response: Response) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.db.write(generation, key, response).await
    }

    async fn write_batch(&self, generation: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.db.write_batch(generation, entries).await
    }
}
