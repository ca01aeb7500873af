//! Persistent key-value blob store capability.
//!
//! The engine only talks to storage through [`Store`]; [`CacheDb`] is the
//! SQLite implementation.

use crate::Error;
use crate::cache::CacheDb;
use crate::http::{RequestKey, Response};

/// Which generations a lookup may consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupScope<'a> {
    /// Only the named generation.
    Current(&'a str),
    /// Every known generation, the named one first.
    All { preferred: &'a str },
}

/// Generation store used by the interception engine.
///
/// Mutations are idempotent puts and deletes by key, so concurrent callers
/// need no locking beyond what the implementation does internally.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Create the generation if missing. Returns true when it was created.
    async fn open_generation(&self, name: &str) -> Result<bool, Error>;

    /// Names of every generation in the namespace.
    async fn generation_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation. Unknown names are a no-op returning false.
    async fn delete_generation(&self, name: &str) -> Result<bool, Error>;

    async fn lookup(&self, key: &RequestKey, scope: LookupScope<'_>) -> Result<Option<Response>, Error>;

    /// Overwrite the snapshot stored for `key`. The generation must exist.
    async fn write(&self, generation: &str, key: &RequestKey, response: Response) -> Result<(), Error>;

    /// Write all entries or none, creating the generation if missing.
    async fn write_batch(&self, generation: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error>;
}

#[async_trait::async_trait]
impl Store for CacheDb {
    async fn open_generation(&self, name: &str) -> Result<bool, Error> {
        self.create_generation(name).await
    }

    async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.list_generations().await
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        self.drop_generation(name).await
    }

    async fn lookup(&self, key: &RequestKey, scope: LookupScope<'_>) -> Result<Option<Response>, Error> {
        match scope {
            LookupScope::Current(generation) => self.get_entry(generation, key).await,
            LookupScope::All { preferred } => self.find_entry(key, preferred).await,
        }
    }

    async fn write(&self, generation: &str, key: &RequestKey, response: Response) -> Result<(), Error> {
        self.put_entry(generation, key, response).await
    }

    async fn write_batch(&self, generation: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        self.put_entries(generation, entries).await
    }
}
