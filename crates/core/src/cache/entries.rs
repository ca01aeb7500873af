//! Snapshot reads and writes within generations.

use super::connection::CacheDb;
use crate::Error;
use crate::http::{Headers, RequestKey, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Connection, OptionalExtension};

/// Metadata of a stored snapshot, without its body.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntryMeta {
    pub generation: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub kind: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub stored_at: String,
}

const SELECT_SNAPSHOT: &str = "SELECT e.status, e.status_text, e.kind, e.redirected, e.headers_json, e.body
     FROM entries e JOIN generations g ON g.name = e.generation";

/// Raw row as stored; decoded into a [`Response`] outside the row mapper.
struct StoredRow {
    status: i64,
    status_text: String,
    kind: String,
    redirected: bool,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            status: row.get(0)?,
            status_text: row.get(1)?,
            kind: row.get(2)?,
            redirected: row.get::<_, i32>(3)? == 1,
            headers_json: row.get(4)?,
            body: row.get(5)?,
        })
    }

    fn into_response(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let headers: Headers =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
        Ok(Response::new(status, self.body)
            .with_status_text(self.status_text)
            .with_headers(headers)
            .with_kind(self.kind.parse()?)
            .with_redirected(self.redirected))
    }
}

fn insert_entry(
    conn: &Connection, generation: &str, key: &RequestKey, response: &Response, stored_at: &str,
) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(response.headers()).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;
    conn.execute(
        "INSERT INTO entries (
            generation, key_hash, method, url, status, status_text, kind,
            redirected, content_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            kind = excluded.kind,
            redirected = excluded.redirected,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            key.hash(),
            key.method(),
            key.url(),
            response.status() as i64,
            response.status_text(),
            response.kind().as_str(),
            response.redirected() as i32,
            response.content_type(),
            headers_json,
            response.body().as_ref(),
            stored_at,
        ],
    )?;
    Ok(())
}

fn ensure_generation(conn: &Connection, generation: &str, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![generation, now],
    )?;
    Ok(())
}

fn generation_exists(conn: &Connection, generation: &str) -> Result<bool, Error> {
    let found = conn
        .query_row("SELECT 1 FROM generations WHERE name = ?1", params![generation], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

impl CacheDb {
    /// Insert or overwrite one snapshot in an existing generation.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownGeneration` when the generation is missing,
    /// e.g. because a newer deployment already deleted it.
    pub async fn put_entry(&self, generation: &str, key: &RequestKey, response: Response) -> Result<(), Error> {
        let generation = generation.to_string();
        let key = key.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                if !generation_exists(&tx, &generation)? {
                    return Err(Error::UnknownGeneration(generation));
                }
                insert_entry(&tx, &generation, &key, &response, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert a batch of snapshots in one transaction, creating the
    /// generation if needed.
    ///
    /// Either every entry lands or none does.
    pub async fn put_entries(&self, generation: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation, &now)?;
                for (key, response) in &entries {
                    insert_entry(&tx, &generation, key, response, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a snapshot from one generation.
    pub async fn get_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        let generation = generation.to_string();
        let hash = key.hash().to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let sql = format!("{SELECT_SNAPSHOT} WHERE e.generation = ?1 AND e.key_hash = ?2");
                let row = conn
                    .query_row(&sql, params![generation, hash], StoredRow::from_row)
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(StoredRow::into_response).transpose()
    }

    /// Find a snapshot in any generation.
    ///
    /// `preferred` wins when it holds the key; otherwise the newest
    /// generation that has it is used.
    pub async fn find_entry(&self, key: &RequestKey, preferred: &str) -> Result<Option<Response>, Error> {
        let preferred = preferred.to_string();
        let hash = key.hash().to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let sql = format!(
                    "{SELECT_SNAPSHOT} WHERE e.key_hash = ?1
                     ORDER BY (e.generation = ?2) DESC, g.created_at DESC, e.stored_at DESC
                     LIMIT 1"
                );
                let row = conn
                    .query_row(&sql, params![hash, preferred], StoredRow::from_row)
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(StoredRow::into_response).transpose()
    }

    /// Metadata for every stored copy of `key`, newest generation first.
    pub async fn entry_meta(&self, key: &RequestKey) -> Result<Vec<EntryMeta>, Error> {
        let hash = key.hash().to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.generation, e.method, e.url, e.status, e.kind, e.content_type,
                            LENGTH(e.body), e.stored_at
                     FROM entries e JOIN generations g ON g.name = e.generation
                     WHERE e.key_hash = ?1
                     ORDER BY g.created_at DESC",
                )?;
                let metas = stmt
                    .query_map(params![hash], |row| {
                        Ok(EntryMeta {
                            generation: row.get(0)?,
                            method: row.get(1)?,
                            url: row.get(2)?,
                            status: row.get::<_, i64>(3)? as u16,
                            kind: row.get(4)?,
                            content_type: row.get(5)?,
                            size: row.get::<_, i64>(6)? as u64,
                            stored_at: row.get(7)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(metas)
            })
            .await
            .map_err(Error::from)
    }
}
