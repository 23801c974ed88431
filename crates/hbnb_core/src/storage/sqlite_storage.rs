//! SQLite storage backend.
//!
//! # Responsibility
//! - Stage registered records and upsert them in one transaction on commit.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - Staged records are not visible to reads until `commit` succeeds.
//! - A failed commit keeps the staged set so the caller can retry.
//! - `forget` deletes immediately and drops any staged upsert for the key.

use super::{RecordKey, Storage, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use crate::model::field::{FieldMap, CREATED_AT_KEY, UPDATED_AT_KEY};
use log::{error, info};
use rusqlite::{params, Connection, Row};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

const UPSERT_SQL: &str = "INSERT INTO records (type_name, id, created_at, updated_at, fields)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (type_name, id) DO UPDATE SET
    created_at = excluded.created_at,
    updated_at = excluded.updated_at,
    fields = excluded.fields;";

/// Relational storage backend over one `records` table.
pub struct SqliteStorage {
    conn: Connection,
    staged: BTreeMap<RecordKey, FieldMap>,
}

impl SqliteStorage {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            staged: BTreeMap::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Number of registered records waiting for `commit`.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn write_staged(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for (key, fields) in &self.staged {
                let (created_at, updated_at) = row_timestamps(key, fields)?;
                stmt.execute(params![
                    key.type_name(),
                    key.id(),
                    created_at,
                    updated_at,
                    serde_json::to_string(fields)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn register(&mut self, key: &RecordKey, fields: FieldMap) -> StorageResult<()> {
        key.ensure_addressable()?;
        row_timestamps(key, &fields)?;
        self.staged.insert(key.clone(), fields);
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        match self.write_staged() {
            Ok(()) => {
                info!(
                    "event=storage_commit module=storage backend=sqlite status=ok records={} duration_ms={}",
                    self.staged.len(),
                    started_at.elapsed().as_millis()
                );
                self.staged.clear();
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=storage_commit module=storage backend=sqlite status=error records={} error={}",
                    self.staged.len(),
                    err
                );
                Err(err)
            }
        }
    }

    fn forget(&mut self, key: &RecordKey) -> StorageResult<()> {
        self.staged.remove(key);
        self.conn.execute(
            "DELETE FROM records WHERE type_name = ?1 AND id = ?2;",
            params![key.type_name(), key.id()],
        )?;
        Ok(())
    }

    fn lookup(&self, key: &RecordKey) -> StorageResult<Option<FieldMap>> {
        let mut stmt = self.conn.prepare(
            "SELECT type_name, id, fields
             FROM records
             WHERE type_name = ?1 AND id = ?2;",
        )?;
        let mut rows = stmt.query(params![key.type_name(), key.id()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_record_row(row)?.1)),
            None => Ok(None),
        }
    }

    fn all(&self, type_name: Option<&str>) -> StorageResult<Vec<(RecordKey, FieldMap)>> {
        let mut stmt = self.conn.prepare(
            "SELECT type_name, id, fields
             FROM records
             WHERE ?1 IS NULL OR type_name = ?1
             ORDER BY type_name ASC, created_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query([type_name])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn count(&self, type_name: Option<&str>) -> StorageResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE ?1 IS NULL OR type_name = ?1;",
            [type_name],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn reload(&mut self) -> StorageResult<()> {
        self.staged.clear();
        Ok(())
    }
}

fn row_timestamps<'a>(key: &RecordKey, fields: &'a FieldMap) -> StorageResult<(&'a str, &'a str)> {
    let text = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| StorageError::InvalidDocument {
                key: key.to_string(),
                message: format!("`{name}` must be a timestamp string"),
            })
    };
    Ok((text(CREATED_AT_KEY)?, text(UPDATED_AT_KEY)?))
}

fn parse_record_row(row: &Row<'_>) -> StorageResult<(RecordKey, FieldMap)> {
    let key = RecordKey::new(
        row.get::<_, String>("type_name")?,
        row.get::<_, String>("id")?,
    );
    let text: String = row.get("fields")?;
    let fields = serde_json::from_str::<FieldMap>(&text).map_err(|err| {
        StorageError::InvalidDocument {
            key: key.to_string(),
            message: format!("invalid fields json: {err}"),
        }
    })?;
    Ok((key, fields))
}
