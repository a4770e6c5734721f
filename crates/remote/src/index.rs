// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Document metadata index.
//!
//! The index mirrors a denormalized record per document so that documents
//! can be queried by type, owner or property without walking the remote
//! tree. [`SqliteIndex`] stores it in SQLite.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use cs_core::{Document, DocumentType, Visibility};

use crate::error::{RemoteError, Result};

/// Denormalized metadata for one document within one context (class).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub context_id: String,
    pub document_key: String,
    pub uid: String,
    pub doc_type: DocumentType,
    pub visibility: Visibility,
    pub title: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub created_at: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl IndexRecord {
    /// Snapshot of a document's current metadata.
    pub fn from_document(context_id: &str, doc: &Document, now: DateTime<Utc>) -> Self {
        IndexRecord {
            context_id: context_id.to_string(),
            document_key: doc.key().to_string(),
            uid: doc.uid().to_string(),
            doc_type: doc.doc_type(),
            visibility: doc.visibility(),
            title: doc.title(),
            properties: doc.properties(),
            created_at: doc.created_at(),
            updated_at: now,
        }
    }
}

/// Query interface over indexed document metadata.
pub trait MetadataIndex: Send + Sync {
    /// Inserts or replaces the record for `(context_id, document_key)`.
    fn upsert(&self, record: &IndexRecord) -> Result<()>;
    fn get(&self, context_id: &str, document_key: &str) -> Result<Option<IndexRecord>>;
    /// Returns true if a record was removed.
    fn remove(&self, context_id: &str, document_key: &str) -> Result<bool>;
    fn documents_of_type(&self, context_id: &str, doc_type: DocumentType) -> Result<Vec<IndexRecord>>;
    fn documents_for_user(&self, context_id: &str, uid: &str) -> Result<Vec<IndexRecord>>;
    fn documents_with_property(
        &self,
        context_id: &str,
        name: &str,
        value: &str,
    ) -> Result<Vec<IndexRecord>>;
}

/// SQL schema for the metadata index.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    context_id TEXT NOT NULL,
    document_key TEXT NOT NULL,
    uid TEXT NOT NULL,
    type TEXT NOT NULL,
    visibility TEXT NOT NULL DEFAULT 'private',
    title TEXT,
    created_at INTEGER,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (context_id, document_key)
);

-- Properties as raw name/value strings
CREATE TABLE IF NOT EXISTS document_properties (
    context_id TEXT NOT NULL,
    document_key TEXT NOT NULL,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (context_id, document_key, name),
    FOREIGN KEY (context_id, document_key)
        REFERENCES documents(context_id, document_key) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(context_id, type);
CREATE INDEX IF NOT EXISTS idx_documents_uid ON documents(context_id, uid);
CREATE INDEX IF NOT EXISTS idx_properties_value ON document_properties(context_id, name, value);
"#;

/// Run schema creation on a connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Parse a stored string column, returning a rusqlite error on failure.
fn parse_db<T: std::str::FromStr>(value: &str, column: &str) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(RemoteError::Index(format!("invalid value '{value}' in column '{column}'"))),
        )
    })
}

fn parse_timestamp(value: &str, column: &str) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(RemoteError::Index(format!("invalid timestamp '{value}' in column '{column}'"))),
        )
    })
}

const SELECT_COLUMNS: &str =
    "SELECT context_id, document_key, uid, type, visibility, title, created_at, updated_at FROM documents";

fn row_to_record(row: &rusqlite::Row<'_>) -> std::result::Result<IndexRecord, rusqlite::Error> {
    let type_str: String = row.get(3)?;
    let visibility_str: String = row.get(4)?;
    let updated_str: String = row.get(7)?;
    Ok(IndexRecord {
        context_id: row.get(0)?,
        document_key: row.get(1)?,
        uid: row.get(2)?,
        doc_type: parse_db(&type_str, "type")?,
        visibility: parse_db(&visibility_str, "visibility")?,
        title: row.get(5)?,
        properties: BTreeMap::new(),
        created_at: row.get(6)?,
        updated_at: parse_timestamp(&updated_str, "updated_at")?,
    })
}

/// SQLite-backed [`MetadataIndex`].
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open or create an index at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RemoteError::Index(format!("cannot create {}: {e}", parent.display())))?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        run_migrations(&conn)?;
        debug!(path = %path.display(), "opened metadata index");
        Ok(SqliteIndex { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;
        Ok(SqliteIndex { conn: Mutex::new(conn) })
    }

    fn query(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<IndexRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let sql = format!("{SELECT_COLUMNS} WHERE {filter} ORDER BY created_at, document_key");
        let mut stmt = conn.prepare(&sql)?;
        let mut records = stmt
            .query_map(args, row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for record in &mut records {
            record.properties = load_properties(&conn, &record.context_id, &record.document_key)?;
        }
        Ok(records)
    }
}

fn load_properties(conn: &Connection, context_id: &str, key: &str) -> Result<BTreeMap<String, String>> {
    let mut stmt = conn.prepare(
        "SELECT name, value FROM document_properties WHERE context_id = ?1 AND document_key = ?2",
    )?;
    let properties = stmt
        .query_map(params![context_id, key], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<BTreeMap<String, String>, _>>()?;
    Ok(properties)
}

fn write_properties(tx: &Transaction<'_>, record: &IndexRecord) -> Result<()> {
    tx.execute(
        "DELETE FROM document_properties WHERE context_id = ?1 AND document_key = ?2",
        params![record.context_id, record.document_key],
    )?;
    for (name, value) in &record.properties {
        tx.execute(
            "INSERT INTO document_properties (context_id, document_key, name, value)
             VALUES (?1, ?2, ?3, ?4)",
            params![record.context_id, record.document_key, name, value],
        )?;
    }
    Ok(())
}

impl MetadataIndex for SqliteIndex {
    fn upsert(&self, record: &IndexRecord) -> Result<()> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO documents
                (context_id, document_key, uid, type, visibility, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(context_id, document_key) DO UPDATE SET
                uid = excluded.uid,
                type = excluded.type,
                visibility = excluded.visibility,
                title = excluded.title,
                created_at = COALESCE(excluded.created_at, documents.created_at),
                updated_at = excluded.updated_at",
            params![
                record.context_id,
                record.document_key,
                record.uid,
                record.doc_type.as_str(),
                record.visibility.as_str(),
                record.title,
                record.created_at,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        write_properties(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, context_id: &str, document_key: &str) -> Result<Option<IndexRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let record = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE context_id = ?1 AND document_key = ?2"),
                params![context_id, document_key],
                row_to_record,
            )
            .optional()?;
        match record {
            Some(mut record) => {
                record.properties = load_properties(&conn, context_id, document_key)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn remove(&self, context_id: &str, document_key: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let affected = conn.execute(
            "DELETE FROM documents WHERE context_id = ?1 AND document_key = ?2",
            params![context_id, document_key],
        )?;
        Ok(affected > 0)
    }

    fn documents_of_type(&self, context_id: &str, doc_type: DocumentType) -> Result<Vec<IndexRecord>> {
        self.query("context_id = ?1 AND type = ?2", params![context_id, doc_type.as_str()])
    }

    fn documents_for_user(&self, context_id: &str, uid: &str) -> Result<Vec<IndexRecord>> {
        self.query("context_id = ?1 AND uid = ?2", params![context_id, uid])
    }

    fn documents_with_property(
        &self,
        context_id: &str,
        name: &str,
        value: &str,
    ) -> Result<Vec<IndexRecord>> {
        self.query(
            "context_id = ?1 AND document_key IN (
                SELECT document_key FROM document_properties
                WHERE context_id = ?1 AND name = ?2 AND value = ?3)",
            params![context_id, name, value],
        )
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
