//! Metadata index — the SQLite row of truth for retention decisions.
//!
//! Invariant: a metadata row exists iff the corresponding blob exists in
//! the durable object store, with one bounded exception — a durable upload
//! that succeeds just before the metadata insert fails leaves an orphan
//! blob, reclaimable only by out-of-band audit. The local cache is not
//! part of this invariant.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use super::StoreError;
use crate::id::ArtifactId;

/// Fixed-width timestamp format: zero-padded, UTC, lexicographic order
/// matches chronological order, so SQLite can compare as text.
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One artifact's metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub id: ArtifactId,
    pub owner_key: String,
    pub created_at: DateTime<Utc>,
}

/// A submitting principal known to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRecord {
    pub owner_key: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Open the index at the given path and run migrations.
pub fn open_index(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory index (for testing).
pub fn open_memory_index() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;",
    )?;
    Ok(())
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running index migration v{version}");
            conn.execute_batch(sql)?;
        }
    }

    Ok(())
}

/// Current schema version (0 if no schema exists yet).
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Artifact rows
// ---------------------------------------------------------------------------

/// Insert a metadata record. Fails with `DuplicateKey` if the id already
/// exists — identifiers are never reused, so this is a fatal condition.
pub fn insert_artifact(conn: &Connection, record: &ArtifactRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO artifacts (id, owner_key, created_at) VALUES (?1, ?2, ?3)",
        params![
            record.id.to_string(),
            record.owner_key,
            fmt_ts(&record.created_at),
        ],
    )?;
    Ok(())
}

/// Look up one artifact's metadata.
pub fn find_artifact(
    conn: &Connection,
    id: &ArtifactId,
) -> Result<Option<ArtifactRecord>, StoreError> {
    let result = conn.query_row(
        "SELECT id, owner_key, created_at FROM artifacts WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    );

    match result {
        Ok(row) => Ok(Some(record_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All records strictly older than the retention window, in no guaranteed
/// order. The sweeper processes them independently.
pub fn find_expired(
    conn: &Connection,
    window: chrono::Duration,
) -> Result<Vec<ArtifactRecord>, StoreError> {
    let cutoff = fmt_ts(&(Utc::now() - window));

    let mut stmt =
        conn.prepare("SELECT id, owner_key, created_at FROM artifacts WHERE created_at < ?1")?;
    let rows = stmt.query_map(params![cutoff], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}

/// Delete a metadata record. Idempotent: deleting an absent id succeeds.
pub fn delete_artifact(conn: &Connection, id: &ArtifactId) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM artifacts WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(())
}

/// Total number of metadata rows (test and diagnostics helper).
pub fn count_artifacts(conn: &Connection) -> Result<i64, StoreError> {
    let count = conn.query_row("SELECT COUNT(*) FROM artifacts", [], |row| row.get(0))?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Owner rows
// ---------------------------------------------------------------------------

/// Insert or update an owner record. Written by the auth collaborator.
pub fn upsert_owner(
    conn: &Connection,
    owner_key: &str,
    display_name: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO owners (owner_key, display_name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(owner_key) DO UPDATE SET display_name = excluded.display_name",
        params![owner_key, display_name, fmt_ts(&Utc::now())],
    )?;
    Ok(())
}

/// Look up a submitting principal. Absence is not an error.
pub fn find_owner(conn: &Connection, owner_key: &str) -> Result<Option<OwnerRecord>, StoreError> {
    let result = conn.query_row(
        "SELECT owner_key, display_name, created_at FROM owners WHERE owner_key = ?1",
        params![owner_key],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    );

    match result {
        Ok((owner_key, display_name, created_at)) => Ok(Some(OwnerRecord {
            owner_key,
            display_name,
            created_at: parse_ts(&created_at)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn record_from_row(row: (String, String, String)) -> Result<ArtifactRecord, StoreError> {
    let (id, owner_key, created_at) = row;
    let id = id
        .parse()
        .map_err(|_| StoreError::Unavailable(format!("corrupt artifact id in index: {id}")))?;
    Ok(ArtifactRecord {
        id,
        owner_key,
        created_at: parse_ts(&created_at)?,
    })
}

fn fmt_ts(dt: &DateTime<Utc>) -> String {
    dt.naive_utc().format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| StoreError::Unavailable(format!("corrupt timestamp in index: {s}")))
}
