use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::IdrecResult;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize the database schema. Creates all tables if they don't exist.
pub fn initialize(conn: &Connection) -> IdrecResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_number TEXT,
            email TEXT,
            linked_id INTEGER REFERENCES contacts(id),
            link_precedence TEXT NOT NULL
                CHECK (link_precedence IN ('primary', 'secondary')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            CHECK ((link_precedence = 'primary') = (linked_id IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_contacts_email
            ON contacts(email) WHERE deleted_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_contacts_phone_number
            ON contacts(phone_number) WHERE deleted_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_contacts_linked_id
            ON contacts(linked_id) WHERE deleted_at IS NULL;
        ",
    )?;
    Ok(())
}

/// Opens a database file, configures the connection and applies the schema.
pub fn open(path: impl AsRef<Path>) -> IdrecResult<Connection> {
    let started_at = Instant::now();
    let result = Connection::open(path)
        .map_err(Into::into)
        .and_then(bootstrap);
    log_open("file", started_at, &result);
    result
}

/// Opens an in-memory database with the schema applied.
pub fn open_in_memory() -> IdrecResult<Connection> {
    let started_at = Instant::now();
    let result = Connection::open_in_memory()
        .map_err(Into::into)
        .and_then(bootstrap);
    log_open("memory", started_at, &result);
    result
}

fn bootstrap(conn: Connection) -> IdrecResult<Connection> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    initialize(&conn)?;
    Ok(conn)
}

fn log_open(mode: &str, started_at: Instant, result: &IdrecResult<Connection>) {
    match result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            mode,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }
}
