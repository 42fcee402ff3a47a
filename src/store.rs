//! Shared handle over one SQLite connection.
//!
//! A `ContactStore` is opened once at startup, passed by reference (or behind
//! an `Arc`) to whatever serves requests, and closed at shutdown. Every
//! operation holds the connection lock for its full duration.

use log::info;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::db::{schema, SqliteContactRepository};
use crate::error::{IdrecError, IdrecResult};
use crate::model::{ConsolidatedIdentity, ContactId, IdentifyRequest, IdentifyResponse};
use crate::ops::{contact_ops, identify_ops};
use crate::queries::identity_queries;
use crate::queries::stats_queries::{self, IdentityStats};

pub struct ContactStore {
    conn: Mutex<Connection>,
}

impl ContactStore {
    pub fn open(path: impl AsRef<Path>) -> IdrecResult<Self> {
        Ok(Self::from_connection(schema::open(path)?))
    }

    pub fn open_in_memory() -> IdrecResult<Self> {
        Ok(Self::from_connection(schema::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn identify(&self, request: &IdentifyRequest) -> IdrecResult<IdentifyResponse> {
        let mut conn = self.lock()?;
        identify_ops::identify(&mut conn, request)
    }

    /// Both reads run in one transaction so a merge committed by another
    /// connection cannot land between the contact lookup and its component.
    pub fn identity_for(&self, contact_id: ContactId) -> IdrecResult<Option<ConsolidatedIdentity>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let identity =
            identity_queries::identity_for(&SqliteContactRepository::new(&tx), contact_id)?;
        tx.commit()?;
        Ok(identity)
    }

    pub fn soft_delete(&self, contact_id: ContactId) -> IdrecResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        contact_ops::soft_delete_contact(&SqliteContactRepository::new(&tx), contact_id)?;
        tx.commit()?;
        Ok(())
    }

    pub fn stats(&self) -> IdrecResult<IdentityStats> {
        let conn = self.lock()?;
        stats_queries::stats(&conn)
    }

    /// Closes the underlying connection, reporting any error SQLite raises
    /// while finalizing it.
    pub fn close(self) -> IdrecResult<()> {
        let conn = self.conn.into_inner().map_err(|_| IdrecError::LockPoisoned)?;
        conn.close().map_err(|(_, err)| IdrecError::Database(err))?;
        info!("event=store_close module=store status=ok");
        Ok(())
    }

    fn lock(&self) -> IdrecResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| IdrecError::LockPoisoned)
    }
}
