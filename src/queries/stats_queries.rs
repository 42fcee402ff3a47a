use rusqlite::Connection;

use crate::error::IdrecResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityStats {
    pub active_contacts: usize,
    pub deleted_contacts: usize,
    /// Active primaries, one per known identity.
    pub identities: usize,
    pub secondaries: usize,
}

pub fn stats(conn: &Connection) -> IdrecResult<IdentityStats> {
    let (active, deleted, primaries, secondaries) = conn.query_row(
        "SELECT
            COALESCE(SUM(deleted_at IS NULL), 0),
            COALESCE(SUM(deleted_at IS NOT NULL), 0),
            COALESCE(SUM(deleted_at IS NULL AND link_precedence = 'primary'), 0),
            COALESCE(SUM(deleted_at IS NULL AND link_precedence = 'secondary'), 0)
         FROM contacts",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        },
    )?;

    Ok(IdentityStats {
        active_contacts: active as usize,
        deleted_contacts: deleted as usize,
        identities: primaries as usize,
        secondaries: secondaries as usize,
    })
}
