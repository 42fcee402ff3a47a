use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::error::{IdrecError, IdrecResult};
use crate::model::{Contact, ContactId, LinkPrecedence, NewContact};

const CONTACT_COLUMNS: &str =
    "id, email, phone_number, linked_id, link_precedence, created_at, updated_at, deleted_at";

/// Storage contract consumed by the resolver.
///
/// Multi-row reads return contacts in ascending id order.
pub trait ContactRepository {
    /// Active contacts whose email or phone number equals one of the supplied
    /// values. Only supplied fields are used as predicates.
    fn find_active_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> IdrecResult<Vec<Contact>>;

    /// Active contacts that are in `ids` or whose `linked_id` is in `ids`.
    fn find_connected_component(&self, ids: &[ContactId]) -> IdrecResult<Vec<Contact>>;

    fn insert(&self, contact: &NewContact) -> IdrecResult<Contact>;

    /// Updates link fields, leaving `None` fields untouched, and refreshes
    /// `updated_at`.
    fn update_link(
        &self,
        id: ContactId,
        linked_id: Option<ContactId>,
        precedence: Option<LinkPrecedence>,
    ) -> IdrecResult<()>;

    /// Looks up a contact by id, including soft-deleted ones.
    fn find_by_id(&self, id: ContactId) -> IdrecResult<Option<Contact>>;

    /// Marks an active contact as deleted.
    fn soft_delete(&self, id: ContactId) -> IdrecResult<()>;
}

/// SQLite-backed contact repository. Works over a plain connection or a
/// transaction.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_contacts(&self, sql: &str, values: Vec<Value>) -> IdrecResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare(sql)?;
        let contacts = stmt
            .query_map(params_from_iter(values), |row| Ok(row_to_contact(row)))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .collect::<IdrecResult<Vec<_>>>()?;
        Ok(contacts)
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn find_active_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> IdrecResult<Vec<Contact>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(email) = email {
            conditions.push("email = ?");
            values.push(Value::Text(email.to_string()));
        }
        if let Some(phone_number) = phone_number {
            conditions.push("phone_number = ?");
            values.push(Value::Text(phone_number.to_string()));
        }
        if conditions.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE deleted_at IS NULL AND ({})
             ORDER BY id",
            conditions.join(" OR ")
        );
        self.query_contacts(&sql, values)
    }

    fn find_connected_component(&self, ids: &[ContactId]) -> IdrecResult<Vec<Contact>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Numbered placeholders are bound once and referenced by both IN lists.
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE deleted_at IS NULL
               AND (id IN ({placeholders}) OR linked_id IN ({placeholders}))
             ORDER BY id"
        );
        let values = ids
            .iter()
            .map(|id| Value::Integer(id.value()))
            .collect();
        self.query_contacts(&sql, values)
    }

    fn insert(&self, contact: &NewContact) -> IdrecResult<Contact> {
        let created_at = now();
        let stamp = format_timestamp(&created_at);
        self.conn.execute(
            "INSERT INTO contacts (email, phone_number, linked_id, link_precedence, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                contact.email,
                contact.phone_number,
                contact.linked_id.map(ContactId::value),
                contact.link_precedence.as_str(),
                stamp,
            ],
        )?;

        Ok(Contact {
            id: ContactId::new(self.conn.last_insert_rowid()),
            email: contact.email.clone(),
            phone_number: contact.phone_number.clone(),
            linked_id: contact.linked_id,
            link_precedence: contact.link_precedence,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        })
    }

    fn update_link(
        &self,
        id: ContactId,
        linked_id: Option<ContactId>,
        precedence: Option<LinkPrecedence>,
    ) -> IdrecResult<()> {
        let changed = self.conn.execute(
            "UPDATE contacts
             SET linked_id = COALESCE(?1, linked_id),
                 link_precedence = COALESCE(?2, link_precedence),
                 updated_at = ?3
             WHERE id = ?4",
            params![
                linked_id.map(ContactId::value),
                precedence.map(LinkPrecedence::as_str),
                format_timestamp(&now()),
                id.value(),
            ],
        )?;

        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn find_by_id(&self, id: ContactId) -> IdrecResult<Option<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;

        let result = stmt.query_row(params![id.value()], |row| Ok(row_to_contact(row)));

        match result {
            Ok(contact) => Ok(Some(contact?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn soft_delete(&self, id: ContactId) -> IdrecResult<()> {
        let stamp = format_timestamp(&now());
        let changed = self.conn.execute(
            "UPDATE contacts SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
            params![stamp, id.value()],
        )?;

        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// RFC 3339 UTC with fixed microsecond precision, so text order matches time
/// order.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str, column: &str) -> IdrecResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            IdrecError::InvalidData(format!("invalid timestamp `{}` in contacts.{}: {}", value, column, e))
        })
}

fn not_found(id: ContactId) -> IdrecError {
    IdrecError::NotFound {
        entity_type: "Contact".into(),
        id: id.to_string(),
    }
}

fn row_to_contact(row: &Row) -> IdrecResult<Contact> {
    let id: i64 = row.get(0)?;
    let email: Option<String> = row.get(1)?;
    let phone_number: Option<String> = row.get(2)?;
    let linked_id: Option<i64> = row.get(3)?;
    let precedence_str: String = row.get(4)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;
    let deleted_at_str: Option<String> = row.get(7)?;

    let link_precedence = LinkPrecedence::parse(&precedence_str).ok_or_else(|| {
        IdrecError::InvalidData(format!(
            "invalid link precedence `{}` in contacts.link_precedence",
            precedence_str
        ))
    })?;

    Ok(Contact {
        id: ContactId::new(id),
        email,
        phone_number,
        linked_id: linked_id.map(ContactId::new),
        link_precedence,
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        updated_at: parse_timestamp(&updated_at_str, "updated_at")?,
        deleted_at: deleted_at_str
            .map(|s| parse_timestamp(&s, "deleted_at"))
            .transpose()?,
    })
}
