use log::error;
use std::collections::HashSet;

use crate::db::ContactRepository;
use crate::error::{IdrecError, IdrecResult};
use crate::model::{ConsolidatedIdentity, Contact, ContactId};

/// Projects a resolved component into its consolidated view.
///
/// The primary's email and phone number come first; remaining values follow
/// in ascending contact id order, without duplicates or blanks. Secondary ids
/// are ascending. Fails with `InvariantViolation` unless the component has
/// exactly one primary and every other contact links to it.
pub fn consolidate(contacts: &[Contact]) -> IdrecResult<ConsolidatedIdentity> {
    let primaries: Vec<&Contact> = contacts.iter().filter(|c| c.is_primary()).collect();
    let primary = match primaries.as_slice() {
        [primary] => *primary,
        _ => {
            return Err(violation(format!(
                "component of {} contact(s) has {} primaries",
                contacts.len(),
                primaries.len()
            )))
        }
    };

    if let Some(stray) = contacts
        .iter()
        .find(|c| !c.is_primary() && c.linked_id != Some(primary.id))
    {
        return Err(violation(format!(
            "secondary {} is not linked to primary {}",
            stray.id, primary.id
        )));
    }

    let mut ordered: Vec<&Contact> = contacts.iter().collect();
    ordered.sort_by_key(|c| c.id);

    let emails = unique_values(
        primary.email.as_deref(),
        ordered.iter().filter_map(|c| c.email.as_deref()),
    );
    let phone_numbers = unique_values(
        primary.phone_number.as_deref(),
        ordered.iter().filter_map(|c| c.phone_number.as_deref()),
    );
    let secondary_contact_ids = ordered
        .iter()
        .filter(|c| !c.is_primary())
        .map(|c| c.id)
        .collect();

    Ok(ConsolidatedIdentity {
        primary_contact_id: primary.id,
        emails,
        phone_numbers,
        secondary_contact_ids,
    })
}

/// Consolidated view of the identity a contact belongs to, without writing
/// anything. `None` when the contact is unknown or soft-deleted.
///
/// Makes two reads; run it inside a transaction when other connections may
/// be writing.
pub fn identity_for<R: ContactRepository + ?Sized>(
    repo: &R,
    contact_id: ContactId,
) -> IdrecResult<Option<ConsolidatedIdentity>> {
    let contact = match repo.find_by_id(contact_id)? {
        Some(c) if c.is_active() => c,
        _ => return Ok(None),
    };

    let component = repo.find_connected_component(&[contact.root_id()])?;
    consolidate(&component).map(Some)
}

fn unique_values<'a>(
    first: Option<&'a str>,
    rest: impl Iterator<Item = &'a str>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(rest)
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(str::to_string)
        .collect()
}

fn violation(detail: String) -> IdrecError {
    error!(
        "event=invariant_violation module=queries status=error detail=\"{}\"",
        detail
    );
    IdrecError::InvariantViolation { detail }
}
