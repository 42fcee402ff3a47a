use log::info;

use crate::db::ContactRepository;
use crate::error::{IdrecError, IdrecResult};
use crate::model::ContactId;

/// Soft-deletes a contact so it no longer takes part in resolution.
///
/// A primary that still has active secondaries is refused: deleting it would
/// leave them linked to an inactive record.
pub fn soft_delete_contact<R: ContactRepository + ?Sized>(
    repo: &R,
    contact_id: ContactId,
) -> IdrecResult<()> {
    let contact = repo
        .find_by_id(contact_id)?
        .filter(|c| c.is_active())
        .ok_or_else(|| IdrecError::NotFound {
            entity_type: "Contact".into(),
            id: contact_id.to_string(),
        })?;

    if contact.is_primary() {
        let linked = repo
            .find_connected_component(&[contact.id])?
            .into_iter()
            .filter(|c| c.id != contact.id)
            .count();
        if linked > 0 {
            return Err(IdrecError::HasLinkedContacts {
                id: contact.id.value(),
                count: linked,
            });
        }
    }

    repo.soft_delete(contact.id)?;
    info!(
        "event=contact_soft_delete module=ops status=ok id={} precedence={}",
        contact.id,
        contact.link_precedence.as_str()
    );
    Ok(())
}
