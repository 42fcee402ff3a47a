//! Identity resolution: match, merge and extend contact components so that
//! every identity has exactly one primary.

use log::{debug, error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::HashSet;

use crate::db::{ContactRepository, SqliteContactRepository};
use crate::error::{IdrecError, IdrecResult};
use crate::model::{Contact, ContactId, IdentifyRequest, IdentifyResponse, LinkPrecedence, NewContact};
use crate::queries::identity_queries;
use crate::validation;

/// Outcome of one resolution: the final component plus what it took to get
/// there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Contacts of the resolved identity in ascending id order, with any
    /// contact created by this call last.
    pub component: Vec<Contact>,
    /// Active contacts matched directly by the request.
    pub matched: usize,
    /// Primaries demoted to secondaries by a merge.
    pub demoted: usize,
    /// Secondaries re-pointed from a demoted primary to the survivor.
    pub relinked: usize,
    pub created: Option<ContactId>,
}

/// Result of demoting competing primaries.
struct Merge {
    survivor: ContactId,
    demoted: usize,
    relinked: usize,
}

/// Resolves an identify request against storage and returns its consolidated
/// view.
///
/// The whole read-merge-write sequence runs in one `BEGIN IMMEDIATE`
/// transaction, so concurrent resolutions on the same database are serialized
/// and a failure at any step leaves storage untouched.
pub fn identify(conn: &mut Connection, request: &IdentifyRequest) -> IdrecResult<IdentifyResponse> {
    let (email, phone_number) =
        validation::require_identifier(request.email.as_deref(), request.phone_number.as_deref())?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let (resolution, contact) = {
        let repo = SqliteContactRepository::new(&tx);
        let resolution = resolve(&repo, email.as_deref(), phone_number.as_deref())?;
        let contact = identity_queries::consolidate(&resolution.component)?;
        (resolution, contact)
    };
    tx.commit()?;

    info!(
        "event=identify module=ops status=ok primary_id={} matched={} demoted={} relinked={} created_id={}",
        contact.primary_contact_id,
        resolution.matched,
        resolution.demoted,
        resolution.relinked,
        resolution
            .created
            .map_or_else(|| "none".to_string(), |id| id.to_string())
    );
    Ok(IdentifyResponse { contact })
}

/// Runs the resolution algorithm against a repository.
///
/// Writes happen only when the request creates a new identity, merges
/// previously independent primaries, or contributes an unseen email or phone
/// number. At most one contact is inserted per call.
pub fn resolve<R: ContactRepository + ?Sized>(
    repo: &R,
    email: Option<&str>,
    phone_number: Option<&str>,
) -> IdrecResult<Resolution> {
    let (email, phone_number) = validation::require_identifier(email, phone_number)?;
    let email = email.as_deref();
    let phone_number = phone_number.as_deref();

    let matches = repo.find_active_by_email_or_phone(email, phone_number)?;
    if matches.is_empty() {
        let contact = repo.insert(&NewContact::primary(
            email.map(str::to_string),
            phone_number.map(str::to_string),
        ))?;
        info!(
            "event=contact_create module=ops status=ok id={} precedence=primary",
            contact.id
        );
        return Ok(Resolution {
            created: Some(contact.id),
            component: vec![contact],
            matched: 0,
            demoted: 0,
            relinked: 0,
        });
    }

    let mut component = repo.find_connected_component(&component_seeds(&matches))?;
    debug!(
        "event=identify_expand module=ops matched={} component={}",
        matches.len(),
        component.len()
    );

    let (demoted, relinked) = match merge_primaries(repo, &component)? {
        Some(merge) => {
            component = repo.find_connected_component(&[merge.survivor])?;
            (merge.demoted, merge.relinked)
        }
        None => (0, 0),
    };

    let primary_id = sole_primary(&component)?;

    let new_email = email.filter(|e| !component.iter().any(|c| c.email.as_deref() == Some(*e)));
    let new_phone = phone_number
        .filter(|p| !component.iter().any(|c| c.phone_number.as_deref() == Some(*p)));

    let mut created = None;
    if new_email.is_some() || new_phone.is_some() {
        let contact = repo.insert(&NewContact::secondary(
            primary_id,
            new_email.map(str::to_string),
            new_phone.map(str::to_string),
        ))?;
        info!(
            "event=contact_create module=ops status=ok id={} precedence=secondary linked_id={}",
            contact.id, primary_id
        );
        created = Some(contact.id);
        component.push(contact);
    }

    Ok(Resolution {
        component,
        matched: matches.len(),
        demoted,
        relinked,
        created,
    })
}

/// Ids from which the component is expanded: every matched contact and the
/// primary it links to, so a match on a secondary still reaches its primary.
fn component_seeds(matches: &[Contact]) -> Vec<ContactId> {
    let mut seeds: Vec<ContactId> = matches
        .iter()
        .flat_map(|c| [Some(c.id), c.linked_id])
        .flatten()
        .collect();
    seeds.sort();
    seeds.dedup();
    seeds
}

/// Demotes every primary but the oldest and re-points their secondaries.
/// Returns the survivor and write counts when a merge happened.
fn merge_primaries<R: ContactRepository + ?Sized>(
    repo: &R,
    component: &[Contact],
) -> IdrecResult<Option<Merge>> {
    let mut primaries: Vec<&Contact> = component.iter().filter(|c| c.is_primary()).collect();
    if primaries.len() <= 1 {
        return Ok(None);
    }

    primaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    let survivor = primaries[0].id;
    let losers: HashSet<ContactId> = primaries[1..].iter().map(|c| c.id).collect();

    for loser in &primaries[1..] {
        repo.update_link(loser.id, Some(survivor), Some(LinkPrecedence::Secondary))?;
    }

    let mut relinked = 0usize;
    for secondary in component
        .iter()
        .filter(|c| !c.is_primary() && c.linked_id.is_some_and(|l| losers.contains(&l)))
    {
        repo.update_link(secondary.id, Some(survivor), None)?;
        relinked += 1;
    }

    info!(
        "event=contact_merge module=ops status=ok survivor={} demoted={} relinked={}",
        survivor,
        losers.len(),
        relinked
    );
    Ok(Some(Merge {
        survivor,
        demoted: losers.len(),
        relinked,
    }))
}

fn sole_primary(component: &[Contact]) -> IdrecResult<ContactId> {
    let primaries: Vec<&Contact> = component.iter().filter(|c| c.is_primary()).collect();
    match primaries.as_slice() {
        [primary] => Ok(primary.id),
        _ => {
            error!(
                "event=invariant_violation module=ops status=error component={} primaries={}",
                component.len(),
                primaries.len()
            );
            Err(IdrecError::InvariantViolation {
                detail: format!(
                    "resolved component of {} contact(s) has {} primaries",
                    component.len(),
                    primaries.len()
                ),
            })
        }
    }
}
