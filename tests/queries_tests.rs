use chrono::{TimeZone, Utc};
use idrec::db::*;
use idrec::error::IdrecError;
use idrec::model::*;
use idrec::ops::*;
use idrec::queries::*;
use std::collections::HashSet;

fn contact(id: i64, email: Option<&str>, phone: Option<&str>, linked_id: Option<i64>) -> Contact {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Contact {
        id: ContactId::new(id),
        email: email.map(str::to_string),
        phone_number: phone.map(str::to_string),
        linked_id: linked_id.map(ContactId::new),
        link_precedence: if linked_id.is_some() {
            LinkPrecedence::Secondary
        } else {
            LinkPrecedence::Primary
        },
        created_at: at,
        updated_at: at,
        deleted_at: None,
    }
}

fn ids(values: &[i64]) -> Vec<ContactId> {
    values.iter().copied().map(ContactId::new).collect()
}

// ==========================================================================
// CONSOLIDATION
// ==========================================================================

#[test]
fn single_primary_view() {
    let view = identity_queries::consolidate(&[contact(1, Some("a@x.com"), None, None)]).unwrap();
    assert_eq!(view.primary_contact_id, ContactId::new(1));
    assert_eq!(view.emails, vec!["a@x.com"]);
    assert!(view.phone_numbers.is_empty());
    assert!(view.secondary_contact_ids.is_empty());
}

#[test]
fn primary_values_lead_then_ascending_contact_id() {
    // Input order is deliberately scrambled.
    let contacts = [
        contact(9, Some("z@x.com"), Some("999"), Some(5)),
        contact(2, Some("b@x.com"), Some("222"), Some(5)),
        contact(5, Some("p@x.com"), Some("555"), None),
    ];

    let view = identity_queries::consolidate(&contacts).unwrap();

    assert_eq!(view.primary_contact_id, ContactId::new(5));
    assert_eq!(view.emails, vec!["p@x.com", "b@x.com", "z@x.com"]);
    assert_eq!(view.phone_numbers, vec!["555", "222", "999"]);
    assert_eq!(view.secondary_contact_ids, ids(&[2, 9]));
}

#[test]
fn values_are_deduplicated_and_blanks_skipped() {
    let contacts = [
        contact(1, Some("a@x.com"), Some("111"), None),
        contact(2, Some("a@x.com"), Some(""), Some(1)),
        contact(3, Some(""), Some("111"), Some(1)),
        contact(4, None, Some("222"), Some(1)),
        contact(5, Some("b@x.com"), Some("222"), Some(1)),
    ];

    let view = identity_queries::consolidate(&contacts).unwrap();

    assert_eq!(view.emails, vec!["a@x.com", "b@x.com"]);
    assert_eq!(view.phone_numbers, vec!["111", "222"]);
    assert_eq!(view.secondary_contact_ids, ids(&[2, 3, 4, 5]));
}

#[test]
fn primary_without_email_takes_secondary_order() {
    let contacts = [
        contact(1, None, Some("111"), None),
        contact(3, Some("c@x.com"), None, Some(1)),
        contact(2, Some("b@x.com"), None, Some(1)),
    ];

    let view = identity_queries::consolidate(&contacts).unwrap();
    assert_eq!(view.emails, vec!["b@x.com", "c@x.com"]);
    assert_eq!(view.phone_numbers, vec!["111"]);
}

#[test]
fn every_listed_value_belongs_to_some_contact() {
    let contacts = [
        contact(1, Some("a"), Some("1"), None),
        contact(2, Some("b"), None, Some(1)),
        contact(3, None, Some("2"), Some(1)),
        contact(4, Some("a"), Some("2"), Some(1)),
    ];

    let view = identity_queries::consolidate(&contacts).unwrap();

    for email in &view.emails {
        assert!(contacts.iter().any(|c| c.email.as_deref() == Some(email.as_str())));
    }
    for phone in &view.phone_numbers {
        assert!(contacts.iter().any(|c| c.phone_number.as_deref() == Some(phone.as_str())));
    }
    let unique: HashSet<&String> = view.emails.iter().chain(&view.phone_numbers).collect();
    assert_eq!(unique.len(), view.emails.len() + view.phone_numbers.len());
}

#[test]
fn zero_primaries_is_invariant_violation() {
    let err = identity_queries::consolidate(&[contact(2, Some("a"), None, Some(1))]).unwrap_err();
    assert!(matches!(err, IdrecError::InvariantViolation { .. }));
}

#[test]
fn empty_component_is_invariant_violation() {
    assert!(matches!(
        identity_queries::consolidate(&[]),
        Err(IdrecError::InvariantViolation { .. })
    ));
}

#[test]
fn two_primaries_is_invariant_violation() {
    let contacts = [contact(1, Some("a"), None, None), contact(2, Some("b"), None, None)];
    assert!(matches!(
        identity_queries::consolidate(&contacts),
        Err(IdrecError::InvariantViolation { .. })
    ));
}

#[test]
fn secondary_linked_elsewhere_is_invariant_violation() {
    let contacts = [contact(1, Some("a"), None, None), contact(2, Some("b"), None, Some(7))];
    assert!(matches!(
        identity_queries::consolidate(&contacts),
        Err(IdrecError::InvariantViolation { .. })
    ));
}

// ==========================================================================
// READ-ONLY LOOKUP
// ==========================================================================

#[test]
fn identity_for_secondary_returns_whole_identity() {
    let mut conn = schema::open_in_memory().unwrap();
    let first = identify_ops::identify(&mut conn, &IdentifyRequest::new(Some("a"), Some("1")))
        .unwrap()
        .contact;
    let merged = identify_ops::identify(&mut conn, &IdentifyRequest::new(Some("a"), Some("2")))
        .unwrap()
        .contact;
    let secondary = merged.secondary_contact_ids[0];

    let repo = SqliteContactRepository::new(&conn);
    let view = identity_queries::identity_for(&repo, secondary).unwrap().unwrap();

    assert_eq!(view.primary_contact_id, first.primary_contact_id);
    assert_eq!(view, merged);
}

#[test]
fn identity_for_unknown_or_deleted_is_none() {
    let mut conn = schema::open_in_memory().unwrap();
    let view = identify_ops::identify(&mut conn, &IdentifyRequest::new(Some("a"), None))
        .unwrap()
        .contact;
    let repo = SqliteContactRepository::new(&conn);

    assert!(identity_queries::identity_for(&repo, ContactId::new(500)).unwrap().is_none());

    contact_ops::soft_delete_contact(&repo, view.primary_contact_id).unwrap();
    assert!(identity_queries::identity_for(&repo, view.primary_contact_id)
        .unwrap()
        .is_none());
}

#[test]
fn identity_for_does_not_write() {
    let mut conn = schema::open_in_memory().unwrap();
    let view = identify_ops::identify(&mut conn, &IdentifyRequest::new(Some("a"), None))
        .unwrap()
        .contact;
    let before = stats_queries::stats(&conn).unwrap();

    let repo = SqliteContactRepository::new(&conn);
    identity_queries::identity_for(&repo, view.primary_contact_id).unwrap();

    assert_eq!(stats_queries::stats(&conn).unwrap(), before);
}

// ==========================================================================
// STATS
// ==========================================================================

#[test]
fn stats_on_empty_store() {
    let conn = schema::open_in_memory().unwrap();
    let stats = stats_queries::stats(&conn).unwrap();
    assert_eq!(stats.active_contacts, 0);
    assert_eq!(stats.deleted_contacts, 0);
    assert_eq!(stats.identities, 0);
    assert_eq!(stats.secondaries, 0);
}

#[test]
fn stats_count_identities_links_and_deletions() {
    let mut conn = schema::open_in_memory().unwrap();
    identify_ops::identify(&mut conn, &IdentifyRequest::new(Some("a"), Some("1"))).unwrap();
    let view = identify_ops::identify(&mut conn, &IdentifyRequest::new(Some("a"), Some("2")))
        .unwrap()
        .contact;
    identify_ops::identify(&mut conn, &IdentifyRequest::new(Some("b"), None)).unwrap();

    let repo = SqliteContactRepository::new(&conn);
    contact_ops::soft_delete_contact(&repo, view.secondary_contact_ids[0]).unwrap();

    let stats = stats_queries::stats(&conn).unwrap();
    assert_eq!(stats.identities, 2);
    assert_eq!(stats.secondaries, 0);
    assert_eq!(stats.active_contacts, 2);
    assert_eq!(stats.deleted_contacts, 1);
}
