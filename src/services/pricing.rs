//! Conference pricing.
//!
//! Pure functions over the selected events and the active catalog:
//! - Sum the prices of the selected events
//! - Apply the bundle discount when the selection covers every conference day
//! - Decide whether the registrant must pay

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        conference::{Membership, Quote},
        event::Event,
    },
};

/// Number of conference-status events that make up the full bundle.
pub const CONFERENCE_BUNDLE_SIZE: usize = 3;

/// Resolve selected ids against the active catalog.
///
/// Duplicate ids are counted once and keep their first position.
///
/// # Errors
///
/// `EventUnavailable` for the first id that is not in the catalog (unknown
/// or deactivated since the form was loaded).
pub fn resolve_selection<'a>(
    selected_ids: &[Uuid],
    catalog: &'a [Event],
) -> Result<Vec<&'a Event>, AppError> {
    let mut selected: Vec<&Event> = Vec::with_capacity(selected_ids.len());

    for id in selected_ids {
        if selected.iter().any(|event| event.id == *id) {
            continue;
        }

        let event = catalog
            .iter()
            .find(|event| event.id == *id)
            .ok_or(AppError::EventUnavailable(*id))?;
        selected.push(event);
    }

    Ok(selected)
}

/// Price a resolved selection.
///
/// The discount applies only when exactly [`CONFERENCE_BUNDLE_SIZE`]
/// conference events exist in the catalog and all of them are selected. It
/// never pushes the total below zero.
pub fn quote(
    selected: &[&Event],
    catalog: &[Event],
    membership: Membership,
    bundle_discount_cents: i64,
) -> Quote {
    let subtotal_cents: i64 = selected.iter().map(|event| event.price_cents).sum();

    let conference_in_catalog = catalog.iter().filter(|event| event.is_conference()).count();
    let conference_selected = selected.iter().filter(|event| event.is_conference()).count();

    let discount_cents = if conference_in_catalog == CONFERENCE_BUNDLE_SIZE
        && conference_selected == CONFERENCE_BUNDLE_SIZE
    {
        bundle_discount_cents.clamp(0, subtotal_cents)
    } else {
        0
    };

    let total_cents = subtotal_cents - discount_cents;

    Quote {
        subtotal_cents,
        discount_cents,
        total_cents,
        requires_payment: requires_payment(membership, total_cents),
    }
}

/// Members register for free; everyone else pays whenever there is something to pay.
pub fn requires_payment(membership: Membership, total_cents: i64) -> bool {
    membership == Membership::No && total_cents > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventStatus;
    use assert_matches::assert_matches;
    use chrono::Utc;

    const DISCOUNT: i64 = 150_000;

    fn event(price_pesos: i64, status: EventStatus) -> Event {
        Event {
            id: Uuid::new_v4(),
            name: format!("{} event", status.as_str()),
            description: None,
            price_cents: price_pesos * 100,
            status: status.as_str().to_string(),
            is_active: true,
            starts_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn conference_catalog() -> Vec<Event> {
        vec![
            event(3000, EventStatus::Conference),
            event(3000, EventStatus::Conference),
            event(1500, EventStatus::Conference),
            event(800, EventStatus::Workshop),
        ]
    }

    fn ids(events: &[&Event]) -> Vec<Uuid> {
        events.iter().map(|event| event.id).collect()
    }

    #[test]
    fn full_conference_bundle_gets_the_discount() {
        let catalog = conference_catalog();
        let picked: Vec<&Event> = catalog.iter().take(3).collect();
        let selected = resolve_selection(&ids(&picked), &catalog).unwrap();

        let quote = quote(&selected, &catalog, Membership::No, DISCOUNT);

        assert_eq!(quote.subtotal_cents, 750_000);
        assert_eq!(quote.discount_cents, 150_000);
        assert_eq!(quote.total_cents, 600_000);
        assert!(quote.requires_payment);
    }

    #[test]
    fn bundle_plus_workshop_keeps_the_discount() {
        let catalog = conference_catalog();
        let picked: Vec<&Event> = catalog.iter().collect();
        let selected = resolve_selection(&ids(&picked), &catalog).unwrap();

        let quote = quote(&selected, &catalog, Membership::No, DISCOUNT);

        assert_eq!(quote.total_cents, 750_000 + 80_000 - 150_000);
    }

    #[test]
    fn partial_bundle_pays_full_price() {
        let catalog = conference_catalog();
        let picked: Vec<&Event> = catalog.iter().take(2).collect();
        let selected = resolve_selection(&ids(&picked), &catalog).unwrap();

        let quote = quote(&selected, &catalog, Membership::No, DISCOUNT);

        assert_eq!(quote.discount_cents, 0);
        assert_eq!(quote.total_cents, 600_000);
    }

    #[test]
    fn no_discount_when_catalog_has_a_fourth_conference_event() {
        let mut catalog = conference_catalog();
        catalog.push(event(2000, EventStatus::Conference));
        let picked: Vec<&Event> = catalog.iter().take(3).collect();
        let selected = resolve_selection(&ids(&picked), &catalog).unwrap();

        let quote = quote(&selected, &catalog, Membership::No, DISCOUNT);

        assert_eq!(quote.discount_cents, 0);
        assert_eq!(quote.total_cents, 750_000);
    }

    #[test]
    fn member_never_requires_payment() {
        let catalog = conference_catalog();
        let picked: Vec<&Event> = catalog.iter().take(3).collect();
        let selected = resolve_selection(&ids(&picked), &catalog).unwrap();

        let quote = quote(&selected, &catalog, Membership::Yes, DISCOUNT);

        assert_eq!(quote.total_cents, 600_000);
        assert!(!quote.requires_payment);
    }

    #[test]
    fn zero_total_does_not_require_payment() {
        assert!(!requires_payment(Membership::No, 0));
        assert!(requires_payment(Membership::No, 1));
        assert!(!requires_payment(Membership::Yes, 1));
    }

    #[test]
    fn duplicate_ids_are_counted_once() {
        let catalog = conference_catalog();
        let workshop = catalog[3].id;

        let selected = resolve_selection(&[workshop, workshop], &catalog).unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(quote(&selected, &catalog, Membership::No, DISCOUNT).total_cents, 80_000);
    }

    #[test]
    fn unknown_event_is_rejected() {
        let catalog = conference_catalog();
        let retired = Uuid::new_v4();

        let result = resolve_selection(&[catalog[0].id, retired], &catalog);

        assert_matches!(result, Err(AppError::EventUnavailable(id)) if id == retired);
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let catalog = vec![
            event(100, EventStatus::Conference),
            event(100, EventStatus::Conference),
            event(100, EventStatus::Conference),
        ];
        let picked: Vec<&Event> = catalog.iter().collect();
        let selected = resolve_selection(&ids(&picked), &catalog).unwrap();

        let quote = quote(&selected, &catalog, Membership::No, DISCOUNT);

        assert_eq!(quote.discount_cents, 30_000);
        assert_eq!(quote.total_cents, 0);
        assert!(!quote.requires_payment);
    }
}
