mod common;

use booking_core::{domain::BookingStatus, BookingAction};
use regex::Regex;

use common::{engine, seed};

#[test]
fn full_day_at_the_studio() {
    booking_core::init();
    let engine = engine();
    let code_shape = Regex::new(r"^[A-Z]{3}-\d{4}-\d{4}$").unwrap();

    let actions = [
        BookingAction::Complete,
        BookingAction::NoShow,
        BookingAction::Cancel,
        BookingAction::Complete,
    ];
    for (idx, action) in actions.into_iter().enumerate() {
        let booking = engine
            .create_booking(seed("cut", &format!("guest{idx}@example.com")))
            .unwrap();
        assert!(code_shape.is_match(&booking.code), "bad code {}", booking.code);
        engine.apply_action(booking.id, action).unwrap();
    }

    let analytics = engine.analytics();
    assert_eq!(analytics.total_bookings, 4);
    assert_eq!(analytics.status_counts.get(&BookingStatus::Captured), Some(&2));
    assert!(analytics.fees.net_payout_cents > 0);
    assert!(engine
        .bookings()
        .iter()
        .all(|booking| booking.financials.net_payout_cents >= 0));
}
