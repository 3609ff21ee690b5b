mod common;

use booking_core::{
    core::services::{ProcessorOutcome, ResponseStatus},
    domain::{BookingStatus, GiftCardReason, PaymentKind, PaymentStatus, Policies},
    money::FeePolicy,
    BookingAction, BookingError,
};
use common::{config, engine, engine_with, seed};

#[test]
fn complete_captures_list_price_less_gift_card() {
    let engine = engine();
    engine.issue_gift_card("WELCOME", 5_000, None).unwrap();
    let booking = engine
        .create_booking(seed("cut", "ada@example.com").with_gift_card("welcome", 2_500))
        .unwrap();

    let response = engine
        .apply_action(booking.id, BookingAction::Complete)
        .unwrap();

    assert!(response.committed);
    assert_eq!(response.status, ResponseStatus::Success);
    let captured = &response.booking;
    assert_eq!(captured.status, BookingStatus::Captured);
    let capture = captured.payments.last().unwrap();
    assert_eq!(capture.kind, PaymentKind::Capture);
    assert_eq!(capture.status, PaymentStatus::Captured);
    assert_eq!(capture.amount_cents, 7_500);
    assert_eq!(captured.financials.platform_fee_cents, 75);
    assert_eq!(captured.financials.processor_fee_cents, 248);
    assert_eq!(captured.financials.net_payout_cents, 7_177);
}

#[test]
fn complete_twice_does_not_capture_twice() {
    let engine = engine();
    let booking = engine.create_booking(seed("cut", "ada@example.com")).unwrap();

    engine
        .apply_action(booking.id, BookingAction::Complete)
        .unwrap();
    let again = engine
        .apply_action(booking.id, BookingAction::Complete)
        .unwrap();

    assert!(!again.committed);
    assert_eq!(again.status, ResponseStatus::Success);
    let stored = engine.booking(booking.id).unwrap();
    assert_eq!(stored.payments.len(), 2);
    assert_eq!(stored.financials.platform_fee_cents, 100);
    assert_eq!(stored.financials.processor_fee_cents, 320);
}

#[test]
fn no_show_charges_half_the_list_price() {
    let engine = engine();
    let booking = engine.create_booking(seed("cut", "ada@example.com")).unwrap();

    let response = engine
        .apply_action(booking.id, BookingAction::NoShow)
        .unwrap();

    let stored = &response.booking;
    assert_eq!(stored.status, BookingStatus::NoShow);
    let fee = stored.payments.last().unwrap();
    assert_eq!(fee.kind, PaymentKind::NoShowFee);
    assert_eq!(fee.amount_cents, 5_000);
    assert_eq!(stored.financials.platform_fee_cents, 50);
    assert_eq!(stored.financials.processor_fee_cents, 175);
    assert_eq!(stored.financials.net_payout_cents, 4_775);
}

#[test]
fn zero_no_show_policy_appends_no_payment() {
    let mut config = config();
    config.policies = Policies {
        no_show: FeePolicy::flat(0.0),
        cancellation: FeePolicy::none(),
    };
    let engine = engine_with(config);
    let booking = engine.create_booking(seed("cut", "ada@example.com")).unwrap();

    let response = engine
        .apply_action(booking.id, BookingAction::NoShow)
        .unwrap();

    assert!(response.committed);
    assert_eq!(response.booking.status, BookingStatus::NoShow);
    assert_eq!(response.booking.payments.len(), 1);
    assert_eq!(response.booking.financials.net_payout_cents, 0);
    assert_eq!(response.booking.financials.processor_fee_cents, 0);
}

#[test]
fn cancel_charges_flat_policy_in_major_units() {
    let engine = engine();
    let booking = engine.create_booking(seed("cut", "ada@example.com")).unwrap();

    let response = engine
        .apply_action(booking.id, BookingAction::Cancel)
        .unwrap();

    let stored = &response.booking;
    assert_eq!(stored.status, BookingStatus::Canceled);
    let fee = stored.payments.last().unwrap();
    assert_eq!(fee.kind, PaymentKind::CancelFee);
    assert_eq!(fee.amount_cents, 2_500);
    assert_eq!(stored.financials.platform_fee_cents, 25);
    assert_eq!(stored.financials.processor_fee_cents, 103);
    assert_eq!(stored.financials.net_payout_cents, 2_372);
}

#[test]
fn refund_without_capture_is_a_reported_noop() {
    let engine = engine();
    let booking = engine.create_booking(seed("cut", "ada@example.com")).unwrap();

    let response = engine
        .apply_action(booking.id, BookingAction::Refund)
        .unwrap();

    assert!(!response.committed);
    assert_eq!(response.status, ResponseStatus::Success);
    assert!(response.message.to_lowercase().contains("nothing to refund"));
    assert_eq!(
        engine.booking(booking.id).unwrap().status,
        BookingStatus::Authorized
    );
}

#[test]
fn refund_returns_captured_amount_and_zeroes_fees() {
    let engine = engine();
    let booking = engine.create_booking(seed("cut", "ada@example.com")).unwrap();
    engine
        .apply_action(booking.id, BookingAction::Complete)
        .unwrap();

    let response = engine
        .apply_action(booking.id, BookingAction::Refund)
        .unwrap();
    let refunded = &response.booking;
    assert_eq!(refunded.status, BookingStatus::Refunded);
    let refund = refunded.payments.last().unwrap();
    assert_eq!(refund.kind, PaymentKind::Refund);
    assert_eq!(refund.status, PaymentStatus::Refunded);
    assert_eq!(refund.amount_cents, 10_000);
    assert_eq!(refunded.financials.platform_fee_cents, 0);
    assert_eq!(refunded.financials.processor_fee_cents, 0);
    assert_eq!(refunded.financials.net_payout_cents, 0);

    let again = engine
        .apply_action(booking.id, BookingAction::Refund)
        .unwrap();
    assert!(!again.committed);
    assert_eq!(engine.booking(booking.id).unwrap().payments.len(), 3);
}

#[test]
fn refund_of_no_show_fee_restores_gift_card_from_latest_balance() {
    let engine = engine();
    engine.issue_gift_card("WELCOME", 10_000, None).unwrap();
    let booking = engine
        .create_booking(seed("cut", "ada@example.com").with_gift_card("WELCOME", 4_000))
        .unwrap();
    engine
        .adjust_gift_card("WELCOME", -1_000, Some("expired promo"))
        .unwrap();
    assert_eq!(engine.gift_card_balance("WELCOME"), 5_000);

    engine
        .apply_action(booking.id, BookingAction::NoShow)
        .unwrap();
    engine
        .apply_action(booking.id, BookingAction::Refund)
        .unwrap();

    let history = engine.gift_card_history("WELCOME");
    let restored = history.last().unwrap();
    assert_eq!(restored.reason, GiftCardReason::Refunded);
    assert_eq!(restored.delta_cents, 4_000);
    assert_eq!(restored.balance_after_cents, 9_000);
    assert_eq!(restored.booking_code.as_deref(), Some(booking.code.as_str()));
}

#[test]
fn requires_action_gates_capture_until_cleared() {
    let engine = engine();
    let booking = engine
        .create_booking(seed("cut", "ada@example.com").requiring_action())
        .unwrap();
    assert_eq!(booking.status, BookingStatus::RequiresAction);

    let gated = engine
        .apply_action(booking.id, BookingAction::Complete)
        .unwrap();
    assert_eq!(gated.status, ResponseStatus::RequiresAction);
    assert!(!gated.committed);
    assert_eq!(
        gated.pay_link_url,
        Some(format!("https://pay.example.com/b/{}", booking.code))
    );
    assert_eq!(engine.booking(booking.id).unwrap().payments.len(), 1);

    let cleared = engine.clear_action_gate(booking.id).unwrap();
    assert_eq!(cleared.booking.status, BookingStatus::Authorized);
    assert!(!cleared.booking.requires_action);

    let captured = engine
        .apply_action(booking.id, BookingAction::Complete)
        .unwrap();
    assert_eq!(captured.booking.status, BookingStatus::Captured);
}

#[test]
fn terminal_bookings_reject_state_changes() {
    let engine = engine();
    let booking = engine.create_booking(seed("cut", "ada@example.com")).unwrap();
    engine
        .apply_action(booking.id, BookingAction::Complete)
        .unwrap();
    engine
        .apply_action(booking.id, BookingAction::Refund)
        .unwrap();

    let err = engine
        .apply_action(booking.id, BookingAction::NoShow)
        .unwrap_err();
    match err {
        BookingError::InvalidTransition { from, .. } => assert_eq!(from, BookingStatus::Refunded),
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn processor_outcomes_close_the_booking() {
    let engine = engine();
    let lapsed = engine.create_booking(seed("cut", "ada@example.com")).unwrap();
    let response = engine
        .record_processor_outcome(lapsed.id, ProcessorOutcome::Expired)
        .unwrap();
    assert_eq!(response.booking.status, BookingStatus::Expired);
    assert!(engine
        .apply_action(lapsed.id, BookingAction::Complete)
        .is_err());

    let charged = engine.create_booking(seed("cut", "grace@example.com")).unwrap();
    engine
        .apply_action(charged.id, BookingAction::Complete)
        .unwrap();
    let disputed = engine
        .record_processor_outcome(charged.id, ProcessorOutcome::Disputed)
        .unwrap();
    assert_eq!(disputed.booking.status, BookingStatus::Disputed);
    assert_eq!(disputed.booking.payments.len(), 2);
}

#[test]
fn fully_gifted_capture_still_carries_flat_processor_fee() {
    let engine = engine();
    engine.issue_gift_card("WELCOME", 10_000, None).unwrap();
    let booking = engine
        .create_booking(seed("cut", "ada@example.com").with_gift_card("WELCOME", 10_000))
        .unwrap();
    assert_eq!(booking.financials.processor_fee_cents, 0);

    let response = engine
        .apply_action(booking.id, BookingAction::Complete)
        .unwrap();

    let captured = &response.booking;
    assert_eq!(captured.status, BookingStatus::Captured);
    assert_eq!(captured.payments.last().unwrap().amount_cents, 0);
    assert_eq!(captured.financials.platform_fee_cents, 0);
    assert_eq!(captured.financials.processor_fee_cents, 30);
    assert_eq!(captured.financials.net_payout_cents, 0);
    assert_eq!(engine.analytics().fees.processor_fee_cents, 30);
}
